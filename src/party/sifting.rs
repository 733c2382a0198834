// src/party/sifting.rs

//! Basis reconciliation and key packing.

use crate::core::{Basis, Bb84Error, Result};

/// Keeps `bits[i]` wherever `own[i] == peer[i]`, in index order.
///
/// The three sequences are position-aligned; any excess beyond the shortest
/// is ignored.
pub fn sift(bits: &[u8], own: &[Basis], peer: &[Basis]) -> Vec<u8> {
    bits.iter()
        .zip(own.iter().zip(peer))
        .filter(|(_, (a, b))| a == b)
        .map(|(bit, _)| *bit)
        .collect()
}

/// Packs bits MSB-first into bytes, dropping a trailing partial byte.
pub fn pack_bits(bits: &[u8]) -> Vec<u8> {
    bits.chunks_exact(8)
        .map(|chunk| chunk.iter().fold(0u8, |byte, bit| (byte << 1) | (bit & 1)))
        .collect()
}

/// A packed sifted key divided into its disclosed and retained parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitKey {
    /// Disclosed to the peer for comparison, then discarded
    pub subkey: Vec<u8>,
    /// Kept as key material
    pub secret: Vec<u8>,
}

/// Splits off the first `subkey_bytes` bytes as the comparison subkey.
///
/// # Errors
/// `Bb84Error::KeyTooShort` unless `packed` is strictly longer than the subkey.
pub fn split_key(mut packed: Vec<u8>, subkey_bytes: usize) -> Result<SplitKey> {
    if packed.len() <= subkey_bytes {
        return Err(Bb84Error::KeyTooShort { sifted_bytes: packed.len(), subkey_bytes });
    }
    let secret = packed.split_off(subkey_bytes);
    Ok(SplitKey { subkey: packed, secret })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn basis_strategy() -> impl Strategy<Value = Basis> {
        prop_oneof![Just(Basis::Computational), Just(Basis::Diagonal)]
    }

    #[test]
    fn test_sift_example() {
        use Basis::{Computational as Z, Diagonal as X};
        let bits = [1, 0, 1, 1, 0];
        assert_eq!(sift(&bits, &[Z, X, X, Z, Z], &[Z, Z, X, X, Z]), vec![1, 1, 0]);
    }

    #[test]
    fn test_pack_msb_first() {
        assert_eq!(pack_bits(&[1, 0, 0, 0, 0, 0, 0, 1]), vec![0x81]);
        assert_eq!(pack_bits(&[1, 1, 1, 1, 1, 1, 1]), Vec::<u8>::new());
        assert_eq!(pack_bits(&[0, 0, 0, 0, 1, 1, 1, 1, 1, 0, 1]), vec![0x0f]);
    }

    #[test]
    fn test_split_key() -> Result<()> {
        let split = split_key(vec![1, 2, 3, 4, 5, 6], 4)?;
        assert_eq!(split.subkey, vec![1, 2, 3, 4]);
        assert_eq!(split.secret, vec![5, 6]);
        assert!(matches!(
            split_key(vec![1, 2, 3, 4], 4),
            Err(Bb84Error::KeyTooShort { sifted_bytes: 4, subkey_bytes: 4 })
        ));
        Ok(())
    }

    proptest! {
        #[test]
        fn prop_sift_selects_matching_positions(
            rows in prop::collection::vec((0u8..2, basis_strategy(), basis_strategy()), 0..200)
        ) {
            let bits: Vec<u8> = rows.iter().map(|r| r.0).collect();
            let own: Vec<Basis> = rows.iter().map(|r| r.1).collect();
            let peer: Vec<Basis> = rows.iter().map(|r| r.2).collect();
            let expected: Vec<u8> = (0..bits.len()).filter(|&i| own[i] == peer[i]).map(|i| bits[i]).collect();
            prop_assert_eq!(sift(&bits, &own, &peer), expected);
        }

        #[test]
        fn prop_pack_truncates_to_whole_bytes(bits in prop::collection::vec(0u8..2, 0..300)) {
            let packed = pack_bits(&bits);
            prop_assert_eq!(packed.len() * 8, 8 * (bits.len() / 8));
            for (i, byte) in packed.iter().enumerate() {
                for j in 0..8 {
                    prop_assert_eq!((byte >> (7 - j)) & 1, bits[i * 8 + j]);
                }
            }
        }
    }
}
