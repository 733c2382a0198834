// src/cipher.rs

//! One-time pad over an agreed key.
//!
//! The key is halved: the Initiator encrypts with the first half and decrypts
//! with the second, the Responder the other way round, so each direction has
//! its own pad. Pad bytes are consumed as they are used, which means both
//! sides must process messages in the same order.

use tracing::debug;

use crate::core::{Bb84Error, Result};
use crate::party::Role;

/// Bidirectional one-time pad derived from a shared BB84 key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneTimePad {
    encrypting: Vec<u8>,
    decrypting: Vec<u8>,
}

impl OneTimePad {
    /// Splits `key` into two pads of `key.len() / 2` bytes; an odd final byte is unused.
    pub fn new(key: &[u8], role: Role) -> Self {
        let half = key.len() / 2;
        let (first, second) = (key[..half].to_vec(), key[half..2 * half].to_vec());
        match role {
            Role::Initiator => Self { encrypting: first, decrypting: second },
            Role::Responder => Self { encrypting: second, decrypting: first },
        }
    }

    /// Pad bytes left for (encrypting, decrypting).
    pub fn remaining(&self) -> (usize, usize) {
        (self.encrypting.len(), self.decrypting.len())
    }

    /// XORs `plaintext` with the next outgoing pad bytes.
    ///
    /// # Errors
    /// `Bb84Error::KeyExhausted` without consuming anything if the pad is too short.
    pub fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let out = xor_consume(&mut self.encrypting, plaintext)?;
        debug!(bytes = out.len(), left = self.encrypting.len(), "Encrypted");
        Ok(out)
    }

    /// XORs `ciphertext` with the next incoming pad bytes.
    pub fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let out = xor_consume(&mut self.decrypting, ciphertext)?;
        debug!(bytes = out.len(), left = self.decrypting.len(), "Decrypted");
        Ok(out)
    }
}

fn xor_consume(pad: &mut Vec<u8>, data: &[u8]) -> Result<Vec<u8>> {
    if pad.len() < data.len() {
        return Err(Bb84Error::KeyExhausted { needed: data.len(), remaining: pad.len() });
    }
    let out = data.iter().zip(pad.drain(..data.len())).map(|(d, k)| d ^ k).collect();
    Ok(out)
}
