// src/party/round.rs

//! One send or receive round of BB84.
//!
//! ```text
//! sender                                receiver
//!   SEND(n, bases)  ->  relay  ->  MEASURE(n, bases')
//!   <------------------ bases' ---------------------
//!   ------------------- bases ---------------------->
//!   sift, split                          sift, split
//!   ------------------- subkey --------------------->
//!   <------------------ subkey' --------------------
//! ```
//!
//! Every classical message goes through the checked link.

use rand::distr::{Distribution, StandardUniform};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::Party;
use super::Transmission;
use super::sifting::{SplitKey, pack_bits, sift, split_key};
use crate::core::basis::{bases_to_string, parse_bases};
use crate::core::{Basis, Bb84Error, ProtocolError, Result};
use crate::transport::{decode_states, encode_states};

/// What one round produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundOutcome {
    /// Qubits exchanged
    pub qubits: usize,
    /// Bits surviving basis reconciliation
    pub sifted_bits: usize,
    /// Key material retained after the subkey was removed
    pub secret: Vec<u8>,
    /// Whether the peer's subkey matched ours
    pub verified: bool,
}

impl Party {
    /// Plays the sending side of a round of `n` qubits.
    pub async fn send_round(&mut self, n: usize) -> Result<RoundOutcome> {
        let bases = Basis::random_string(n, &mut self.rng);
        let bits = self.transmit(&bases).await?;

        let peer_bases = self.receive_bases(n).await?;
        self.link.checked_send(&bases_to_string(&bases)).await?;

        let split = self.sift_and_split(&bits, &bases, &peer_bases)?;
        self.link.checked_send(&hex::encode(&split.subkey)).await?;
        let peer_subkey = self.receive_subkey().await?;

        Ok(self.conclude(n, &bits, &bases, &peer_bases, split, &peer_subkey))
    }

    /// Plays the receiving side of a round of `n` qubits.
    pub async fn receive_round(&mut self, n: usize) -> Result<RoundOutcome> {
        let bases = Basis::random_string(n, &mut self.rng);
        let bits = self.collect(&bases).await?;

        self.link.checked_send(&bases_to_string(&bases)).await?;
        let peer_bases = self.receive_bases(n).await?;

        let split = self.sift_and_split(&bits, &bases, &peer_bases)?;
        let peer_subkey = self.receive_subkey().await?;
        self.link.checked_send(&hex::encode(&split.subkey)).await?;

        Ok(self.conclude(n, &bits, &bases, &peer_bases, split, &peer_subkey))
    }

    /// Puts one qubit per basis on its way to the peer; returns the encoded bits.
    async fn transmit(&mut self, bases: &[Basis]) -> Result<Vec<u8>> {
        match &mut self.transmission {
            Transmission::Relay(channel) => channel.send(bases).await,
            Transmission::Direct => {
                let mut states = Vec::with_capacity(bases.len());
                for &basis in bases {
                    let secret: bool = StandardUniform.sample(&mut self.rng);
                    states.push(self.simulator.prepare(u8::from(secret), basis)?);
                }
                let stream = encode_states(&states, self.simulator.tolerance())?;
                self.link.checked_send(&stream).await?;
                // Measuring in the preparation basis does not disturb the state
                states
                    .iter()
                    .zip(bases)
                    .map(|(state, &basis)| self.simulator.measure_bit(state, basis, &mut self.rng))
                    .collect()
            }
        }
    }

    /// Obtains and measures the peer's qubits in `bases`.
    async fn collect(&mut self, bases: &[Basis]) -> Result<Vec<u8>> {
        let timeout = self.config.timeout();
        let poll = self.config.poll_interval();
        match &mut self.transmission {
            Transmission::Relay(channel) => {
                let started = Instant::now();
                loop {
                    match channel.measure(bases).await {
                        Err(e) if e.is_insufficient_qubits() => {
                            if started.elapsed() >= timeout {
                                return Err(Bb84Error::Timeout { operation: "queued qubits", elapsed: timeout });
                            }
                            tokio::time::sleep(poll).await;
                        }
                        other => return other,
                    }
                }
            }
            Transmission::Direct => {
                let stream = self.link.checked_receive().await?;
                let states = decode_states(&stream, self.simulator.tolerance())?;
                if states.len() != bases.len() {
                    return Err(Bb84Error::Encoding(format!(
                        "expected {} qubit(s), received {}",
                        bases.len(),
                        states.len()
                    )));
                }
                states
                    .iter()
                    .zip(bases)
                    .map(|(state, &basis)| self.simulator.measure_bit(state, basis, &mut self.rng))
                    .collect()
            }
        }
    }

    async fn receive_bases(&mut self, n: usize) -> Result<Vec<Basis>> {
        let payload = self.link.checked_receive().await?;
        let bases = parse_bases(&payload)?;
        if bases.len() != n {
            return Err(ProtocolError::BasisLengthMismatch { expected: n, actual: bases.len() }.into());
        }
        Ok(bases)
    }

    async fn receive_subkey(&mut self) -> Result<Vec<u8>> {
        let payload = self.link.checked_receive().await?;
        hex::decode(payload.trim()).map_err(|e| Bb84Error::Encoding(format!("peer subkey: {}", e)))
    }

    fn sift_and_split(&self, bits: &[u8], own: &[Basis], peer: &[Basis]) -> Result<SplitKey> {
        let sifted = sift(bits, own, peer);
        split_key(pack_bits(&sifted), self.config.subkey_bytes)
    }

    fn conclude(
        &self,
        n: usize,
        bits: &[u8],
        own: &[Basis],
        peer: &[Basis],
        split: SplitKey,
        peer_subkey: &[u8],
    ) -> RoundOutcome {
        let sifted_bits = own.iter().zip(peer).filter(|(a, b)| a == b).count().min(bits.len());
        let verified = split.subkey == peer_subkey;
        if verified {
            info!(role = %self.role, n, sifted_bits, secret_bytes = split.secret.len(), "Subkeys match, round secure");
        } else {
            warn!(
                role = %self.role,
                ours = %hex::encode(&split.subkey),
                theirs = %hex::encode(peer_subkey),
                "Subkey mismatch: channel may be compromised"
            );
        }
        debug!(role = %self.role, key = %hex::encode(&split.secret), "Round key fragment");
        RoundOutcome { qubits: n, sifted_bits, secret: split.secret, verified }
    }
}
