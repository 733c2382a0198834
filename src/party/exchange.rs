// src/party/exchange.rs

use tracing::{info, warn};

use super::Party;
use crate::core::{Bb84Error, Result};

/// Summary of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeReport {
    /// Exactly the requested number of key bytes
    pub key: Vec<u8>,
    /// Rounds played
    pub rounds: usize,
    /// Qubits exchanged across all rounds
    pub qubits: usize,
    /// Bits surviving sifting across all rounds
    pub sifted_bits: usize,
}

impl Party {
    /// Runs rounds until `target_bytes` of verified key exist and returns them.
    ///
    /// # Errors
    /// `Bb84Error::SubkeyMismatch` as soon as any round fails verification;
    /// the key accumulated so far is dropped.
    pub async fn exchange(&mut self, target_bytes: usize) -> Result<Vec<u8>> {
        Ok(self.exchange_with_report(target_bytes).await?.key)
    }

    /// Like [`exchange`](Self::exchange), also reporting round statistics.
    pub async fn exchange_with_report(&mut self, target_bytes: usize) -> Result<ExchangeReport> {
        let batch = self.config.batch_size;
        let mut report = ExchangeReport { key: Vec::with_capacity(target_bytes), rounds: 0, qubits: 0, sifted_bits: 0 };

        while report.key.len() < target_bytes {
            let round = report.rounds;
            let outcome = if self.role.sends_in(round) {
                self.send_round(batch).await?
            } else {
                self.receive_round(batch).await?
            };
            if !outcome.verified {
                warn!(role = %self.role, round, "Aborting exchange after failed verification");
                return Err(Bb84Error::SubkeyMismatch { round });
            }
            report.rounds += 1;
            report.qubits += outcome.qubits;
            report.sifted_bits += outcome.sifted_bits;
            report.key.extend_from_slice(&outcome.secret);
        }

        report.key.truncate(target_bytes);
        info!(
            role = %self.role,
            rounds = report.rounds,
            qubits = report.qubits,
            key_bytes = report.key.len(),
            "Key exchange complete"
        );
        Ok(report)
    }
}
