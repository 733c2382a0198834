//! Error handling logic

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Identifies one of the two parties bound to a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PartyId {
    /// First registered party ("Alice")
    A,
    /// Second registered party ("Bob")
    B,
}

impl PartyId {
    /// The opposite slot on the same channel.
    pub fn peer(self) -> PartyId {
        match self {
            PartyId::A => PartyId::B,
            PartyId::B => PartyId::A,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            PartyId::A => 0,
            PartyId::B => 1,
        }
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartyId::A => write!(f, "Party(A)"),
            PartyId::B => write!(f, "Party(B)"),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Bb84Error>;

/// Rejections reported over the wire with an `ERR: <reason>` reply.
///
/// The `Display` text of each variant is exactly the reason string sent to
/// the requester, so [`ProtocolError::from_reason`] can recover the variants a
/// client needs to react to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The request line could not be split into `<verb> <n> <bases>`.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// The verb was neither `SEND` nor `MEASURE`.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// `n` was not a decimal integer in `1..=limit`.
    #[error("bad count: {value} (expected 1..={limit})")]
    InvalidCount {
        /// The offending token
        value: String,
        /// Largest accepted batch
        limit: usize,
    },

    /// The basis string length disagreed with `n`.
    #[error("basis length mismatch: expected {expected}, got {actual}")]
    BasisLengthMismatch {
        /// Declared count
        expected: usize,
        /// Characters actually supplied
        actual: usize,
    },

    /// A basis character outside `{X, Z}`.
    #[error("invalid basis: {0:?}")]
    InvalidBasis(char),

    /// The request came from an address bound to neither party.
    #[error("unknown sender: {0}")]
    UnknownSender(String),

    /// The mailbox holds fewer qubits than requested.
    #[error("insufficient qubits: requested {requested}, available {available}")]
    InsufficientQubits {
        /// Qubits requested
        requested: usize,
        /// Qubits queued
        available: usize,
    },

    /// A remote rejection whose reason has no typed counterpart.
    #[error("{0}")]
    Rejected(String),

    /// A reply line the client could not interpret.
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),
}

impl ProtocolError {
    /// Reconstructs a typed error from the reason text of an `ERR:` reply.
    pub fn from_reason(reason: &str) -> Self {
        let reason = reason.trim();
        if let Some(addr) = reason.strip_prefix("unknown sender: ") {
            return ProtocolError::UnknownSender(addr.to_string());
        }
        if let Some(rest) = reason.strip_prefix("insufficient qubits: ") {
            // "requested {r}, available {a}"
            let mut requested = None;
            let mut available = None;
            for part in rest.split(',') {
                let mut words = part.split_whitespace();
                match (words.next(), words.next().and_then(|v| v.parse().ok())) {
                    (Some("requested"), Some(v)) => requested = Some(v),
                    (Some("available"), Some(v)) => available = Some(v),
                    _ => {}
                }
            }
            if let (Some(requested), Some(available)) = (requested, available) {
                return ProtocolError::InsufficientQubits { requested, available };
            }
        }
        ProtocolError::Rejected(reason.to_string())
    }
}

/// Error types for every layer of the key exchange.
#[derive(Debug, Error)]
pub enum Bb84Error {
    /// State amplitudes are not unit-norm within tolerance.
    #[error("Normalization Violation: |a|^2 + |b|^2 = {norm_sqr}")]
    Normalization {
        /// The squared norm actually observed
        norm_sqr: f64,
    },

    /// A gate failed the `U * U^dagger = I` check.
    #[error("Not Unitary: {message}")]
    NotUnitary {
        /// Which entry deviated
        message: String,
    },

    /// An observable failed the `M = M^dagger` check.
    #[error("Not Hermitian: {message}")]
    NotHermitian {
        /// Which entry deviated
        message: String,
    },

    /// A SEND/MEASURE request was rejected.
    #[error("Protocol Error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The sifted key does not leave anything after the subkey is removed.
    #[error("Key Too Short: sifted {sifted_bytes} byte(s), subkey needs more than {subkey_bytes}")]
    KeyTooShort {
        /// Whole bytes produced by sifting
        sifted_bytes: usize,
        /// Configured subkey length
        subkey_bytes: usize,
    },

    /// The disclosed subkeys differ; the round is considered compromised.
    #[error("Subkey Mismatch: round {round} failed verification, key discarded")]
    SubkeyMismatch {
        /// Zero-based round index
        round: usize,
    },

    /// Not enough one-time-pad material left.
    #[error("Key Exhausted: need {needed} byte(s), {remaining} left")]
    KeyExhausted {
        /// Bytes required by the operation
        needed: usize,
        /// Bytes remaining in the pad
        remaining: usize,
    },

    /// A network wait exceeded its bound.
    #[error("Timeout: {operation} did not complete within {elapsed:?}")]
    Timeout {
        /// What was being waited for
        operation: &'static str,
        /// The configured bound
        elapsed: Duration,
    },

    /// The peer closed the connection mid-exchange.
    #[error("Connection Closed: {0}")]
    ConnectionClosed(String),

    /// A qubit stream could not be encoded or decoded.
    #[error("Encoding Error: {0}")]
    Encoding(String),

    /// Underlying socket failure.
    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),
}

impl Bb84Error {
    /// True when the error is a recoverable "not yet" condition for MEASURE.
    pub fn is_insufficient_qubits(&self) -> bool {
        matches!(self, Bb84Error::Protocol(ProtocolError::InsufficientQubits { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_round_trip_for_typed_variants() {
        let err = ProtocolError::InsufficientQubits { requested: 5, available: 3 };
        assert_eq!(ProtocolError::from_reason(&err.to_string()), err);

        let err = ProtocolError::UnknownSender("127.0.0.1:9".to_string());
        assert_eq!(ProtocolError::from_reason(&err.to_string()), err);
    }

    #[test]
    fn test_untyped_reason_is_rejected() {
        let err = ProtocolError::InvalidBasis('Y');
        assert_eq!(
            ProtocolError::from_reason(&err.to_string()),
            ProtocolError::Rejected("invalid basis: 'Y'".to_string())
        );
    }

    #[test]
    fn test_peer_slot() {
        assert_eq!(PartyId::A.peer(), PartyId::B);
        assert_eq!(PartyId::B.peer().index(), 0);
    }
}
