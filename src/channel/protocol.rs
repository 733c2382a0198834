// src/channel/protocol.rs

//! Line-oriented request/response protocol of the qubit relay.
//!
//! ```text
//! -> SEND 3 ZXZ
//! <- SEND OK: 010
//! -> MEASURE 5 ZZZZZ
//! <- ERR: insufficient qubits: requested 5, available 3
//! ```
//!
//! Requests are parsed once into a [`Command`]; nothing downstream touches
//! the raw line.

use std::fmt;
use std::str::FromStr;

use crate::core::ProtocolError;
use crate::core::basis::{Basis, bases_to_string, bits_to_string, parse_bits};
use crate::core::constants::bb84_constants::MAX_QUBITS_PER_REQUEST;

/// The two operations a party may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// Prepare qubits for the peer
    Send,
    /// Consume and measure own queued qubits
    Measure,
}

impl Verb {
    fn as_str(self) -> &'static str {
        match self {
            Verb::Send => "SEND",
            Verb::Measure => "MEASURE",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated request. The count is `bases.len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `SEND <n> <bases>`
    Send {
        /// Preparation basis per qubit
        bases: Vec<Basis>,
    },
    /// `MEASURE <n> <bases>`
    Measure {
        /// Measurement basis per qubit
        bases: Vec<Basis>,
    },
}

impl Command {
    /// Parses a request line, enforcing `0 < n <= 500`.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        Self::parse_with_limit(line, MAX_QUBITS_PER_REQUEST)
    }

    /// Parses a request line with a custom upper bound on `n`.
    pub fn parse_with_limit(line: &str, limit: usize) -> Result<Self, ProtocolError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let (verb, count, bases) = match tokens.as_slice() {
            [verb, count, bases] => (*verb, *count, *bases),
            [] => return Err(ProtocolError::MalformedRequest("empty request".to_string())),
            _ => {
                return Err(ProtocolError::MalformedRequest(format!(
                    "expected '<command> <n> <bases>', got {} token(s)",
                    tokens.len()
                )));
            }
        };

        let verb = match verb {
            "SEND" => Verb::Send,
            "MEASURE" => Verb::Measure,
            other => return Err(ProtocolError::InvalidCommand(other.to_string())),
        };

        let n = match count.parse::<usize>() {
            Ok(n) if n > 0 && n <= limit => n,
            _ => {
                return Err(ProtocolError::InvalidCount { value: count.to_string(), limit });
            }
        };

        let actual = bases.chars().count();
        if actual != n {
            return Err(ProtocolError::BasisLengthMismatch { expected: n, actual });
        }
        let bases = bases.chars().map(Basis::from_char).collect::<Result<Vec<_>, _>>()?;

        Ok(match verb {
            Verb::Send => Command::Send { bases },
            Verb::Measure => Command::Measure { bases },
        })
    }

    /// Which operation this is.
    pub fn verb(&self) -> Verb {
        match self {
            Command::Send { .. } => Verb::Send,
            Command::Measure { .. } => Verb::Measure,
        }
    }

    /// The per-qubit bases.
    pub fn bases(&self) -> &[Basis] {
        match self {
            Command::Send { bases } | Command::Measure { bases } => bases,
        }
    }

    /// Number of qubits addressed.
    pub fn count(&self) -> usize {
        self.bases().len()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.verb(), self.count(), bases_to_string(self.bases()))
    }
}

impl FromStr for Command {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::parse(s)
    }
}

/// A server reply line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `<VERB> OK: <bits>`
    Ok {
        /// Which request succeeded
        verb: Verb,
        /// One bit per qubit, in request order
        bits: Vec<u8>,
    },
    /// `ERR: <reason>`
    Error(ProtocolError),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Ok { verb, bits } => write!(f, "{} OK: {}", verb, bits_to_string(bits)),
            Reply::Error(reason) => write!(f, "ERR: {}", reason),
        }
    }
}

impl FromStr for Reply {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, ProtocolError> {
        let s = s.trim();
        if let Some(reason) = s.strip_prefix("ERR:") {
            return Ok(Reply::Error(ProtocolError::from_reason(reason)));
        }
        let (verb, bits) = if let Some(bits) = s.strip_prefix("SEND OK:") {
            (Verb::Send, bits)
        } else if let Some(bits) = s.strip_prefix("MEASURE OK:") {
            (Verb::Measure, bits)
        } else {
            return Err(ProtocolError::UnexpectedReply(s.to_string()));
        };
        Ok(Reply::Ok { verb, bits: parse_bits(bits.trim())? })
    }
}
