// src/core/basis.rs

use std::fmt;

use rand::Rng;
use rand::distr::{Distribution, StandardUniform};

use super::error::ProtocolError;

/// A measurement/preparation basis.
///
/// On the wire a basis is a single character: `Z` for the computational
/// basis and `X` for the diagonal (Hadamard) basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Basis {
    /// Eigenbasis of Pauli-Z: {|0>, |1>}
    Computational,
    /// Eigenbasis of Pauli-X: {|+>, |->}
    Diagonal,
}

impl Basis {
    /// Wire character for this basis.
    pub fn as_char(self) -> char {
        match self {
            Basis::Computational => 'Z',
            Basis::Diagonal => 'X',
        }
    }

    /// Parses a wire character. Comparison is by value, never by identity.
    pub fn from_char(c: char) -> Result<Self, ProtocolError> {
        match c {
            'Z' => Ok(Basis::Computational),
            'X' => Ok(Basis::Diagonal),
            other => Err(ProtocolError::InvalidBasis(other)),
        }
    }

    /// Draws one basis uniformly at random.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let diagonal: bool = StandardUniform.sample(rng);
        if diagonal { Basis::Diagonal } else { Basis::Computational }
    }

    /// Draws `n` independent uniform bases.
    pub fn random_string<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<Basis> {
        (0..n).map(|_| Basis::random(rng)).collect()
    }
}

impl fmt::Display for Basis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Renders a basis sequence as its wire string, e.g. `"ZXXZ"`.
pub fn bases_to_string(bases: &[Basis]) -> String {
    bases.iter().map(|b| b.as_char()).collect()
}

/// Parses a wire basis string.
pub fn parse_bases(s: &str) -> Result<Vec<Basis>, ProtocolError> {
    s.chars().map(Basis::from_char).collect()
}

/// Renders a bit sequence (values 0/1) as `'0'`/`'1'` characters.
pub fn bits_to_string(bits: &[u8]) -> String {
    bits.iter().map(|b| if *b == 0 { '0' } else { '1' }).collect()
}

/// Parses a `'0'`/`'1'` string into bits.
pub fn parse_bits(s: &str) -> Result<Vec<u8>, ProtocolError> {
    s.chars()
        .map(|c| match c {
            '0' => Ok(0),
            '1' => Ok(1),
            _ => Err(ProtocolError::UnexpectedReply(format!("invalid bit character {:?}", c))),
        })
        .collect()
}
