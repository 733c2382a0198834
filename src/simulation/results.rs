// src/simulation/results.rs
use crate::core::QuantumState;
use std::fmt;

/// Outcome of a projective measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// The observed eigenvalue (`+1` or `-1` for the Pauli observables).
    pub eigenvalue: f64,
    /// Index of the observed eigenpair: 0 for the larger eigenvalue.
    pub index: usize,
    /// The post-measurement state (the chosen eigenvector).
    pub collapsed: QuantumState,
}

impl Measurement {
    /// Classical bit for this outcome: the larger eigenvalue reads as 0, the
    /// smaller as 1 (`+1 -> 0`, `-1 -> 1` for the Pauli observables).
    pub fn bit(&self) -> u8 {
        if self.index == 0 { 0 } else { 1 }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Measured({:+}) -> {}", self.eigenvalue, self.collapsed)
    }
}
