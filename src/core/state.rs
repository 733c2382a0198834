// src/core/state.rs

use num_complex::Complex;
use num_traits::{One, Zero};
use std::fmt;

use super::constants::bb84_constants::DEFAULT_TOLERANCE;
use super::error::{Bb84Error, Result};

/// The state of a single two-level quantum system, `a|0> + b|1>`.
///
/// A `QuantumState` is immutable: gates and measurements consume a reference
/// and return a new state. Construction enforces `|a|^2 + |b|^2 = 1` within a
/// tolerance, so every value of this type is a valid physical state.
#[derive(Debug, Clone, Copy, PartialEq)] // Avoid Eq for floating-point complex numbers
pub struct QuantumState {
    amplitudes: [Complex<f64>; 2],
}

impl QuantumState {
    /// Creates a state from its two amplitudes, checked with the default tolerance.
    ///
    /// # Errors
    /// Returns `Bb84Error::Normalization` if the amplitudes are not unit-norm.
    pub fn new(zero: Complex<f64>, one: Complex<f64>) -> Result<Self> {
        Self::with_tolerance(zero, one, DEFAULT_TOLERANCE)
    }

    /// Creates a state, checking normalization against `tolerance`.
    pub fn with_tolerance(zero: Complex<f64>, one: Complex<f64>, tolerance: f64) -> Result<Self> {
        let norm_sqr = zero.norm_sqr() + one.norm_sqr();
        if !norm_sqr.is_finite() || (norm_sqr - 1.0).abs() > tolerance {
            return Err(Bb84Error::Normalization { norm_sqr });
        }
        Ok(Self { amplitudes: [zero, one] })
    }

    /// Creates a state from real amplitudes.
    pub fn from_real(zero: f64, one: f64) -> Result<Self> {
        Self::new(Complex::new(zero, 0.0), Complex::new(one, 0.0))
    }

    /// The computational basis state |0>.
    pub fn zero() -> Self {
        Self { amplitudes: [Complex::one(), Complex::zero()] }
    }

    /// The computational basis state |1>.
    pub fn one() -> Self {
        Self { amplitudes: [Complex::zero(), Complex::one()] }
    }

    /// Amplitude of |0>.
    pub fn alpha(&self) -> Complex<f64> {
        self.amplitudes[0]
    }

    /// Amplitude of |1>.
    pub fn beta(&self) -> Complex<f64> {
        self.amplitudes[1]
    }

    /// Provides read-only access to both amplitudes.
    pub fn amplitudes(&self) -> &[Complex<f64>; 2] {
        &self.amplitudes
    }

    /// Component-wise comparison within `tolerance`.
    pub fn approx_eq(&self, other: &QuantumState, tolerance: f64) -> bool {
        self.amplitudes
            .iter()
            .zip(other.amplitudes.iter())
            .all(|(a, b)| (a - b).norm_sqr() < tolerance * tolerance)
    }
}

impl Default for QuantumState {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for QuantumState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "State[{:.4}, {:.4}]", self.amplitudes[0], self.amplitudes[1])
    }
}
