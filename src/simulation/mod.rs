// src/simulation/mod.rs

//! The single-qubit state engine: preparation, unitary evolution and
//! projective measurement with probabilistic collapse.

mod results;
pub(crate) mod engine;

pub use results::Measurement;

use num_complex::Complex;
use rand::Rng;

use crate::core::{Basis, Bb84Error, DEFAULT_TOLERANCE, QuantumState};
use crate::operations::{Gate, Observable};
use crate::validation::{check_hermitian, check_unitary};

/// Applies gates and performs measurements under a fixed numerical tolerance.
///
/// Randomness is never drawn from a global source: every measurement takes
/// the caller's rng, so a seeded `StdRng` reproduces a run exactly.
#[derive(Debug, Clone, Copy)]
pub struct Simulator {
    tolerance: f64,
}

impl Default for Simulator {
    fn default() -> Self {
        Self { tolerance: DEFAULT_TOLERANCE }
    }
}

impl Simulator {
    /// Creates a new Simulator with the default tolerance (1e-9).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a Simulator using `tolerance` for every check.
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self { tolerance }
    }

    /// The tolerance used for normalization, unitarity and hermiticity checks.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Prepares the eigenstate of `basis` that encodes `bit`.
    ///
    /// `Computational` gives `|0>`/`|1>`; `Diagonal` gives `H|0> = |+>` and
    /// `H|1> = |->`. Any nonzero `bit` is treated as 1.
    ///
    /// # Errors
    /// `Bb84Error::Normalization` if the resulting amplitudes are not unit-norm.
    pub fn prepare(&self, bit: u8, basis: Basis) -> Result<QuantumState, Bb84Error> {
        let base = if bit == 0 { QuantumState::zero() } else { QuantumState::one() };
        match basis {
            Basis::Computational => Ok(base),
            Basis::Diagonal => self.apply(&base, &Gate::hadamard()),
        }
    }

    /// Returns `gate · state`.
    ///
    /// # Errors
    /// `Bb84Error::NotUnitary` if the gate fails the unitary check, or
    /// `Bb84Error::Normalization` if the product drifts out of tolerance.
    pub fn apply(&self, state: &QuantumState, gate: &Gate) -> Result<QuantumState, Bb84Error> {
        check_unitary(gate.matrix(), Some(self.tolerance))?;
        let m = gate.matrix();
        let psi = state.amplitudes();
        let zero: Complex<f64> = m[0][0] * psi[0] + m[0][1] * psi[1];
        let one: Complex<f64> = m[1][0] * psi[0] + m[1][1] * psi[1];
        QuantumState::with_tolerance(zero, one, self.tolerance)
    }

    /// Projectively measures `state` against `observable`.
    ///
    /// Outcome probabilities are `|<v_i|psi>|^2` over the closed-form
    /// eigenvectors of the observable. A state prepared in the observable's
    /// eigenbasis yields its eigenvalue with probability exactly 1.
    ///
    /// # Errors
    /// `Bb84Error::NotHermitian` if the observable fails the Hermitian check.
    pub fn measure<R: Rng + ?Sized>(
        &self,
        state: &QuantumState,
        observable: &Observable,
        rng: &mut R,
    ) -> Result<Measurement, Bb84Error> {
        check_hermitian(observable.matrix(), Some(self.tolerance))?;
        let pairs = engine::eigen_decompose(observable.matrix(), self.tolerance);
        let p0 = engine::first_outcome_probability(&pairs, state, self.tolerance);
        let index = engine::sample_outcome(p0, rng);
        let chosen = pairs[index];
        Ok(Measurement {
            eigenvalue: chosen.value,
            index,
            collapsed: engine::collapse(chosen.vector, self.tolerance)?,
        })
    }

    /// Measures in the eigenbasis of `basis` and returns the classical bit.
    pub fn measure_bit<R: Rng + ?Sized>(
        &self,
        state: &QuantumState,
        basis: Basis,
        rng: &mut R,
    ) -> Result<u8, Bb84Error> {
        Ok(self.measure(state, &Observable::of(basis), rng)?.bit())
    }
}
