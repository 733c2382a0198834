// src/validation/mod.rs

//! Provides functions to validate states, gates and observables before use.

use crate::core::{Bb84Error, QuantumState};
use crate::operations::Matrix2;
use num_complex::Complex;

// Default tolerance values (can be overridden by caller)
const DEFAULT_NORM_TOLERANCE: f64 = 1e-9;
const DEFAULT_MATRIX_TOLERANCE: f64 = 1e-9;

// --- Helper Functions ---

/// Conjugate transpose of a 2x2 matrix.
pub(crate) fn adjoint(m: &Matrix2) -> Matrix2 {
    [
        [m[0][0].conj(), m[1][0].conj()],
        [m[0][1].conj(), m[1][1].conj()],
    ]
}

fn multiply(a: &Matrix2, b: &Matrix2) -> Matrix2 {
    let mut out = [[Complex::new(0.0, 0.0); 2]; 2];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = a[i][0] * b[0][j] + a[i][1] * b[1][j];
        }
    }
    out
}

/// Largest entry-wise deviation between two matrices, with its position.
fn max_deviation(a: &Matrix2, b: &Matrix2) -> (f64, usize, usize) {
    let mut worst = (0.0, 0, 0);
    for i in 0..2 {
        for j in 0..2 {
            let d = (a[i][j] - b[i][j]).norm();
            // NaN entries must never pass a check
            if d.is_nan() || d > worst.0 {
                worst = (if d.is_nan() { f64::INFINITY } else { d }, i, j);
            }
        }
    }
    worst
}

// --- Public Validation Functions ---

/// Checks if the state is normalized (`|a|^2 + |b|^2 ≈ 1.0`).
///
/// # Arguments
/// * `state` - The `QuantumState` to check.
/// * `tolerance` - Allowed deviation from 1.0 (e.g., 1e-9). Defaults are available.
///
/// # Returns
/// * `Ok(())` if normalized within tolerance.
/// * `Err(Bb84Error::Normalization)` if normalization fails.
pub fn check_normalization(state: &QuantumState, tolerance: Option<f64>) -> Result<(), Bb84Error> {
    let effective_tolerance = tolerance.unwrap_or(DEFAULT_NORM_TOLERANCE);
    let norm_sqr: f64 = state.amplitudes().iter().map(|c| c.norm_sqr()).sum();
    if (norm_sqr - 1.0).abs() > effective_tolerance {
        Err(Bb84Error::Normalization { norm_sqr })
    } else {
        Ok(())
    }
}

/// Checks `U * U^dagger = I` entry-wise.
///
/// # Returns
/// * `Err(Bb84Error::NotUnitary)` naming the worst entry if the check fails.
pub fn check_unitary(matrix: &Matrix2, tolerance: Option<f64>) -> Result<(), Bb84Error> {
    let effective_tolerance = tolerance.unwrap_or(DEFAULT_MATRIX_TOLERANCE);
    let identity = [
        [Complex::new(1.0, 0.0), Complex::new(0.0, 0.0)],
        [Complex::new(0.0, 0.0), Complex::new(1.0, 0.0)],
    ];
    let product = multiply(matrix, &adjoint(matrix));
    let (deviation, i, j) = max_deviation(&product, &identity);
    if deviation > effective_tolerance {
        Err(Bb84Error::NotUnitary {
            message: format!("(U U^dagger)[{}][{}] deviates from identity by {:.3e} (> {})", i, j, deviation, effective_tolerance)
        })
    } else {
        Ok(())
    }
}

/// Checks `M = M^dagger` entry-wise.
///
/// # Returns
/// * `Err(Bb84Error::NotHermitian)` naming the worst entry if the check fails.
pub fn check_hermitian(matrix: &Matrix2, tolerance: Option<f64>) -> Result<(), Bb84Error> {
    let effective_tolerance = tolerance.unwrap_or(DEFAULT_MATRIX_TOLERANCE);
    let (deviation, i, j) = max_deviation(matrix, &adjoint(matrix));
    if deviation > effective_tolerance {
        Err(Bb84Error::NotHermitian {
            message: format!("M[{}][{}] differs from its conjugate transpose by {:.3e} (> {})", i, j, deviation, effective_tolerance)
        })
    } else {
        Ok(())
    }
}
