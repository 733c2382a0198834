// src/simulation/engine.rs
use num_complex::Complex;
use num_traits::Zero;
use rand::Rng;
use rand::distr::{Distribution, StandardUniform};

use crate::core::{Bb84Error, QuantumState};
use crate::operations::Matrix2;

/// One eigenpair of a 2x2 Hermitian observable.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Eigenpair {
    pub(crate) value: f64,
    pub(crate) vector: [Complex<f64>; 2],
}

/// Closed-form eigendecomposition of a 2x2 Hermitian matrix
/// `[[a, b], [conj(b), d]]`.
///
/// Eigenvalues are returned in descending order. The eigenvector sign is
/// fixed: for a diagonal matrix the eigenvectors are `|0>` and `|1>`,
/// otherwise the eigenvector for `λ` is `normalize(b, λ - a)`. For Pauli-X
/// this gives `|+>` for `+1` and `|->` for `-1`.
///
/// Assumes the caller has already checked hermiticity.
pub(crate) fn eigen_decompose(m: &Matrix2, tolerance: f64) -> [Eigenpair; 2] {
    let a = m[0][0].re;
    let d = m[1][1].re;
    let b = m[0][1];

    let mean = (a + d) / 2.0;
    let radius = (((a - d) / 2.0).powi(2) + b.norm_sqr()).sqrt();
    let upper = mean + radius;
    let lower = mean - radius;

    if b.norm() <= tolerance {
        // Diagonal: the computational basis vectors, ordered by their eigenvalue
        let e0 = [Complex::new(1.0, 0.0), Complex::zero()];
        let e1 = [Complex::zero(), Complex::new(1.0, 0.0)];
        return if a >= d {
            [Eigenpair { value: a, vector: e0 }, Eigenpair { value: d, vector: e1 }]
        } else {
            [Eigenpair { value: d, vector: e1 }, Eigenpair { value: a, vector: e0 }]
        };
    }

    let vector_for = |lambda: f64| {
        let v = [b, Complex::new(lambda - a, 0.0)];
        let norm = (v[0].norm_sqr() + v[1].norm_sqr()).sqrt();
        [v[0] / norm, v[1] / norm]
    };

    [
        Eigenpair { value: upper, vector: vector_for(upper) },
        Eigenpair { value: lower, vector: vector_for(lower) },
    ]
}

/// `<v|psi>` with the conjugate taken on `v`.
pub(crate) fn inner(v: &[Complex<f64>; 2], psi: &[Complex<f64>; 2]) -> Complex<f64> {
    v[0].conj() * psi[0] + v[1].conj() * psi[1]
}

/// Probability of the first eigenvector for `state`, clamped to `[0, 1]` and
/// snapped to exactly 0 or 1 when within `tolerance` of either end.
pub(crate) fn first_outcome_probability(pairs: &[Eigenpair; 2], state: &QuantumState, tolerance: f64) -> f64 {
    let p0 = inner(&pairs[0].vector, state.amplitudes()).norm_sqr();
    let p1 = inner(&pairs[1].vector, state.amplitudes()).norm_sqr();
    let total = p0 + p1;
    let p = if total > 0.0 { p0 / total } else { 0.5 };
    if p >= 1.0 - tolerance {
        1.0
    } else if p <= tolerance {
        0.0
    } else {
        p
    }
}

/// Chooses outcome index 0 or 1 with `P(0) = p0`.
pub(crate) fn sample_outcome<R: Rng + ?Sized>(p0: f64, rng: &mut R) -> usize {
    if p0 >= 1.0 {
        return 0;
    }
    if p0 <= 0.0 {
        return 1;
    }
    let draw: f64 = StandardUniform.sample(rng);
    if draw < p0 { 0 } else { 1 }
}

/// Builds the collapsed state from an eigenvector.
pub(crate) fn collapse(vector: [Complex<f64>; 2], tolerance: f64) -> Result<QuantumState, Bb84Error> {
    QuantumState::with_tolerance(vector[0], vector[1], tolerance)
}
