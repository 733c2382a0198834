// src/operations/mod.rs

//! Gates and observables acting on a single `QuantumState`.
//!
//! Both are plain 2x2 complex matrices. Their defining property (unitary for
//! gates, Hermitian for observables) is checked at the point of use by the
//! [`Simulator`](crate::simulation::Simulator), so a hand-built matrix can be
//! constructed freely but never silently applied.

use num_complex::Complex;
use num_traits::{One, Zero};
use std::fmt;

use crate::core::{Basis, SQRT_HALF};

/// A 2x2 complex matrix, row-major.
pub type Matrix2 = [[Complex<f64>; 2]; 2];

/// Named gates. `Custom` covers user-supplied matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GateKind {
    /// Persistence
    Identity,
    /// Bit flip, Pauli-X
    PauliX,
    /// Basis change between Z and X eigenstates
    Hadamard,
    /// Phase flip (PI), Pauli-Z
    PauliZ,
    /// Quarter turn phase (PI/2), S
    PhaseS,
    /// Arbitrary matrix
    Custom,
}

/// A unitary transformation of one qubit.
#[derive(Debug, Clone, PartialEq)]
pub struct Gate {
    kind: GateKind,
    matrix: Matrix2,
}

impl Gate {
    /// Wraps an arbitrary matrix. Unitarity is checked when the gate is applied.
    pub fn from_matrix(matrix: Matrix2) -> Self {
        Self { kind: GateKind::Custom, matrix }
    }

    /// The identity gate `I`.
    pub fn identity() -> Self {
        Self {
            kind: GateKind::Identity,
            matrix: [
                [Complex::one(), Complex::zero()],
                [Complex::zero(), Complex::one()],
            ],
        }
    }

    /// Pauli-X, `|0> <-> |1>`.
    pub fn pauli_x() -> Self {
        Self {
            kind: GateKind::PauliX,
            matrix: [
                [Complex::zero(), Complex::one()],
                [Complex::one(), Complex::zero()],
            ],
        }
    }

    /// Hadamard, `|0> -> |+>`, `|1> -> |->`.
    pub fn hadamard() -> Self {
        let h = Complex::new(SQRT_HALF, 0.0);
        Self {
            kind: GateKind::Hadamard,
            matrix: [[h, h], [h, -h]],
        }
    }

    /// Pauli-Z, `|1> -> -|1>`.
    pub fn pauli_z() -> Self {
        Self {
            kind: GateKind::PauliZ,
            matrix: [
                [Complex::one(), Complex::zero()],
                [Complex::zero(), Complex::new(-1.0, 0.0)],
            ],
        }
    }

    /// Phase gate S, `|1> -> i|1>`.
    pub fn phase_s() -> Self {
        Self {
            kind: GateKind::PhaseS,
            matrix: [
                [Complex::one(), Complex::zero()],
                [Complex::zero(), Complex::i()],
            ],
        }
    }

    /// Which named gate this is.
    pub fn kind(&self) -> GateKind {
        self.kind
    }

    /// The underlying matrix.
    pub fn matrix(&self) -> &Matrix2 {
        &self.matrix
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            GateKind::Identity => write!(f, "I"),
            GateKind::PauliX => write!(f, "X"),
            GateKind::Hadamard => write!(f, "H"),
            GateKind::PauliZ => write!(f, "Z"),
            GateKind::PhaseS => write!(f, "S"),
            GateKind::Custom => write!(f, "U"),
        }
    }
}

/// A measurement observable (Hermitian 2x2 matrix).
#[derive(Debug, Clone, PartialEq)]
pub struct Observable {
    matrix: Matrix2,
}

impl Observable {
    /// Wraps an arbitrary matrix. Hermiticity is checked when measuring.
    pub fn from_matrix(matrix: Matrix2) -> Self {
        Self { matrix }
    }

    /// Pauli-Z, eigenbasis {|0>, |1>}.
    pub fn computational() -> Self {
        Self { matrix: *Gate::pauli_z().matrix() }
    }

    /// Pauli-X, eigenbasis {|+>, |->}.
    pub fn diagonal() -> Self {
        Self { matrix: *Gate::pauli_x().matrix() }
    }

    /// The observable whose eigenbasis is `basis`.
    pub fn of(basis: Basis) -> Self {
        match basis {
            Basis::Computational => Self::computational(),
            Basis::Diagonal => Self::diagonal(),
        }
    }

    /// The underlying matrix.
    pub fn matrix(&self) -> &Matrix2 {
        &self.matrix
    }
}
