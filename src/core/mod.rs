// src/core/mod.rs

//! Core data structures and types

pub mod error;
pub mod basis;
pub mod state;

pub use error::{Bb84Error, PartyId, ProtocolError, Result};
pub use basis::Basis;
pub use state::QuantumState;

pub mod constants;
pub use constants::bb84_constants::{DEFAULT_TOLERANCE, MAX_QUBITS_PER_REQUEST, SQRT_HALF};
