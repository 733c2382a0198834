//! Numerical constants shared by the engine and the protocol.

/// Constants used by the simulation and the channel protocol.
pub mod bb84_constants {
    /// Default tolerance for normalization, unitarity and hermiticity checks.
    pub const DEFAULT_TOLERANCE: f64 = 1e-9;
    /// 1/sqrt(2), the diagonal-basis amplitude.
    pub const SQRT_HALF: f64 = std::f64::consts::FRAC_1_SQRT_2;
    /// Largest `n` accepted by a single SEND or MEASURE request.
    pub const MAX_QUBITS_PER_REQUEST: usize = 500;
    /// Default length in bytes of the disclosed verification subkey.
    pub const DEFAULT_SUBKEY_BYTES: usize = 4;
}
