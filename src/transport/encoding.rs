// src/transport/encoding.rs

//! Text encoding for shipping qubit states directly between parties.
//!
//! Each qubit becomes `"<a>,<b>"` with both (real) amplitudes rounded to one
//! decimal digit; qubits are joined with `:`. Rounding turns `1/sqrt(2)` into
//! `0.7`, so the decoder snaps any magnitude near `0.7` (or `1/sqrt(2)`) back
//! to `sqrt(0.5)`, keeping the sign. That is enough to carry the four BB84
//! states; anything with a complex amplitude is refused.

use crate::core::{Bb84Error, QuantumState, Result, SQRT_HALF};

const QUBIT_SEPARATOR: char = ':';
const AMPLITUDE_SEPARATOR: char = ',';
const ROUNDED_SQRT_HALF: f64 = 0.7;
const SNAP_TOLERANCE: f64 = 1e-6;

/// Encodes states as `a,b:a,b:...`.
///
/// # Errors
/// `Bb84Error::Encoding` if any amplitude has an imaginary part beyond `tolerance`.
pub fn encode_states(states: &[QuantumState], tolerance: f64) -> Result<String> {
    let mut parts = Vec::with_capacity(states.len());
    for (i, state) in states.iter().enumerate() {
        if state.alpha().im.abs() > tolerance || state.beta().im.abs() > tolerance {
            return Err(Bb84Error::Encoding(format!("qubit {} has a complex amplitude: {}", i, state)));
        }
        parts.push(format!("{:.1}{}{:.1}", state.alpha().re, AMPLITUDE_SEPARATOR, state.beta().re));
    }
    Ok(parts.join(&QUBIT_SEPARATOR.to_string()))
}

fn snap(value: f64, tolerance: f64) -> f64 {
    let magnitude = value.abs();
    if (magnitude - ROUNDED_SQRT_HALF).abs() < SNAP_TOLERANCE || (magnitude - SQRT_HALF).abs() < tolerance {
        SQRT_HALF.copysign(value)
    } else {
        value
    }
}

fn parse_amplitude(token: &str, index: usize) -> Result<f64> {
    token
        .trim()
        .parse::<f64>()
        .map_err(|e| Bb84Error::Encoding(format!("qubit {}: bad amplitude {:?}: {}", index, token, e)))
}

/// Reconstructs states from [`encode_states`] output.
///
/// # Errors
/// `Bb84Error::Encoding` for malformed pairs, or `Bb84Error::Normalization`
/// when the snapped amplitudes still do not form a valid state.
pub fn decode_states(stream: &str, tolerance: f64) -> Result<Vec<QuantumState>> {
    if stream.trim().is_empty() {
        return Ok(Vec::new());
    }
    stream
        .split(QUBIT_SEPARATOR)
        .enumerate()
        .map(|(i, pair)| {
            let (a, b) = pair
                .split_once(AMPLITUDE_SEPARATOR)
                .ok_or_else(|| Bb84Error::Encoding(format!("qubit {}: expected 'a,b', got {:?}", i, pair)))?;
            let zero = snap(parse_amplitude(a, i)?, tolerance);
            let one = snap(parse_amplitude(b, i)?, tolerance);
            QuantumState::with_tolerance(zero.into(), one.into(), tolerance)
        })
        .collect()
}
