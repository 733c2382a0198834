// src/channel/mailbox.rs

use std::collections::VecDeque;

use rand::SeedableRng;
use rand::distr::{Distribution, StandardUniform};
use rand::rngs::StdRng;

use crate::core::{Basis, Bb84Error, ProtocolError, QuantumState};
use crate::operations::Observable;
use crate::simulation::Simulator;

/// FIFO queue of qubits awaiting measurement by one party.
///
/// Each mailbox carries its own rng so that work on the two mailboxes never
/// contends on a shared random source.
#[derive(Debug)]
pub struct Mailbox {
    queue: VecDeque<QuantumState>,
    rng: StdRng,
}

impl Mailbox {
    /// Creates an empty mailbox whose randomness is derived from `seed`.
    pub fn new(seed: u64) -> Self {
        Self { queue: VecDeque::new(), rng: StdRng::seed_from_u64(seed) }
    }

    /// Number of queued qubits.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Prepares one qubit per basis with a uniformly random secret bit and
    /// appends them in order. Returns the encoded bits, read back by
    /// measuring each state in its preparation basis.
    ///
    /// Nothing is enqueued unless every qubit was prepared successfully.
    pub fn prepare_and_push(&mut self, bases: &[Basis], simulator: &Simulator) -> Result<Vec<u8>, Bb84Error> {
        let mut prepared = Vec::with_capacity(bases.len());
        let mut bits = Vec::with_capacity(bases.len());
        for &basis in bases {
            let secret: bool = StandardUniform.sample(&mut self.rng);
            let state = simulator.prepare(u8::from(secret), basis)?;
            bits.push(simulator.measure_bit(&state, basis, &mut self.rng)?);
            prepared.push(state);
        }
        self.queue.extend(prepared);
        Ok(bits)
    }

    /// Pops the first `bases.len()` qubits and measures qubit `i` in `bases[i]`.
    ///
    /// # Errors
    /// `ProtocolError::InsufficientQubits` if fewer qubits are queued; the
    /// mailbox is left unchanged.
    pub fn measure_front(&mut self, bases: &[Basis], simulator: &Simulator) -> Result<Vec<u8>, Bb84Error> {
        let requested = bases.len();
        if self.queue.len() < requested {
            return Err(ProtocolError::InsufficientQubits { requested, available: self.queue.len() }.into());
        }
        let mut bits = Vec::with_capacity(requested);
        for (state, &basis) in self.queue.iter().zip(bases) {
            bits.push(simulator.measure_bit(state, basis, &mut self.rng)?);
        }
        self.queue.drain(..requested);
        Ok(bits)
    }

    /// Measures the queued qubits in `bases` and leaves the collapsed states
    /// in place, as an intercept-resend eavesdropper would.
    ///
    /// Only `min(bases.len(), len())` qubits are touched.
    pub fn intercept(&mut self, bases: &[Basis], simulator: &Simulator) -> Result<Vec<u8>, Bb84Error> {
        let mut bits = Vec::with_capacity(bases.len().min(self.queue.len()));
        for (state, &basis) in self.queue.iter_mut().zip(bases) {
            let measurement = simulator.measure(state, &Observable::of(basis), &mut self.rng)?;
            bits.push(measurement.bit());
            *state = measurement.collapsed;
        }
        Ok(bits)
    }
}
