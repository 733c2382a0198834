// src/party/mod.rs

//! A BB84 participant: random basis choice, reconciliation with the peer,
//! sifting, subkey verification and key accumulation.

pub mod exchange;
pub mod round;
pub mod sifting;

pub use exchange::ExchangeReport;
pub use round::RoundOutcome;
pub use sifting::{SplitKey, pack_bits, sift, split_key};

use std::fmt;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::channel::QuantumChannel;
use crate::config::PartyConfig;
use crate::simulation::Simulator;
use crate::transport::CheckedLink;

/// Which side of the exchange a party plays.
///
/// The Initiator sends on even rounds and the Responder on odd ones, so the
/// two never both wait to receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Opens the exchange by sending
    Initiator,
    /// Opens the exchange by receiving
    Responder,
}

impl Role {
    /// True if this role sends in round `round`.
    pub fn sends_in(self, round: usize) -> bool {
        match self {
            Role::Initiator => round % 2 == 0,
            Role::Responder => round % 2 == 1,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Initiator => write!(f, "initiator"),
            Role::Responder => write!(f, "responder"),
        }
    }
}

/// How qubits reach the peer.
pub enum Transmission {
    /// Through a shared relay with SEND/MEASURE.
    Relay(Box<dyn QuantumChannel>),
    /// Prepared locally and shipped as amplitude text over the classical link.
    Direct,
}

impl fmt::Debug for Transmission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transmission::Relay(_) => write!(f, "Relay"),
            Transmission::Direct => write!(f, "Direct"),
        }
    }
}

/// One end of a key exchange.
#[derive(Debug)]
pub struct Party {
    role: Role,
    config: PartyConfig,
    transmission: Transmission,
    link: CheckedLink,
    simulator: Simulator,
    rng: StdRng,
}

impl Party {
    /// A party that sends qubits through a relay.
    pub fn new<C>(role: Role, config: PartyConfig, channel: C, link: CheckedLink) -> Self
    where
        C: QuantumChannel + 'static,
    {
        Self::with_transmission(role, config, Transmission::Relay(Box::new(channel)), link)
    }

    /// A party that ships qubit states straight to its peer.
    pub fn direct(role: Role, config: PartyConfig, link: CheckedLink) -> Self {
        Self::with_transmission(role, config, Transmission::Direct, link)
    }

    /// General constructor.
    pub fn with_transmission(role: Role, config: PartyConfig, transmission: Transmission, link: CheckedLink) -> Self {
        let seed = config.seed.unwrap_or_else(rand::random);
        Self {
            role,
            simulator: Simulator::with_tolerance(config.tolerance),
            rng: StdRng::seed_from_u64(seed),
            config,
            transmission,
            link,
        }
    }

    /// This party's role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// The active configuration.
    pub fn config(&self) -> &PartyConfig {
        &self.config
    }
}
