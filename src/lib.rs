// src/lib.rs

//! `bb84` - BB84 quantum key distribution over a simulated qubit relay
//!
//! The crate has two halves. A minimal single-qubit engine (state
//! preparation, unitary gates, projective measurement with probabilistic
//! collapse) and, on top of it, the BB84 key agreement: a two-party mailbox
//! relay speaking a line protocol, parties that reconcile bases and sift a
//! key, and an echo/acknowledge wrapper for every classical message.

pub mod core;
pub mod operations;
pub mod simulation;
pub mod validation;
pub mod channel;
pub mod transport;
pub mod party;
pub mod cipher;
pub mod config;
pub mod telemetry;

// Re-export the most common types for easier top-level use
pub use crate::core::{Basis, Bb84Error, PartyId, ProtocolError, QuantumState, Result};
pub use crate::operations::{Gate, GateKind, Observable};
pub use crate::simulation::{Measurement, Simulator};
pub use crate::validation::{check_hermitian, check_normalization, check_unitary};
pub use crate::channel::{ChannelClient, ChannelServer, Command, LocalChannel, QuantumChannel, Reply};
pub use crate::transport::CheckedLink;
pub use crate::party::{ExchangeReport, Party, Role, RoundOutcome};
pub use crate::cipher::OneTimePad;
pub use crate::config::{PartyConfig, ServerConfig};

// Example 1: Same-basis measurement is deterministic
// A diagonal-basis qubit measured in the diagonal basis always returns the
// encoded bit; measured in the computational basis it is a coin flip.
/// ```
/// use bb84::{Basis, Bb84Error, Observable, Simulator};
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
///
/// let sim = Simulator::new();
/// let mut rng = StdRng::seed_from_u64(84);
///
/// let minus = sim.prepare(1, Basis::Diagonal)?;
/// let m = sim.measure(&minus, &Observable::diagonal(), &mut rng)?;
/// assert_eq!(m.bit(), 1);
/// assert!(m.collapsed.approx_eq(&minus, 1e-9));
///
/// // Conjugate basis: either outcome, collapsed onto |0> or |1>
/// let m = sim.measure(&minus, &Observable::computational(), &mut rng)?;
/// assert!(m.bit() == 0 || m.bit() == 1);
/// # Ok::<(), Bb84Error>(())
/// ```
#[doc(hidden)]
const _: () = (); // Attaches the preceding doc comment block to a hidden item

// Example 2: In-process key exchange
// Two parties share a relay in the same process and talk over an in-memory
// duplex pipe; both end up holding the same 16 byte key.
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use bb84::{ChannelServer, CheckedLink, LocalChannel, Party, PartyConfig, PartyId, Role, ServerConfig};
///
/// let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
/// rt.block_on(async {
///     let server = Arc::new(ChannelServer::new(&ServerConfig::default()));
///     let (a, b) = tokio::io::duplex(64 * 1024);
///     let timeout = Duration::from_secs(10);
///
///     let mut alice = Party::new(
///         Role::Initiator,
///         PartyConfig::default(),
///         LocalChannel::new(Arc::clone(&server), PartyId::A),
///         CheckedLink::new(a, timeout),
///     );
///     let mut bob = Party::new(
///         Role::Responder,
///         PartyConfig::default(),
///         LocalChannel::new(Arc::clone(&server), PartyId::B),
///         CheckedLink::new(b, timeout),
///     );
///
///     let (ka, kb) = tokio::join!(alice.exchange(16), bob.exchange(16));
///     let (ka, kb) = (ka.unwrap(), kb.unwrap());
///     assert_eq!(ka.len(), 16);
///     assert_eq!(ka, kb);
/// });
/// ```
#[doc(hidden)]
const _: () = (); // Attaches the preceding doc comment block to a hidden item
