// src/config.rs

//! Runtime configuration for parties and the channel server.
//!
//! Both configs have sensible defaults and can be overridden from `BB84_*`
//! environment variables or deserialized from any serde format a host
//! application already uses.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::DEFAULT_TOLERANCE;
use crate::core::constants::bb84_constants::{DEFAULT_SUBKEY_BYTES, MAX_QUBITS_PER_REQUEST};

/// Settings for one key-exchange participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartyConfig {
    /// Qubits per round (at most 500)
    pub batch_size: usize,

    /// Bytes of sifted key disclosed for verification each round
    pub subkey_bytes: usize,

    /// Upper bound on any single network wait, in milliseconds
    pub timeout_ms: u64,

    /// Delay between MEASURE re-requests while qubits are not yet queued
    pub poll_interval_ms: u64,

    /// Fixed rng seed; `None` draws one at startup
    pub seed: Option<u64>,

    /// Numerical tolerance for the state engine
    pub tolerance: f64,
}

impl Default for PartyConfig {
    fn default() -> Self {
        Self {
            batch_size: MAX_QUBITS_PER_REQUEST,
            subkey_bytes: DEFAULT_SUBKEY_BYTES,
            timeout_ms: 30_000,
            poll_interval_ms: 20,
            seed: None,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl PartyConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `BB84_BATCH_SIZE`: Qubits per round (default: 500)
    /// - `BB84_SUBKEY_BYTES`: Verification subkey length (default: 4)
    /// - `BB84_TIMEOUT_MS`: Network wait bound (default: 30000)
    /// - `BB84_POLL_INTERVAL_MS`: MEASURE retry delay (default: 20)
    /// - `BB84_SEED`: Fixed rng seed (default: random)
    /// - `BB84_TOLERANCE`: Engine tolerance (default: 1e-9)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            batch_size: parse_or(&lookup, "BB84_BATCH_SIZE", defaults.batch_size),
            subkey_bytes: parse_or(&lookup, "BB84_SUBKEY_BYTES", defaults.subkey_bytes),
            timeout_ms: parse_or(&lookup, "BB84_TIMEOUT_MS", defaults.timeout_ms),
            poll_interval_ms: parse_or(&lookup, "BB84_POLL_INTERVAL_MS", defaults.poll_interval_ms),
            seed: parse(&lookup, "BB84_SEED"),
            tolerance: parse_or(&lookup, "BB84_TOLERANCE", defaults.tolerance),
        }
    }

    /// `timeout_ms` as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// `poll_interval_ms` as a `Duration`.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Settings for the qubit relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Largest `n` accepted per request
    pub qubit_limit: usize,

    /// Fixed seed for the mailbox rngs; `None` draws one at startup
    pub seed: Option<u64>,

    /// Numerical tolerance for the state engine
    pub tolerance: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            qubit_limit: MAX_QUBITS_PER_REQUEST,
            seed: None,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl ServerConfig {
    /// Create configuration from environment variables.
    ///
    /// - `BB84_QUBIT_LIMIT`: Largest request (default: 500)
    /// - `BB84_SEED`: Fixed rng seed (default: random)
    /// - `BB84_TOLERANCE`: Engine tolerance (default: 1e-9)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            qubit_limit: parse_or(&lookup, "BB84_QUBIT_LIMIT", defaults.qubit_limit),
            seed: parse(&lookup, "BB84_SEED"),
            tolerance: parse_or(&lookup, "BB84_TOLERANCE", defaults.tolerance),
        }
    }
}

fn parse<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|v| v.trim().parse().ok())
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    parse(lookup, key).unwrap_or(default)
}
