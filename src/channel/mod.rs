// src/channel/mod.rs

//! The shared quantum channel: a two-party mailbox relay and its clients.

pub mod client;
pub mod mailbox;
pub mod protocol;
pub mod server;

pub use client::{ChannelClient, LocalChannel, QuantumChannel};
pub use mailbox::Mailbox;
pub use protocol::{Command, Reply, Verb};
pub use server::ChannelServer;
