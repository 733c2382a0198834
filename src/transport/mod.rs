// src/transport/mod.rs

//! Classical messaging between the two parties.

pub mod checked;
pub mod encoding;

pub use checked::{ACK, CheckedLink, NAK};
pub use encoding::{decode_states, encode_states};
