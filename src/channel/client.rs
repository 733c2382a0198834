// src/channel/client.rs

//! Party-side access to the qubit relay.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tracing::debug;

use super::protocol::{Command, Reply, Verb};
use super::server::ChannelServer;
use crate::core::{Basis, Bb84Error, PartyId, ProtocolError, Result};
use crate::transport::CheckedLink;

/// The quantum half of a party's connectivity: SEND and MEASURE.
///
/// Implemented over TCP by [`ChannelClient`] and in-process by
/// [`LocalChannel`]. Every call is one complete request/response.
#[async_trait]
pub trait QuantumChannel: Send {
    /// Prepares `bases.len()` qubits for the peer and returns the encoded bits.
    async fn send(&mut self, bases: &[Basis]) -> Result<Vec<u8>>;

    /// Consumes and measures `bases.len()` queued qubits.
    ///
    /// # Errors
    /// `ProtocolError::InsufficientQubits` while the peer has not sent enough.
    async fn measure(&mut self, bases: &[Basis]) -> Result<Vec<u8>>;
}

/// TCP connection to a [`ChannelServer`].
///
/// The server identifies the caller by this connection's local address, so
/// [`local_addr`](Self::local_addr) is what must be registered for the party.
#[derive(Debug)]
pub struct ChannelClient {
    link: CheckedLink,
    local_addr: SocketAddr,
}

impl ChannelClient {
    /// Connects to the relay at `server`, bounding every reply wait by `timeout`.
    pub async fn connect(server: SocketAddr, timeout: Duration) -> Result<Self> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(server))
            .await
            .map_err(|_| Bb84Error::Timeout { operation: "channel connect", elapsed: timeout })??;
        let local_addr = stream.local_addr()?;
        debug!(%server, %local_addr, "Connected to channel server");
        Ok(Self { link: CheckedLink::from_tcp(stream, timeout), local_addr })
    }

    /// Address the server sees for this connection.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    async fn request(&mut self, command: Command) -> Result<Vec<u8>> {
        self.link.send_line(&command.to_string()).await?;
        let line = self.link.recv_line("channel reply").await?;
        match line.parse::<Reply>()? {
            Reply::Error(reason) => Err(reason.into()),
            Reply::Ok { verb, bits } => {
                if verb != command.verb() || bits.len() != command.count() {
                    return Err(ProtocolError::UnexpectedReply(line).into());
                }
                Ok(bits)
            }
        }
    }
}

#[async_trait]
impl QuantumChannel for ChannelClient {
    async fn send(&mut self, bases: &[Basis]) -> Result<Vec<u8>> {
        self.request(Command::Send { bases: bases.to_vec() }).await
    }

    async fn measure(&mut self, bases: &[Basis]) -> Result<Vec<u8>> {
        self.request(Command::Measure { bases: bases.to_vec() }).await
    }
}

/// A party slot on a server living in the same process.
#[derive(Debug, Clone)]
pub struct LocalChannel {
    server: Arc<ChannelServer>,
    party: PartyId,
}

impl LocalChannel {
    /// Acts as `party` on `server`, bypassing address registration.
    pub fn new(server: Arc<ChannelServer>, party: PartyId) -> Self {
        Self { server, party }
    }

    async fn run(&self, verb: Verb, bases: &[Basis]) -> Result<Vec<u8>> {
        let bases = bases.to_vec();
        let command = match verb {
            Verb::Send => Command::Send { bases },
            Verb::Measure => Command::Measure { bases },
        };
        self.server.execute_as(self.party, &command).await
    }
}

#[async_trait]
impl QuantumChannel for LocalChannel {
    async fn send(&mut self, bases: &[Basis]) -> Result<Vec<u8>> {
        self.run(Verb::Send, bases).await
    }

    async fn measure(&mut self, bases: &[Basis]) -> Result<Vec<u8>> {
        self.run(Verb::Measure, bases).await
    }
}
