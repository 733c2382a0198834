// src/channel/server.rs

//! The shared qubit relay ("quantum channel") for exactly two parties.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use super::mailbox::Mailbox;
use super::protocol::{Command, Reply};
use crate::config::ServerConfig;
use crate::core::{Basis, Bb84Error, PartyId, ProtocolError};
use crate::simulation::Simulator;

/// Rendezvous point holding one mailbox per party.
///
/// Each request is attributed to its source socket address, which must have
/// been registered for party A or B. A mailbox is locked for the whole of a
/// request, so SEND and MEASURE on the same mailbox are linearizable while
/// the two mailboxes are served independently.
#[derive(Debug)]
pub struct ChannelServer {
    registry: RwLock<[Option<SocketAddr>; 2]>,
    mailboxes: [Mutex<Mailbox>; 2],
    simulator: Simulator,
    qubit_limit: usize,
}

impl Default for ChannelServer {
    fn default() -> Self {
        Self::new(&ServerConfig::default())
    }
}

impl ChannelServer {
    /// Creates a server with two empty mailboxes and no registered parties.
    pub fn new(config: &ServerConfig) -> Self {
        let seed = config.seed.unwrap_or_else(rand::random);
        Self {
            registry: RwLock::new([None, None]),
            mailboxes: [Mutex::new(Mailbox::new(seed)), Mutex::new(Mailbox::new(seed.wrapping_add(1)))],
            simulator: Simulator::with_tolerance(config.tolerance),
            qubit_limit: config.qubit_limit,
        }
    }

    /// Binds `addr` to `party`, replacing any previous binding for that slot.
    ///
    /// An address belongs to at most one party: if the peer slot held `addr`
    /// it is cleared.
    pub async fn register(&self, party: PartyId, addr: SocketAddr) {
        let mut registry = self.registry.write().await;
        if registry[party.peer().index()] == Some(addr) {
            warn!(%party, %addr, peer = %party.peer(), "Address moved from peer slot");
            registry[party.peer().index()] = None;
        }
        registry[party.index()] = Some(addr);
        info!(%party, %addr, "Registered party address");
    }

    /// Resolves the party bound to `addr`.
    pub async fn identify(&self, addr: SocketAddr) -> Result<PartyId, ProtocolError> {
        let registry = self.registry.read().await;
        if registry[PartyId::A.index()] == Some(addr) {
            Ok(PartyId::A)
        } else if registry[PartyId::B.index()] == Some(addr) {
            Ok(PartyId::B)
        } else {
            Err(ProtocolError::UnknownSender(addr.to_string()))
        }
    }

    /// Number of qubits waiting in `party`'s mailbox.
    pub async fn pending(&self, party: PartyId) -> usize {
        self.mailboxes[party.index()].lock().await.len()
    }

    /// Executes a validated command on behalf of the party at `addr`.
    ///
    /// SEND fills the *peer's* mailbox; MEASURE drains the requester's own.
    pub async fn execute(&self, addr: SocketAddr, command: &Command) -> Result<Vec<u8>, Bb84Error> {
        let party = self.identify(addr).await?;
        self.execute_as(party, command).await
    }

    /// Executes a command for an already identified party.
    ///
    /// # Errors
    /// `ProtocolError::InvalidCount` unless `0 < n <= qubit_limit`; checked
    /// here as well as at parse time so in-process callers get the same rules.
    pub async fn execute_as(&self, party: PartyId, command: &Command) -> Result<Vec<u8>, Bb84Error> {
        let n = command.count();
        if n == 0 || n > self.qubit_limit {
            return Err(ProtocolError::InvalidCount { value: n.to_string(), limit: self.qubit_limit }.into());
        }
        match command {
            Command::Send { bases } => {
                let mut mailbox = self.mailboxes[party.peer().index()].lock().await;
                let bits = mailbox.prepare_and_push(bases, &self.simulator)?;
                debug!(%party, n = bases.len(), queued = mailbox.len(), "SEND");
                Ok(bits)
            }
            Command::Measure { bases } => {
                let mut mailbox = self.mailboxes[party.index()].lock().await;
                let bits = mailbox.measure_front(bases, &self.simulator)?;
                debug!(%party, n = bases.len(), remaining = mailbox.len(), "MEASURE");
                Ok(bits)
            }
        }
    }

    /// Intercept-resend on `party`'s incoming qubits: measures up to
    /// `bases.len()` queued qubits and leaves the collapsed states queued.
    pub async fn intercept(&self, party: PartyId, bases: &[Basis]) -> Result<Vec<u8>, Bb84Error> {
        let mut mailbox = self.mailboxes[party.index()].lock().await;
        let bits = mailbox.intercept(bases, &self.simulator)?;
        warn!(%party, n = bits.len(), "Mailbox intercepted");
        Ok(bits)
    }

    /// Parses and executes one request line, producing the reply line.
    pub async fn handle_line(&self, addr: SocketAddr, line: &str) -> Reply {
        let command = match Command::parse_with_limit(line, self.qubit_limit) {
            Ok(command) => command,
            Err(reason) => {
                debug!(%addr, %reason, "Rejected request");
                return Reply::Error(reason);
            }
        };
        match self.execute(addr, &command).await {
            Ok(bits) => Reply::Ok { verb: command.verb(), bits },
            Err(Bb84Error::Protocol(reason)) => {
                debug!(%addr, %reason, "Rejected request");
                Reply::Error(reason)
            }
            Err(e) => {
                error!(%addr, error = %e, "Request failed");
                Reply::Error(ProtocolError::Rejected(e.to_string()))
            }
        }
    }

    /// Serves connections from `listener` until the task is dropped.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> Result<(), Bb84Error> {
        self.serve_until(listener, std::future::pending::<()>()).await
    }

    /// Serves connections from `listener` until `shutdown` completes.
    pub async fn serve_until<F>(self: Arc<Self>, listener: TcpListener, shutdown: F) -> Result<(), Bb84Error>
    where
        F: Future<Output = ()>,
    {
        info!(addr = ?listener.local_addr().ok(), "Channel server listening");
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Channel server shutting down");
                    return Ok(());
                }
                accepted = listener.accept() => {
                    let (stream, addr) = accepted?;
                    info!(%addr, "Connection accepted");
                    let server = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(e) = server.handle_connection(stream, addr).await {
                            warn!(%addr, error = %e, "Connection ended with error");
                        }
                    });
                }
            }
        }
    }

    /// Longest request line accepted, terminator excluded.
    pub fn max_request_len(&self) -> usize {
        // "MEASURE <n> " plus the bases, with slack for a trailing '\r'
        self.qubit_limit + 32
    }

    /// Request/response loop for one connection; one request at a time.
    ///
    /// Lines longer than [`max_request_len`](Self::max_request_len) or not
    /// valid UTF-8 get an `ERR: malformed request` reply and the connection
    /// stays open.
    async fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) -> Result<(), Bb84Error> {
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);
        let max_len = self.max_request_len();
        let mut buf = Vec::with_capacity(max_len + 1);
        loop {
            buf.clear();
            let read = (&mut reader).take(max_len as u64 + 1).read_until(b'\n', &mut buf).await?;
            if read == 0 {
                break;
            }
            let reply = if read > max_len && !buf.ends_with(b"\n") {
                discard_line(&mut reader).await?;
                Reply::Error(ProtocolError::MalformedRequest(format!("request exceeds {} bytes", max_len)))
            } else {
                match std::str::from_utf8(&buf) {
                    Ok(line) => {
                        let line = line.trim_end_matches(['\r', '\n']);
                        if line.trim().is_empty() {
                            continue;
                        }
                        self.handle_line(addr, line).await
                    }
                    Err(e) => Reply::Error(ProtocolError::MalformedRequest(format!("request is not UTF-8: {}", e))),
                }
            };
            if let Reply::Error(reason) = &reply {
                debug!(%addr, %reason, "Replying with error");
            }
            writer.write_all(format!("{}\n", reply).as_bytes()).await?;
            writer.flush().await?;
        }
        debug!(%addr, "Connection closed by peer");
        Ok(())
    }
}

/// Skips input up to and including the next newline (or EOF).
async fn discard_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> std::io::Result<()> {
    loop {
        let chunk = reader.fill_buf().await?;
        if chunk.is_empty() {
            return Ok(());
        }
        let (used, done) = match chunk.iter().position(|b| *b == b'\n') {
            Some(i) => (i + 1, true),
            None => (chunk.len(), false),
        };
        reader.consume(used);
        if done {
            return Ok(());
        }
    }
}
