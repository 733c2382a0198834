// src/transport/checked.rs

//! Echo/acknowledge wrapper for classical messages between parties.
//!
//! ```text
//! sender                      receiver
//!   | -- payload ------------->  |
//!   | <------------ payload --   |   (echo, verbatim)
//!   | -- ok | nak ------------>  |
//! ```
//!
//! This catches accidental corruption on a link that is already assumed
//! non-adversarial. It gives no cryptographic integrity or authenticity.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::core::{Bb84Error, Result};

/// Acknowledgment sent when the echo matched.
pub const ACK: &str = "ok";
/// Sent in place of [`ACK`] when the echo did not match.
pub const NAK: &str = "nak";

type BoxedReader = Box<dyn AsyncRead + Unpin + Send>;
type BoxedWriter = Box<dyn AsyncWrite + Unpin + Send>;

/// A newline-framed, timeout-bounded connection to the peer party.
pub struct CheckedLink {
    reader: BufReader<BoxedReader>,
    writer: BoxedWriter,
    timeout: Duration,
}

impl std::fmt::Debug for CheckedLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckedLink").field("timeout", &self.timeout).finish_non_exhaustive()
    }
}

impl CheckedLink {
    /// Wraps any bidirectional byte stream (e.g. `tokio::io::duplex` in tests).
    pub fn new<S>(stream: S, timeout: Duration) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        Self::from_parts(Box::new(reader), Box::new(writer), timeout)
    }

    /// Wraps a TCP connection.
    pub fn from_tcp(stream: TcpStream, timeout: Duration) -> Self {
        let (reader, writer) = stream.into_split();
        Self::from_parts(Box::new(reader), Box::new(writer), timeout)
    }

    fn from_parts(reader: BoxedReader, writer: BoxedWriter, timeout: Duration) -> Self {
        Self { reader: BufReader::new(reader), writer, timeout }
    }

    /// The bound applied to every read.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Writes one raw line.
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        if line.contains('\n') {
            return Err(Bb84Error::Encoding("payload must not contain a newline".to_string()));
        }
        let framed = format!("{}\n", line);
        match tokio::time::timeout(self.timeout, async {
            self.writer.write_all(framed.as_bytes()).await?;
            self.writer.flush().await
        })
        .await
        {
            Ok(result) => Ok(result?),
            Err(_) => Err(Bb84Error::Timeout { operation: "peer write", elapsed: self.timeout }),
        }
    }

    /// Reads one raw line, without its terminator.
    pub async fn recv_line(&mut self, operation: &'static str) -> Result<String> {
        let mut line = String::new();
        let read = tokio::time::timeout(self.timeout, self.reader.read_line(&mut line))
            .await
            .map_err(|_| Bb84Error::Timeout { operation, elapsed: self.timeout })??;
        if read == 0 {
            return Err(Bb84Error::ConnectionClosed(format!("peer closed the link while awaiting {}", operation)));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Sends `payload` and waits for the peer to echo it back.
    ///
    /// On a matching echo the acknowledgment is sent and `true` returned. A
    /// mismatch is logged as an integrity error, answered with [`NAK`], and
    /// reported as `false`; it does not fail the call.
    pub async fn checked_send(&mut self, payload: &str) -> Result<bool> {
        self.send_line(payload).await?;
        let echo = self.recv_line("echo").await?;
        if echo == payload {
            self.send_line(ACK).await?;
            debug!(bytes = payload.len(), "Checked send ok");
            Ok(true)
        } else {
            warn!(sent = %payload, echoed = %echo, "Response integrity error: echo mismatch");
            // The closing ACK is withheld; NAK only unblocks the receiver's read
            self.send_line(NAK).await?;
            Ok(false)
        }
    }

    /// Receives a payload, echoes it verbatim, and waits for the acknowledgment.
    ///
    /// An unexpected acknowledgment is logged and the payload is still returned.
    pub async fn checked_receive(&mut self) -> Result<String> {
        let payload = self.recv_line("payload").await?;
        self.send_line(&payload).await?;
        let ack = self.recv_line("acknowledgment").await?;
        if ack != ACK {
            warn!(ack = %ack, "Peer reported message integrity error");
        }
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(timeout: Duration) -> (CheckedLink, CheckedLink) {
        let (a, b) = tokio::io::duplex(64 * 1024);
        (CheckedLink::new(a, timeout), CheckedLink::new(b, timeout))
    }

    #[tokio::test]
    async fn test_checked_round_trip() -> Result<()> {
        let (mut alice, mut bob) = pair(Duration::from_secs(5));
        let receiver = tokio::spawn(async move { bob.checked_receive().await });
        assert!(alice.checked_send("ZXXZ").await?);
        assert_eq!(receiver.await.expect("receiver task panicked")?, "ZXXZ");
        Ok(())
    }

    #[tokio::test]
    async fn test_echo_mismatch_is_not_fatal() -> Result<()> {
        let (mut alice, mut corrupt) = pair(Duration::from_secs(5));
        let peer = tokio::spawn(async move {
            let payload = corrupt.recv_line("payload").await?;
            corrupt.send_line(&payload.replace('Z', "X")).await?;
            corrupt.recv_line("acknowledgment").await
        });
        assert!(!alice.checked_send("ZZ").await?);
        assert_eq!(peer.await.expect("peer task panicked")?, NAK);
        Ok(())
    }

    #[tokio::test]
    async fn test_unexpected_ack_still_returns_payload() -> Result<()> {
        let (mut sender, mut bob) = pair(Duration::from_secs(5));
        let receiver = tokio::spawn(async move { bob.checked_receive().await });
        sender.send_line("beef").await?;
        assert_eq!(sender.recv_line("echo").await?, "beef");
        sender.send_line("garbled").await?;
        assert_eq!(receiver.await.expect("receiver task panicked")?, "beef");
        Ok(())
    }

    #[tokio::test]
    async fn test_silent_peer_times_out() {
        let (mut alice, _bob) = pair(Duration::from_millis(50));
        let err = alice.checked_send("XZ").await.unwrap_err();
        assert!(matches!(err, Bb84Error::Timeout { operation: "echo", .. }));
    }

    #[tokio::test]
    async fn test_closed_peer() {
        let (mut alice, bob) = pair(Duration::from_secs(5));
        drop(bob);
        let err = alice.checked_receive().await.unwrap_err();
        assert!(matches!(err, Bb84Error::ConnectionClosed(_)));
    }

    #[tokio::test]
    async fn test_rejects_embedded_newline() {
        let (mut alice, _bob) = pair(Duration::from_secs(1));
        assert!(matches!(alice.send_line("a\nb").await, Err(Bb84Error::Encoding(_))));
    }
}
