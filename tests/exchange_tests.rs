// tests/exchange_tests.rs

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use bb84::{
    Basis, Bb84Error, ChannelClient, ChannelServer, CheckedLink, LocalChannel, OneTimePad, Party, PartyConfig,
    PartyId, ProtocolError, QuantumChannel, Role, ServerConfig,
};

const TIMEOUT: Duration = Duration::from_secs(20);

fn party_config(seed: u64) -> PartyConfig {
    PartyConfig { seed: Some(seed), ..PartyConfig::default() }
}

fn link_pair() -> (CheckedLink, CheckedLink) {
    let (a, b) = tokio::io::duplex(256 * 1024);
    (CheckedLink::new(a, TIMEOUT), CheckedLink::new(b, TIMEOUT))
}

fn seeded_server(seed: u64) -> Arc<ChannelServer> {
    Arc::new(ChannelServer::new(&ServerConfig { seed: Some(seed), ..ServerConfig::default() }))
}

async fn spawn_server(server: Arc<ChannelServer>) -> Result<SocketAddr, Bb84Error> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(server.serve(listener));
    Ok(addr)
}

#[tokio::test]
async fn test_tcp_exchange_yields_identical_keys() -> Result<(), Bb84Error> {
    let server = seeded_server(84);
    let server_addr = spawn_server(Arc::clone(&server)).await?;

    let alice_channel = ChannelClient::connect(server_addr, TIMEOUT).await?;
    let bob_channel = ChannelClient::connect(server_addr, TIMEOUT).await?;
    server.register(PartyId::A, alice_channel.local_addr()).await;
    server.register(PartyId::B, bob_channel.local_addr()).await;

    // Classical peer link over real TCP as well
    let peer_listener = TcpListener::bind("127.0.0.1:0").await?;
    let peer_addr = peer_listener.local_addr()?;
    let (dialed, accepted) = tokio::join!(TcpStream::connect(peer_addr), peer_listener.accept());
    let alice_link = CheckedLink::from_tcp(dialed?, TIMEOUT);
    let bob_link = CheckedLink::from_tcp(accepted?.0, TIMEOUT);

    let mut alice = Party::new(Role::Initiator, party_config(1), alice_channel, alice_link);
    let mut bob = Party::new(Role::Responder, party_config(2), bob_channel, bob_link);

    let (a, b) = tokio::join!(alice.exchange_with_report(16), bob.exchange_with_report(16));
    let (a, b) = (a?, b?);
    assert_eq!(a.key.len(), 16);
    assert_eq!(a.key, b.key);
    assert_eq!(a.rounds, b.rounds);
    assert_eq!(a.qubits, 500 * a.rounds);
    // Roughly half of the positions survive sifting
    assert!(a.sifted_bits > 150 * a.rounds && a.sifted_bits < 350 * a.rounds);
    assert_eq!(server.pending(PartyId::A).await, 0);
    assert_eq!(server.pending(PartyId::B).await, 0);
    Ok(())
}

#[tokio::test]
async fn test_long_key_spans_several_rounds_in_both_directions() -> Result<(), Bb84Error> {
    let server = seeded_server(5);
    let (la, lb) = link_pair();
    let config = |seed| PartyConfig { batch_size: 200, ..party_config(seed) };
    let mut alice = Party::new(Role::Initiator, config(10), LocalChannel::new(Arc::clone(&server), PartyId::A), la);
    let mut bob = Party::new(Role::Responder, config(11), LocalChannel::new(Arc::clone(&server), PartyId::B), lb);

    let (a, b) = tokio::join!(alice.exchange_with_report(40), bob.exchange_with_report(40));
    let (a, b) = (a?, b?);
    assert_eq!(a.key, b.key);
    assert_eq!(a.key.len(), 40);
    // ~100 sifted bits per round leaves ~8 secret bytes, so several rounds are needed
    assert!(a.rounds >= 3, "only {} round(s)", a.rounds);
    Ok(())
}

#[tokio::test]
async fn test_direct_transmission_exchange() -> Result<(), Bb84Error> {
    let (la, lb) = link_pair();
    let mut alice = Party::direct(Role::Initiator, party_config(21), la);
    let mut bob = Party::direct(Role::Responder, party_config(22), lb);

    let (a, b) = tokio::join!(alice.exchange(16), bob.exchange(16));
    let (a, b) = (a?, b?);
    assert_eq!(a, b);

    // The agreed key is usable as a pad
    let mut alice_pad = OneTimePad::new(&a, Role::Initiator);
    let mut bob_pad = OneTimePad::new(&b, Role::Responder);
    let ct = alice_pad.encrypt(b"Hello!")?;
    assert_eq!(bob_pad.decrypt(&ct)?, b"Hello!".to_vec());
    let ct = bob_pad.encrypt(b"Hi")?;
    assert_eq!(alice_pad.decrypt(&ct)?, b"Hi".to_vec());
    Ok(())
}

/// Intercept-resend attacker sitting in front of the receiver's mailbox.
struct Eavesdropper {
    inner: LocalChannel,
    server: Arc<ChannelServer>,
    party: PartyId,
    rng: StdRng,
}

#[async_trait]
impl QuantumChannel for Eavesdropper {
    async fn send(&mut self, bases: &[Basis]) -> bb84::Result<Vec<u8>> {
        self.inner.send(bases).await
    }

    async fn measure(&mut self, bases: &[Basis]) -> bb84::Result<Vec<u8>> {
        let guesses = Basis::random_string(bases.len(), &mut self.rng);
        self.server.intercept(self.party, &guesses).await?;
        self.inner.measure(bases).await
    }
}

#[tokio::test]
async fn test_eavesdropping_aborts_exchange() -> Result<(), Bb84Error> {
    let server = seeded_server(13);
    let (la, lb) = link_pair();
    let mut alice = Party::new(Role::Initiator, party_config(3), LocalChannel::new(Arc::clone(&server), PartyId::A), la);
    let eve = Eavesdropper {
        inner: LocalChannel::new(Arc::clone(&server), PartyId::B),
        server: Arc::clone(&server),
        party: PartyId::B,
        rng: StdRng::seed_from_u64(666),
    };
    let mut bob = Party::new(Role::Responder, party_config(4), eve, lb);

    let (a, b) = tokio::join!(alice.exchange(16), bob.exchange(16));
    assert!(matches!(a, Err(Bb84Error::SubkeyMismatch { round: 0 })), "alice: {:?}", a);
    assert!(matches!(b, Err(Bb84Error::SubkeyMismatch { round: 0 })), "bob: {:?}", b);
    Ok(())
}

#[tokio::test]
async fn test_tiny_batch_is_too_short() {
    let server = seeded_server(1);
    let (la, lb) = link_pair();
    let config = |seed| PartyConfig { batch_size: 8, ..party_config(seed) };
    let mut alice = Party::new(Role::Initiator, config(1), LocalChannel::new(Arc::clone(&server), PartyId::A), la);
    let mut bob = Party::new(Role::Responder, config(2), LocalChannel::new(Arc::clone(&server), PartyId::B), lb);

    let (a, b) = tokio::join!(alice.send_round(8), bob.receive_round(8));
    assert!(matches!(a, Err(Bb84Error::KeyTooShort { subkey_bytes: 4, .. })));
    assert!(matches!(b, Err(Bb84Error::KeyTooShort { subkey_bytes: 4, .. })));
}

#[tokio::test]
async fn test_receiver_times_out_without_sender() {
    let server = seeded_server(2);
    let (_la, lb) = link_pair();
    let config = PartyConfig { timeout_ms: 100, poll_interval_ms: 10, ..party_config(9) };
    let mut bob = Party::new(Role::Responder, config, LocalChannel::new(server, PartyId::B), lb);
    let err = bob.receive_round(10).await.unwrap_err();
    assert!(matches!(err, Bb84Error::Timeout { operation: "queued qubits", .. }), "{:?}", err);
}

#[tokio::test]
async fn test_relay_over_tcp() -> Result<(), Bb84Error> {
    let server = seeded_server(7);
    let addr = spawn_server(Arc::clone(&server)).await?;
    let mut alice = ChannelClient::connect(addr, TIMEOUT).await?;
    let mut bob = ChannelClient::connect(addr, TIMEOUT).await?;
    let mut mallory = ChannelClient::connect(addr, TIMEOUT).await?;
    server.register(PartyId::A, alice.local_addr()).await;
    server.register(PartyId::B, bob.local_addr()).await;

    // Computational round trip is lossless
    let zzz = [Basis::Computational; 3];
    let sent = alice.send(&zzz).await?;
    assert_eq!(bob.measure(&zzz).await?, sent);

    // Unregistered address touches nothing
    let err = mallory.send(&zzz).await.unwrap_err();
    assert!(matches!(err, Bb84Error::Protocol(ProtocolError::UnknownSender(_))));
    assert_eq!(server.pending(PartyId::A).await, 0);
    assert_eq!(server.pending(PartyId::B).await, 0);

    // Short mailbox is left as it was
    alice.send(&zzz).await?;
    let err = bob.measure(&[Basis::Computational; 5]).await.unwrap_err();
    assert!(matches!(
        err,
        Bb84Error::Protocol(ProtocolError::InsufficientQubits { requested: 5, available: 3 })
    ));
    assert_eq!(server.pending(PartyId::B).await, 3);

    // The connection stays usable after errors
    assert_eq!(bob.measure(&zzz).await?.len(), 3);
    Ok(())
}

/// Registers a raw TCP connection as `party` and returns a line reader plus writer.
async fn raw_party(
    server: &Arc<ChannelServer>,
    addr: SocketAddr,
    party: PartyId,
) -> Result<(BufReader<tokio::net::tcp::OwnedReadHalf>, tokio::net::tcp::OwnedWriteHalf), Bb84Error> {
    let stream = TcpStream::connect(addr).await?;
    server.register(party, stream.local_addr()?).await;
    let (reader, writer) = stream.into_split();
    Ok((BufReader::new(reader), writer))
}

async fn reply_line<R: tokio::io::AsyncBufRead + Unpin>(reader: &mut R) -> Result<String, Bb84Error> {
    let mut line = String::new();
    tokio::time::timeout(TIMEOUT, reader.read_line(&mut line))
        .await
        .map_err(|_| Bb84Error::Timeout { operation: "server reply", elapsed: TIMEOUT })??;
    Ok(line.trim_end().to_string())
}

#[tokio::test]
async fn test_non_utf8_request_gets_error_reply() -> Result<(), Bb84Error> {
    let server = seeded_server(17);
    let addr = spawn_server(Arc::clone(&server)).await?;
    let (mut reader, mut writer) = raw_party(&server, addr, PartyId::A).await?;

    writer.write_all(b"SEND 1 \xff\n").await?;
    assert!(reply_line(&mut reader).await?.starts_with("ERR: malformed request"));
    assert_eq!(server.pending(PartyId::B).await, 0);

    // Same connection keeps working
    writer.write_all(b"SEND 1 Z\n").await?;
    assert!(reply_line(&mut reader).await?.starts_with("SEND OK: "));
    assert_eq!(server.pending(PartyId::B).await, 1);
    Ok(())
}

#[tokio::test]
async fn test_oversized_request_is_rejected_without_buffering() -> Result<(), Bb84Error> {
    let server = seeded_server(18);
    let addr = spawn_server(Arc::clone(&server)).await?;
    let (mut reader, mut writer) = raw_party(&server, addr, PartyId::A).await?;

    let mut huge = b"SEND 500 ".to_vec();
    huge.extend(std::iter::repeat_n(b'Z', 100_000));
    huge.push(b'\n');
    writer.write_all(&huge).await?;
    let reply = reply_line(&mut reader).await?;
    assert!(reply.starts_with("ERR: malformed request"), "{}", reply);

    // The rest of the oversized line was skipped, not parsed as a new request
    writer.write_all(b"SEND 2 ZX\r\n").await?;
    assert!(reply_line(&mut reader).await?.starts_with("SEND OK: "));
    assert_eq!(server.pending(PartyId::B).await, 2);
    Ok(())
}
