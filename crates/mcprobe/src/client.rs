//! The status/ping/login-probe client.
//!
//! A [`Client`] owns at most one TCP connection and walks it through the
//! handshake into either the status or the login state. Queries
//! auto-connect when needed, so the usual call pattern is just
//! `Client::new(addr)?.status().await`.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace};
use uuid::Uuid;

use mcprobe_proto::codec::{RawPacket, read_packet, read_string, write_packet};
use mcprobe_proto::id;
use mcprobe_proto::packets::{Handshake, LoginStart, NextState, Ping, Pong, StatusRequest};

use crate::addr::Address;
use crate::error::{ClientError, Result};
use crate::response::ServerStatus;

/// Default per-operation timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default protocol version announced in the handshake (1.8.x).
///
/// Old enough that every server recognises it, which matters for the
/// login probe: version-gated servers identify themselves through their
/// rejection message.
pub const DEFAULT_PROTOCOL: i32 = 47;

/// Username announced in the login probe.
const PROBE_USERNAME: &str = "mcprobe";

/// Where the connection is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum ConnState {
    /// No connection is held.
    Idle,
    /// TCP is established, no handshake sent yet.
    Connected,
    /// The handshake has been sent; the connection is committed to one
    /// protocol state.
    HandshakeComplete,
}

/// A server list ping client.
#[derive(Debug)]
pub struct Client {
    addr: Address,
    timeout: Duration,
    protocol: i32,
    srv: bool,
    state: ConnState,
    conn: Option<TcpStream>,
}

impl Client {
    /// Create a client for `host[:port]`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidAddress`] if the address cannot be
    /// parsed.
    pub fn new(addr: &str) -> Result<Self> {
        Ok(Self::from_address(Address::parse(addr)?))
    }

    /// Create a client from an already parsed address.
    #[must_use]
    pub fn from_address(addr: Address) -> Self {
        Self {
            addr,
            timeout: DEFAULT_TIMEOUT,
            protocol: DEFAULT_PROTOCOL,
            srv: true,
            state: ConnState::Idle,
            conn: None,
        }
    }

    /// Set the per-operation timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the protocol version announced in the handshake.
    #[must_use]
    pub const fn with_protocol_version(mut self, protocol: i32) -> Self {
        self.protocol = protocol;
        self
    }

    /// Disable SRV record resolution.
    #[must_use]
    pub const fn without_srv(mut self) -> Self {
        self.srv = false;
        self
    }

    /// The address this client targets.
    #[must_use]
    pub const fn address(&self) -> &Address {
        &self.addr
    }

    /// Establish the TCP connection.
    ///
    /// Queries call this automatically; it is public so callers can
    /// separate connect latency from query latency.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::AlreadyConnected`] if a connection is
    /// already held, [`ClientError::Timeout`] if the dial does not
    /// complete in time.
    pub async fn connect(&mut self) -> Result<()> {
        if self.state > ConnState::Idle {
            return Err(ClientError::AlreadyConnected);
        }

        if self.srv {
            // SRV resolution is best-effort; a failed lookup falls back
            // to the literal address.
            let _ = self.addr.resolve_srv().await;
        }

        let target = (self.addr.connect_host().to_string(), self.addr.connect_port());
        debug!(target = %self.addr, "connecting");

        let stream = timeout(self.timeout, TcpStream::connect(target))
            .await
            .map_err(|_| ClientError::Timeout)??;

        self.conn = Some(stream);
        self.state = ConnState::Connected;
        Ok(())
    }

    /// Query the server status.
    ///
    /// Connects and handshakes if necessary. The returned document has no
    /// latency; use [`Client::status_ping`] or [`Client::ping`] for that.
    ///
    /// # Errors
    ///
    /// Returns an error on connect, protocol or JSON failure, or
    /// [`ClientError::ServerDisconnected`] if the server answers the
    /// request with a disconnect packet.
    pub async fn status(&mut self) -> Result<ServerStatus> {
        self.connect_and_handshake(NextState::Status).await?;

        self.write(&StatusRequest.to_raw()).await?;
        let packet = self.read().await?;

        if id::STATUS_DISCONNECT_IDS.contains(&packet.id) {
            let reason = read_string(&mut packet.body.clone().freeze())?;
            return Err(ClientError::ServerDisconnected(reason));
        }
        if packet.id != id::STATUS_RESPONSE {
            return Err(ClientError::UnexpectedPacketId {
                expected: id::STATUS_RESPONSE,
                got: packet.id,
            });
        }

        let json = read_string(&mut packet.body.clone().freeze())?;
        trace!(len = json.len(), "status document received");
        Ok(ServerStatus::from_json(&json)?)
    }

    /// Measure the roundtrip latency in milliseconds.
    ///
    /// Connects and handshakes if necessary. A completed ping exchange
    /// ends the connection on the server side, so the client returns to
    /// idle afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::PongMismatch`] if the server echoes a
    /// different token than was sent.
    pub async fn ping(&mut self) -> Result<u64> {
        self.connect_and_handshake(NextState::Status).await?;

        #[allow(clippy::cast_possible_wrap)]
        let token = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;

        let started = Instant::now();
        self.write(&Ping::new(token).to_raw()).await?;
        let packet = self.read().await?;
        #[allow(clippy::cast_possible_truncation)]
        let latency_ms = started.elapsed().as_millis() as u64;

        // The server hangs up after the pong either way.
        self.conn = None;
        self.state = ConnState::Idle;

        if packet.id != id::PONG {
            return Err(ClientError::UnexpectedPacketId {
                expected: id::PONG,
                got: packet.id,
            });
        }

        let pong = Pong::from_raw(&packet)?;
        if pong.payload != token {
            return Err(ClientError::PongMismatch {
                sent: token,
                got: pong.payload,
                latency_ms,
            });
        }

        debug!(latency_ms, "ping complete");
        Ok(latency_ms)
    }

    /// Query the status and follow up with a ping on the same connection.
    ///
    /// The measured latency is stored in the returned document.
    ///
    /// # Errors
    ///
    /// Fails like [`Client::status`] and [`Client::ping`].
    pub async fn status_ping(&mut self) -> Result<ServerStatus> {
        let mut status = self.status().await?;
        status.latency = Some(self.ping().await?);
        Ok(status)
    }

    /// Send a deliberately malformed login and capture the server's
    /// reaction.
    ///
    /// The login start carries one byte more than the packet format
    /// allows, which most server implementations answer with a disconnect
    /// whose wording identifies the software. The response is returned
    /// raw; see the fingerprint module for interpretation.
    ///
    /// # Errors
    ///
    /// Returns an error on connect or write failure. A read failure is
    /// also an error here; the fingerprint layer distinguishes a clean
    /// EOF from a real failure.
    pub async fn login_error(&mut self) -> Result<ProbeResponse> {
        self.connect_and_handshake(NextState::Login).await?;

        let login = LoginStart::new(PROBE_USERNAME, Uuid::nil());
        self.write(&login.to_probe_raw()?).await?;

        let packet = self.read().await?;
        debug!(id = packet.id, len = packet.body.len(), "probe response");

        self.conn = None;
        self.state = ConnState::Idle;

        Ok(ProbeResponse {
            id: packet.id,
            body: packet.body.freeze(),
        })
    }

    async fn connect_and_handshake(&mut self, next_state: NextState) -> Result<()> {
        if self.state == ConnState::Idle {
            self.connect().await?;
        }
        if self.state == ConnState::Connected {
            self.send_handshake(next_state).await?;
        }
        Ok(())
    }

    async fn send_handshake(&mut self, next_state: NextState) -> Result<()> {
        // The handshake announces the address as given, not the SRV
        // target; virtual-host routing depends on it.
        let handshake = Handshake {
            protocol_version: self.protocol,
            server_address: self.addr.host().to_string(),
            server_port: self.addr.port(),
            next_state,
        };

        self.write(&handshake.to_raw()?).await?;
        self.state = ConnState::HandshakeComplete;
        Ok(())
    }

    async fn write(&mut self, packet: &RawPacket) -> Result<()> {
        let conn = self.conn.as_mut().ok_or_else(|| {
            ClientError::Io(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "client is not connected",
            ))
        })?;
        write_packet(conn, packet).await?;
        Ok(())
    }

    async fn read(&mut self) -> Result<RawPacket> {
        let deadline = self.timeout;
        let conn = self.conn.as_mut().ok_or_else(|| {
            ClientError::Io(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "client is not connected",
            ))
        })?;
        let packet = timeout(deadline, read_packet(conn))
            .await
            .map_err(|_| ClientError::Timeout)??;
        Ok(packet)
    }
}

/// The raw outcome of a login probe.
///
/// Carries the packet ID and undecoded body so that non-disconnect
/// responses (encryption requests, compressed successes) survive without
/// a decode attempt.
#[derive(Debug, Clone)]
pub struct ProbeResponse {
    /// The packet ID of the first login-state response.
    pub id: i32,
    /// The undecoded packet body.
    pub body: Bytes,
}

impl ProbeResponse {
    /// Whether the response is a login disconnect.
    #[must_use]
    pub const fn is_disconnect(&self) -> bool {
        self.id == id::LOGIN_DISCONNECT
    }

    /// Decode the disconnect reason string from the body.
    ///
    /// Only meaningful when [`ProbeResponse::is_disconnect`] is true.
    ///
    /// # Errors
    ///
    /// Returns an error if the body does not hold a well-formed string.
    pub fn reason(&self) -> Result<String> {
        let mut buf = self.body.clone();
        Ok(read_string(&mut buf)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conn_state_ordering() {
        assert!(ConnState::Idle < ConnState::Connected);
        assert!(ConnState::Connected < ConnState::HandshakeComplete);
    }

    #[test]
    fn test_builder() {
        let client = Client::new("example.com:25566")
            .unwrap()
            .with_timeout(Duration::from_secs(1))
            .with_protocol_version(765)
            .without_srv();

        assert_eq!(client.timeout, Duration::from_secs(1));
        assert_eq!(client.protocol, 765);
        assert!(!client.srv);
        assert_eq!(client.address().port(), 25566);
    }

    #[test]
    fn test_invalid_address() {
        assert!(matches!(
            Client::new("host:bad"),
            Err(ClientError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_probe_response_reason() {
        use bytes::BytesMut;
        use mcprobe_proto::codec::write_string;

        let mut body = BytesMut::new();
        write_string(&mut body, "go away").unwrap();
        let probe = ProbeResponse {
            id: id::LOGIN_DISCONNECT,
            body: body.freeze(),
        };

        assert!(probe.is_disconnect());
        assert_eq!(probe.reason().unwrap(), "go away");
    }
}
