//! A minimal status mirror server.
//!
//! The mirror speaks just enough of the protocol to show up in a server
//! list: it answers the handshake, serves a canned status document,
//! echoes pings and politely rejects login attempts. It doubles as the
//! far end for client integration tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{Instrument, debug, info, info_span, warn};

use mcprobe_proto::ProtocolError;
use mcprobe_proto::codec::{read_packet, write_packet};
use mcprobe_proto::id;
use mcprobe_proto::packets::{Handshake, LoginDisconnect, LoginStart, NextState, Ping, Pong, StatusResponse};

use crate::error::Result;
use crate::response::{Description, Players, ServerStatus, Version};

/// Reason sent to clients that try to log in.
const LOGIN_REJECTED: &str = "login not supported";

static NEXT_SID: AtomicU64 = AtomicU64::new(0);

/// A status-only mirror server.
#[derive(Debug)]
pub struct Mirror {
    motd: String,
    version_name: String,
    protocol: i32,
    max_players: i32,
    online_players: i32,
    timeout: Duration,
}

impl Default for Mirror {
    fn default() -> Self {
        Self {
            motd: "mcprobe mirror".to_string(),
            version_name: "1.20.4".to_string(),
            protocol: 765,
            max_players: 20,
            online_players: 3,
            timeout: Duration::from_secs(5),
        }
    }
}

impl Mirror {
    /// Create a mirror with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the message of the day.
    #[must_use]
    pub fn with_motd(mut self, motd: impl Into<String>) -> Self {
        self.motd = motd.into();
        self
    }

    /// Set the advertised version name and protocol number.
    #[must_use]
    pub fn with_version(mut self, name: impl Into<String>, protocol: i32) -> Self {
        self.version_name = name.into();
        self.protocol = protocol;
        self
    }

    /// Set the advertised player counts.
    #[must_use]
    pub const fn with_players(mut self, online: i32, max: i32) -> Self {
        self.online_players = online;
        self.max_players = max;
        self
    }

    /// Set the per-read timeout for idle connections.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Serve connections from the listener until the task is dropped.
    ///
    /// Each connection runs in its own task; a failed connection is
    /// logged and never takes the accept loop down.
    ///
    /// # Errors
    ///
    /// Returns an error if `accept` fails.
    pub async fn run(self: Arc<Self>, listener: TcpListener) -> Result<()> {
        info!(addr = %listener.local_addr()?, "mirror listening");

        loop {
            let (stream, peer) = listener.accept().await?;
            let sid = NEXT_SID.fetch_add(1, Ordering::Relaxed);
            let span = info_span!("conn", sid, ip = %peer.ip(), port = peer.port());

            let mirror = Arc::clone(&self);
            tokio::spawn(
                async move {
                    if let Err(err) = mirror.handle(stream).await {
                        warn!(%err, "connection failed");
                    }
                }
                .instrument(span),
            );
        }
    }

    async fn handle(&self, mut stream: TcpStream) -> Result<()> {
        let packet = self.read(&mut stream).await?;
        let handshake = Handshake::from_raw(&packet)?;
        debug!(
            protocol = handshake.protocol_version,
            address = %handshake.server_address,
            state = ?handshake.next_state,
            "handshake"
        );

        match handshake.next_state {
            NextState::Status => self.serve_status(&mut stream).await,
            NextState::Login => self.reject_login(&mut stream).await,
        }
    }

    async fn serve_status(&self, stream: &mut TcpStream) -> Result<()> {
        loop {
            let packet = match self.read(stream).await {
                Ok(packet) => packet,
                // The client hanging up after the response is the normal
                // end of a status exchange.
                Err(err) if is_eof(&err) => return Ok(()),
                Err(err) => return Err(err),
            };

            match packet.id {
                id::STATUS_REQUEST if packet.body.is_empty() => {
                    let response = StatusResponse::new(self.status_json()?);
                    write_packet(stream, &response.to_raw()?).await?;
                    debug!("status served");
                }
                id::PING => {
                    let ping = Ping::from_raw(&packet)?;
                    write_packet(stream, &Pong::new(ping.payload).to_raw()).await?;
                    debug!(payload = ping.payload, "pong sent");
                    return Ok(());
                }
                other => {
                    return Err(ProtocolError::InvalidPacketId(other).into());
                }
            }
        }
    }

    async fn reject_login(&self, stream: &mut TcpStream) -> Result<()> {
        let packet = self.read(stream).await?;
        // Probes append a stray trailing byte; from_raw tolerates it.
        match LoginStart::from_raw(&packet) {
            Ok(login) => debug!(name = %login.name, "login attempt"),
            Err(err) => debug!(%err, "malformed login start"),
        }

        let disconnect = LoginDisconnect::new(LOGIN_REJECTED);
        write_packet(stream, &disconnect.to_raw()?).await?;
        Ok(())
    }

    fn status_json(&self) -> Result<String> {
        let status = ServerStatus {
            version: Version {
                name: self.version_name.clone(),
                protocol: self.protocol,
            },
            players: Players {
                max: self.max_players,
                online: self.online_players,
                sample: Vec::new(),
            },
            description: Description::Text(self.motd.clone()),
            favicon: None,
            enforces_secure_chat: false,
            previews_chat: false,
            mod_info: None,
            forge_data: None,
            latency: None,
        };
        Ok(status.to_json()?)
    }

    async fn read(
        &self,
        stream: &mut TcpStream,
    ) -> Result<mcprobe_proto::codec::RawPacket> {
        let packet = timeout(self.timeout, read_packet(stream))
            .await
            .map_err(|_| crate::error::ClientError::Timeout)??;
        Ok(packet)
    }
}

fn is_eof(err: &crate::error::ClientError) -> bool {
    match err {
        crate::error::ClientError::Io(e)
        | crate::error::ClientError::Protocol(ProtocolError::Io(e)) => {
            e.kind() == std::io::ErrorKind::UnexpectedEof
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_json_is_parseable() {
        let mirror = Mirror::new()
            .with_motd("test motd")
            .with_version("1.8.9", 47)
            .with_players(7, 100);

        let status = ServerStatus::from_json(&mirror.status_json().unwrap()).unwrap();
        assert_eq!(status.motd(), "test motd");
        assert_eq!(status.version.protocol, 47);
        assert_eq!(status.players.online, 7);
        assert_eq!(status.players.max, 100);
    }
}
