//! Status protocol packets.
//!
//! The status protocol is the lightweight pre-login query used by the
//! server list: an empty request answered with a JSON document, and a
//! ping/pong pair for latency measurement.

use bytes::{BufMut, BytesMut};

use crate::codec::{RawPacket, read_i64, read_string, write_string};
use crate::error::{ProtocolError, Result};
use crate::id;

/// Status Request packet (client -> server).
///
/// This is an empty packet that requests server status.
#[derive(Debug, Clone, Default)]
pub struct StatusRequest;

impl StatusRequest {
    /// Parse a status request from a raw packet.
    ///
    /// # Errors
    ///
    /// Returns an error if the packet ID is invalid.
    pub const fn from_raw(packet: &RawPacket) -> Result<Self> {
        if packet.id != id::STATUS_REQUEST {
            return Err(ProtocolError::InvalidPacketId(packet.id));
        }
        Ok(Self)
    }

    /// Encode to a raw packet.
    #[must_use]
    pub fn to_raw(&self) -> RawPacket {
        RawPacket::empty(id::STATUS_REQUEST)
    }
}

/// Status Response packet (server -> client).
///
/// Contains a JSON object with server information.
#[derive(Debug, Clone)]
pub struct StatusResponse {
    /// JSON document describing the server.
    pub json: String,
}

impl StatusResponse {
    /// Create a new status response with the given JSON.
    #[must_use]
    pub fn new(json: impl Into<String>) -> Self {
        Self { json: json.into() }
    }

    /// Parse a status response from a raw packet.
    ///
    /// # Errors
    ///
    /// Returns an error if the packet is malformed.
    pub fn from_raw(packet: &RawPacket) -> Result<Self> {
        if packet.id != id::STATUS_RESPONSE {
            return Err(ProtocolError::InvalidPacketId(packet.id));
        }

        let mut buf = packet.body.clone().freeze();
        let json = read_string(&mut buf)?;

        Ok(Self { json })
    }

    /// Encode to a raw packet.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON document exceeds the string bound.
    pub fn to_raw(&self) -> Result<RawPacket> {
        let mut body = BytesMut::new();
        write_string(&mut body, &self.json)?;
        Ok(RawPacket::new(id::STATUS_RESPONSE, body))
    }
}

/// Ping packet (client -> server).
///
/// Client sends a timestamp, server echoes it back.
#[derive(Debug, Clone)]
pub struct Ping {
    /// Arbitrary token (the client uses a Unix timestamp).
    pub payload: i64,
}

impl Ping {
    /// Create a new ping with the given payload.
    #[must_use]
    pub const fn new(payload: i64) -> Self {
        Self { payload }
    }

    /// Parse a ping from a raw packet.
    ///
    /// # Errors
    ///
    /// Returns an error if the packet is malformed.
    pub fn from_raw(packet: &RawPacket) -> Result<Self> {
        if packet.id != id::PING {
            return Err(ProtocolError::InvalidPacketId(packet.id));
        }

        let mut buf = packet.body.clone().freeze();
        let payload = read_i64(&mut buf)?;

        Ok(Self { payload })
    }

    /// Encode to a raw packet.
    #[must_use]
    pub fn to_raw(&self) -> RawPacket {
        let mut body = BytesMut::with_capacity(8);
        body.put_i64(self.payload);
        RawPacket::new(id::PING, body)
    }
}

/// Pong packet (server -> client).
///
/// Server echoes back the ping payload.
#[derive(Debug, Clone)]
pub struct Pong {
    /// The token from the ping packet.
    pub payload: i64,
}

impl Pong {
    /// Create a new pong with the given payload.
    #[must_use]
    pub const fn new(payload: i64) -> Self {
        Self { payload }
    }

    /// Parse a pong from a raw packet.
    ///
    /// # Errors
    ///
    /// Returns an error if the packet is malformed.
    pub fn from_raw(packet: &RawPacket) -> Result<Self> {
        if packet.id != id::PONG {
            return Err(ProtocolError::InvalidPacketId(packet.id));
        }

        let mut buf = packet.body.clone().freeze();
        let payload = read_i64(&mut buf)?;

        Ok(Self { payload })
    }

    /// Encode to a raw packet.
    #[must_use]
    pub fn to_raw(&self) -> RawPacket {
        let mut body = BytesMut::with_capacity(8);
        body.put_i64(self.payload);
        RawPacket::new(id::PONG, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_request_roundtrip() {
        let raw = StatusRequest.to_raw();
        assert_eq!(raw.id, id::STATUS_REQUEST);
        assert!(raw.body.is_empty());
        assert!(StatusRequest::from_raw(&raw).is_ok());
    }

    #[test]
    fn test_status_response_roundtrip() {
        let json = r#"{"version":{"name":"1.20.4","protocol":765},"players":{"max":20,"online":3}}"#;
        let original = StatusResponse::new(json);
        let raw = original.to_raw().unwrap();
        let parsed = StatusResponse::from_raw(&raw).unwrap();
        assert_eq!(parsed.json, json);
    }

    #[test]
    #[allow(clippy::similar_names)]
    fn test_ping_pong_roundtrip() {
        let ping = Ping::new(1_234_567_890);
        let parsed = Ping::from_raw(&ping.to_raw()).unwrap();
        assert_eq!(parsed.payload, ping.payload);

        let pong = Pong::new(parsed.payload);
        let parsed = Pong::from_raw(&pong.to_raw()).unwrap();
        assert_eq!(parsed.payload, pong.payload);
    }

    #[test]
    fn test_short_pong_body() {
        let raw = RawPacket::new(id::PONG, BytesMut::from(&[0u8; 4][..]));
        assert!(matches!(
            Pong::from_raw(&raw),
            Err(ProtocolError::UnexpectedEof)
        ));
    }
}
