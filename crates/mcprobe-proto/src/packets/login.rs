//! Login protocol packets.
//!
//! Only the slice of the login state the prober needs: the start packet
//! (including its deliberately overlong probe encoding) and the disconnect
//! a server answers a rejected login with. Encryption, compression and
//! plugin packets are identified by ID only and never decoded.

use bytes::{Buf, BufMut, BytesMut};
use uuid::Uuid;

use crate::codec::{RawPacket, read_string, write_string};
use crate::error::{ProtocolError, Result};
use crate::id;

/// Maximum username length (16 characters).
pub const MAX_USERNAME_LENGTH: usize = 16;

/// Login Start packet (client -> server).
#[derive(Debug, Clone)]
pub struct LoginStart {
    /// The player's username.
    pub name: String,
    /// The player's UUID.
    pub uuid: Uuid,
}

impl LoginStart {
    /// Create a new login start packet.
    #[must_use]
    pub fn new(name: impl Into<String>, uuid: Uuid) -> Self {
        Self {
            name: name.into(),
            uuid,
        }
    }

    /// Parse from a raw packet.
    ///
    /// # Errors
    ///
    /// Returns an error if the packet is malformed.
    pub fn from_raw(packet: &RawPacket) -> Result<Self> {
        if packet.id != id::LOGIN_START {
            return Err(ProtocolError::InvalidPacketId(packet.id));
        }

        let mut buf = packet.body.clone().freeze();
        let name = read_string(&mut buf)?;
        if buf.remaining() < 16 {
            return Err(ProtocolError::UnexpectedEof);
        }
        let mut bytes = [0u8; 16];
        buf.copy_to_slice(&mut bytes);

        Ok(Self {
            name,
            uuid: Uuid::from_bytes(bytes),
        })
    }

    /// Encode to a raw packet.
    ///
    /// # Errors
    ///
    /// Returns an error if the username exceeds [`MAX_USERNAME_LENGTH`].
    pub fn to_raw(&self) -> Result<RawPacket> {
        Ok(RawPacket::new(id::LOGIN_START, self.encode_body()?))
    }

    /// Encode to a raw packet with one trailing byte the protocol does not
    /// expect.
    ///
    /// The extra byte overruns the peer's login parser and provokes the
    /// diagnostic disconnect the fingerprint cascade is calibrated
    /// against. The real-world error strings depend on it being exactly
    /// one byte, so the padding is not configurable.
    ///
    /// # Errors
    ///
    /// Returns an error if the username exceeds [`MAX_USERNAME_LENGTH`].
    pub fn to_probe_raw(&self) -> Result<RawPacket> {
        let mut body = self.encode_body()?;
        body.put_u8(0);
        Ok(RawPacket::new(id::LOGIN_START, body))
    }

    fn encode_body(&self) -> Result<BytesMut> {
        if self.name.len() > MAX_USERNAME_LENGTH {
            return Err(ProtocolError::StringTooLong {
                len: self.name.len(),
                max: MAX_USERNAME_LENGTH,
            });
        }

        let mut body = BytesMut::new();
        write_string(&mut body, &self.name)?;
        body.put_slice(self.uuid.as_bytes());
        Ok(body)
    }
}

/// Login Disconnect packet (server -> client).
///
/// Sent when the server rejects the client during login. The reason is a
/// JSON chat component or a plain quoted string, depending on the server.
#[derive(Debug, Clone)]
pub struct LoginDisconnect {
    /// The disconnect reason.
    pub reason: String,
}

impl LoginDisconnect {
    /// Create a new disconnect packet.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Parse from a raw packet.
    ///
    /// # Errors
    ///
    /// Returns an error if the packet is malformed.
    pub fn from_raw(packet: &RawPacket) -> Result<Self> {
        if packet.id != id::LOGIN_DISCONNECT {
            return Err(ProtocolError::InvalidPacketId(packet.id));
        }

        let mut buf = packet.body.clone().freeze();
        let reason = read_string(&mut buf)?;

        Ok(Self { reason })
    }

    /// Encode to a raw packet.
    ///
    /// # Errors
    ///
    /// Returns an error if the reason exceeds the string bound.
    pub fn to_raw(&self) -> Result<RawPacket> {
        let mut body = BytesMut::new();
        write_string(&mut body, &self.reason)?;
        Ok(RawPacket::new(id::LOGIN_DISCONNECT, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_start_roundtrip() {
        let uuid = Uuid::new_v4();
        let original = LoginStart::new("Prober", uuid);
        let raw = original.to_raw().unwrap();
        let parsed = LoginStart::from_raw(&raw).unwrap();

        assert_eq!(parsed.name, "Prober");
        assert_eq!(parsed.uuid, uuid);
    }

    #[test]
    fn test_probe_encoding_has_one_trailing_byte() {
        let login = LoginStart::new("Prober", Uuid::nil());
        let plain = login.to_raw().unwrap();
        let probe = login.to_probe_raw().unwrap();

        assert_eq!(probe.body.len(), plain.body.len() + 1);
        assert_eq!(probe.body[probe.body.len() - 1], 0);
        assert_eq!(&probe.body[..plain.body.len()], &plain.body[..]);
    }

    #[test]
    fn test_name_too_long() {
        let login = LoginStart::new("ThisNameIsWayTooLong", Uuid::nil());
        assert!(matches!(
            login.to_raw(),
            Err(ProtocolError::StringTooLong { max: 16, .. })
        ));
    }

    #[test]
    fn test_login_disconnect_roundtrip() {
        let original = LoginDisconnect::new(r#"{"text":"login not supported"}"#);
        let raw = original.to_raw().unwrap();
        let parsed = LoginDisconnect::from_raw(&raw).unwrap();

        assert_eq!(parsed.reason, r#"{"text":"login not supported"}"#);
    }
}
