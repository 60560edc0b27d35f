//! Handshake packet definitions.
//!
//! The handshake is the first packet on a connection. It announces the
//! protocol version and which state the connection moves to next; the
//! server never acknowledges it.

use bytes::{BufMut, BytesMut};

use crate::codec::{RawPacket, read_string, read_u16, write_string};
use crate::error::{ProtocolError, Result};
use crate::id;
use crate::varint::{read_varint_buf, write_varint_buf};

/// The next state after handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextState {
    /// Status request (server list ping).
    Status = 1,
    /// Login request.
    Login = 2,
}

impl TryFrom<i32> for NextState {
    type Error = ProtocolError;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            1 => Ok(Self::Status),
            2 => Ok(Self::Login),
            _ => Err(ProtocolError::InvalidNextState(value)),
        }
    }
}

/// Handshake packet sent by the client.
#[derive(Debug, Clone)]
pub struct Handshake {
    /// The protocol version the client is using.
    pub protocol_version: i32,
    /// The server address the client connected to.
    pub server_address: String,
    /// The server port the client connected to.
    pub server_port: u16,
    /// The next state: Status (1) or Login (2).
    pub next_state: NextState,
}

impl Handshake {
    /// Parse a handshake from a raw packet.
    ///
    /// # Errors
    ///
    /// Returns an error if the packet is malformed.
    pub fn from_raw(packet: &RawPacket) -> Result<Self> {
        if packet.id != id::HANDSHAKE {
            return Err(ProtocolError::InvalidPacketId(packet.id));
        }

        let mut buf = packet.body.clone().freeze();

        let protocol_version = read_varint_buf(&mut buf)?;
        let server_address = read_string(&mut buf)?;
        let server_port = read_u16(&mut buf)?;
        let next_state = NextState::try_from(read_varint_buf(&mut buf)?)?;

        Ok(Self {
            protocol_version,
            server_address,
            server_port,
            next_state,
        })
    }

    /// Encode the handshake to a raw packet.
    ///
    /// # Errors
    ///
    /// Returns an error if the server address exceeds the string bound.
    pub fn to_raw(&self) -> Result<RawPacket> {
        let mut body = BytesMut::new();

        write_varint_buf(&mut body, self.protocol_version);
        write_string(&mut body, &self.server_address)?;
        body.put_u16(self.server_port);
        write_varint_buf(&mut body, self.next_state as i32);

        Ok(RawPacket::new(id::HANDSHAKE, body))
    }
}
