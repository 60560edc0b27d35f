//! Wire codec for the Minecraft status/ping protocol.
//!
//! This crate provides the length-prefixed varint framing, bounds-checked
//! primitive reads/writes, and the typed packets used by the handshake,
//! status and login states.

pub mod codec;
pub mod error;
pub mod id;
pub mod packets;
pub mod varint;

pub use error::ProtocolError;
