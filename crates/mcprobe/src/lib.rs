//! A Minecraft server list ping client, software fingerprinter and
//! status mirror.
//!
//! The [`Client`] performs status queries, latency pings and the
//! malformed-login probe; the [`fingerprint`] module maps probe
//! responses to server software; [`Mirror`] serves a canned status
//! document for testing and standing in for a real server.

pub mod addr;
pub mod client;
pub mod error;
pub mod fingerprint;
pub mod response;
pub mod server;

pub use addr::{Address, DEFAULT_PORT};
pub use client::{Client, DEFAULT_PROTOCOL, DEFAULT_TIMEOUT, ProbeResponse};
pub use error::ClientError;
pub use fingerprint::{FingerprintError, Fingerprinter, ServerSoftware};
pub use response::ServerStatus;
pub use server::Mirror;
