//! Client error types.

use std::io;

use thiserror::Error;

use mcprobe_proto::ProtocolError;

/// Errors that can occur while talking to a server.
#[derive(Debug, Error)]
pub enum ClientError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The wire data violated the framing rules.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A read or connect did not complete within the configured deadline.
    #[error("operation timed out")]
    Timeout,

    /// `connect` was called on a client that already holds a connection.
    #[error("client is already connected")]
    AlreadyConnected,

    /// The address string could not be parsed.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The server answered with a packet ID that is invalid for the
    /// current protocol state.
    #[error("response packet contains bad packet id: {got} (expected {expected})")]
    UnexpectedPacketId {
        /// The packet ID that was expected.
        expected: i32,
        /// The packet ID the server sent.
        got: i32,
    },

    /// The server sent a disconnect packet instead of the expected
    /// response.
    #[error("disconnect packet from server: {0}")]
    ServerDisconnected(String),

    /// The pong payload did not echo the ping token. The measured
    /// latency is still carried here since the roundtrip did complete.
    #[error("server responded with wrong pong token: sent {sent}, got {got}")]
    PongMismatch {
        /// The token sent in the ping.
        sent: i64,
        /// The token the server echoed.
        got: i64,
        /// Wall-clock roundtrip time in milliseconds.
        latency_ms: u64,
    },

    /// The status document was not valid JSON.
    #[error("failed to parse status response: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using [`ClientError`].
pub type Result<T> = std::result::Result<T, ClientError>;
