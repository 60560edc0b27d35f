//! Packet ID constants.
//!
//! IDs are scoped to the current protocol state; the same number means
//! different things in the handshake, status and login states.

/// Handshake packet (client -> server, handshaking state).
pub const HANDSHAKE: i32 = 0;

/// Status request packet (client -> server, status state).
pub const STATUS_REQUEST: i32 = 0;

/// Status response packet (server -> client, status state).
pub const STATUS_RESPONSE: i32 = 0;

/// Ping packet (client -> server, status state).
pub const PING: i32 = 1;

/// Pong packet (server -> client, status state).
pub const PONG: i32 = 1;

/// Disconnect packet sent instead of a status response (1.20.2+).
pub const STATUS_DISCONNECT: i32 = 27;

/// Disconnect packet id used by servers before 1.20.2.
pub const LEGACY_STATUS_DISCONNECT: i32 = 26;

/// Both disconnect ids a server may answer a status request with.
///
/// Servers on either side of the 1.20.2 id migration are in the wild, so
/// this is checked as a set, not as a single constant.
pub const STATUS_DISCONNECT_IDS: [i32; 2] = [LEGACY_STATUS_DISCONNECT, STATUS_DISCONNECT];

/// Login start packet (client -> server, login state).
pub const LOGIN_START: i32 = 0;

/// Login disconnect packet (server -> client, login state).
pub const LOGIN_DISCONNECT: i32 = 0;

/// Encryption request packet (server -> client, login state).
pub const LOGIN_ENCRYPTION: i32 = 1;

/// Login success packet (server -> client, login state).
pub const LOGIN_SUCCESS: i32 = 2;

/// Set compression packet (server -> client, login state).
pub const LOGIN_COMPRESSION: i32 = 3;

/// Login plugin request packet (server -> client, login state).
pub const LOGIN_PLUGIN: i32 = 4;
