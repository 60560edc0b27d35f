//! Typed packet definitions.

pub mod handshake;
pub mod login;
pub mod status;

pub use handshake::{Handshake, NextState};
pub use login::{LoginDisconnect, LoginStart};
pub use status::{Ping, Pong, StatusRequest, StatusResponse};
