//! Server software fingerprinting.
//!
//! The probe sends a login start packet with one byte too many and
//! classifies the server's reaction. Most implementations answer with a
//! disconnect whose wording leaks which codebase produced it; the rest
//! are identified by which login packet they send instead.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use mcprobe_proto::ProtocolError;
use mcprobe_proto::id;

use crate::client::{Client, ProbeResponse};
use crate::error::ClientError;

/// Flat-string throttle reason some CraftBukkit derivatives send.
const THROTTLE_MESSAGE: &str = "Connection throttled! Please wait before reconnecting.";

/// Disconnect text the Velocity proxy answers old-protocol logins with.
const VELOCITY_COMPAT_MESSAGE: &str =
    "This server is only compatible with Minecraft 1.13 and above.";

/// Prefix netty-based servers put before the overrun diagnostic.
const NETTY_PREFIX: &str =
    "Internal Exception: io.netty.handler.codec.DecoderException: java.io.IOException: Packet ";

static OUTDATED_CLIENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^"Outdated client! Please use (\d\.\d+\.\d+)"$"#).unwrap()
});

/// Trailing part of the overrun diagnostic. The packet is named by a
/// number on older servers and a resource path on newer ones.
static OVERRUN_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r" was larger than I expected, found \d+ bytes extra whilst reading packet (?:\d+|[\w/:.-]+)$")
        .unwrap()
});

/// Leading channel token, e.g. `login/0` or
/// `login/serverbound/minecraft:hello`.
static CHANNEL_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w/:.-]+ ").unwrap());

static VANILLA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\([A-Za-z]{2,3}\)$").unwrap());

static FABRIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\(class_\d+\)$").unwrap());

/// The identified server software.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerSoftware {
    Vanilla,
    CraftBukkit,
    Paper,
    Fabric,
    Forge,
    Velocity,
    /// The server started the encryption handshake instead of rejecting
    /// the probe (online-mode vanilla-like behavior).
    Encryption,
    /// The server accepted the login outright.
    Success,
    /// The server enabled compression before reacting.
    Compression,
    /// The server opened a login plugin channel (common for proxies).
    Plugin,
    /// The server closed the connection or sent an empty reason.
    Empty,
    Unknown,
}

impl std::fmt::Display for ServerSoftware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Vanilla => "vanilla",
            Self::CraftBukkit => "craftbukkit",
            Self::Paper => "paper",
            Self::Fabric => "fabric",
            Self::Forge => "forge",
            Self::Velocity => "velocity",
            Self::Encryption => "encryption",
            Self::Success => "success",
            Self::Compression => "compression",
            Self::Plugin => "plugin",
            Self::Empty => "empty",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Why a probe response could not be mapped to a software.
#[derive(Debug, Error)]
pub enum FingerprintError {
    /// The server throttled the connection; retry later.
    #[error("connection throttled by server")]
    ConnectionThrottled,

    /// The server rejected the announced protocol version outright, so
    /// the overrun diagnostic never fired. Retry with the version the
    /// server expects.
    #[error("version mismatch: {0}")]
    VersionMismatch(String),

    /// The disconnect message carried no translate key.
    #[error("empty error topic")]
    EmptyErrorTopic,

    /// The translate key is not one the cascade knows.
    #[error("server responded with unfamiliar error topic: {0}")]
    UnfamiliarErrorTopic(String),

    /// The disconnect message carried no diagnostic payload.
    #[error("incomplete disconnect message")]
    IncompleteMessage,

    /// The first login packet had an ID outside the login state.
    #[error("unfamiliar packet id: {0}")]
    UnfamiliarPacketId(i32),

    /// The disconnect reason was not valid JSON.
    #[error("failed to parse disconnect message: {0}")]
    Parse(#[from] serde_json::Error),

    /// The probe itself failed.
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// A structured login disconnect message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DisconnectMessage {
    #[serde(default)]
    pub translate: String,
    #[serde(default)]
    pub with: Vec<String>,
    #[serde(default)]
    pub text: String,
}

impl DisconnectMessage {
    /// Parse a disconnect reason JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the reason is not valid JSON.
    pub fn parse(reason: &str) -> Result<Self, FingerprintError> {
        Ok(serde_json::from_str(reason)?)
    }

    /// Detect a protocol version rejection, returning the version the
    /// server asked for when it names one.
    #[must_use]
    pub fn version_mismatch(&self) -> Option<String> {
        match self.translate.as_str() {
            "multiplayer.disconnect.incompatible" | "multiplayer.disconnect.outdated_client" => {
                Some(self.with.first().cloned().unwrap_or_default())
            }
            _ => None,
        }
    }

    /// Classify this message using the default rule table.
    ///
    /// # Errors
    ///
    /// See [`FingerprintError`] for the non-classifiable outcomes.
    pub fn classify(&self) -> Result<ServerSoftware, FingerprintError> {
        self.classify_with_rules(DEFAULT_RULES)
    }

    /// Classify this message against a caller-supplied rule table.
    ///
    /// Rules are tried in order; the first match wins.
    ///
    /// # Errors
    ///
    /// See [`FingerprintError`] for the non-classifiable outcomes.
    pub fn classify_with_rules(&self, rules: &[Rule]) -> Result<ServerSoftware, FingerprintError> {
        if self.text == VELOCITY_COMPAT_MESSAGE {
            return Ok(ServerSoftware::Velocity);
        }
        if self.text == THROTTLE_MESSAGE {
            return Err(FingerprintError::ConnectionThrottled);
        }

        if self.translate.is_empty() {
            return Err(FingerprintError::EmptyErrorTopic);
        }
        if self.translate != "disconnect.genericReason" && self.translate != "%s" {
            return Err(FingerprintError::UnfamiliarErrorTopic(self.translate.clone()));
        }

        let Some(detail) = self.with.first() else {
            return Err(FingerprintError::IncompleteMessage);
        };

        // Reduce the diagnostic to the class-name fragment, e.g.
        // "login/serverbound/minecraft:hello (PacketLoginInStart) was
        // larger than ..." becomes "(PacketLoginInStart)".
        let fragment = detail.strip_prefix(NETTY_PREFIX).unwrap_or(detail);
        let fragment = OVERRUN_SUFFIX_RE.replace(fragment, "");
        let fragment = CHANNEL_PREFIX_RE.replace(&fragment, "");

        for rule in rules {
            if rule.matcher.matches(&fragment) {
                return Ok(rule.software);
            }
        }

        debug!(fragment = %fragment, "no fingerprint rule matched");
        Ok(ServerSoftware::Unknown)
    }
}

/// A single classification rule mapping a diagnostic fragment to a
/// software.
#[derive(Debug)]
pub struct Rule {
    pub matcher: RuleMatcher,
    pub software: ServerSoftware,
}

/// How a rule matches the reduced diagnostic fragment.
#[derive(Debug)]
pub enum RuleMatcher {
    /// Exact string equality.
    Exact(&'static str),
    /// Regular expression over the whole fragment.
    Pattern(&'static LazyLock<Regex>),
}

impl RuleMatcher {
    fn matches(&self, fragment: &str) -> bool {
        match self {
            Self::Exact(s) => fragment == *s,
            Self::Pattern(re) => re.is_match(fragment),
        }
    }
}

/// The built-in rule table, most specific first.
///
/// The mojang-mapped `ServerboundHelloPacket` name appears once Paper
/// ships mojang mappings; obfuscated two-or-three letter names are
/// vanilla and `class_` names come from fabric's intermediary mappings.
pub static DEFAULT_RULES: &[Rule] = &[
    Rule {
        matcher: RuleMatcher::Exact("(PacketLoginInStart)"),
        software: ServerSoftware::CraftBukkit,
    },
    Rule {
        matcher: RuleMatcher::Exact("(ServerboundHelloPacket)"),
        software: ServerSoftware::Paper,
    },
    Rule {
        matcher: RuleMatcher::Pattern(&VANILLA_RE),
        software: ServerSoftware::Vanilla,
    },
    Rule {
        matcher: RuleMatcher::Pattern(&FABRIC_RE),
        software: ServerSoftware::Fabric,
    },
];

/// Classify a raw probe response.
///
/// # Errors
///
/// See [`FingerprintError`] for the non-classifiable outcomes.
pub fn classify_probe(probe: &ProbeResponse) -> Result<ServerSoftware, FingerprintError> {
    match probe.id {
        _ if probe.is_disconnect() => {}
        id::LOGIN_ENCRYPTION => return Ok(ServerSoftware::Encryption),
        id::LOGIN_SUCCESS => return Ok(ServerSoftware::Success),
        id::LOGIN_COMPRESSION => return Ok(ServerSoftware::Compression),
        id::LOGIN_PLUGIN => return Ok(ServerSoftware::Plugin),
        other => return Err(FingerprintError::UnfamiliarPacketId(other)),
    }

    let reason = probe.reason().map_err(FingerprintError::Client)?;
    classify_reason(&reason)
}

/// Classify a disconnect reason string.
///
/// # Errors
///
/// See [`FingerprintError`] for the non-classifiable outcomes.
pub fn classify_reason(reason: &str) -> Result<ServerSoftware, FingerprintError> {
    if reason.is_empty() {
        return Ok(ServerSoftware::Empty);
    }

    if !reason.starts_with('{') {
        // Some servers skip the chat component and send a bare quoted
        // string.
        if reason == format!("\"{THROTTLE_MESSAGE}\"") {
            return Err(FingerprintError::ConnectionThrottled);
        }
        if let Some(caps) = OUTDATED_CLIENT_RE.captures(reason) {
            return Err(FingerprintError::VersionMismatch(caps[1].to_string()));
        }
        // Forge states its mod requirement in prose rather than a
        // structured message.
        if reason.contains("Forge") {
            return Ok(ServerSoftware::Forge);
        }
    }

    let msg = DisconnectMessage::parse(reason)?;
    if let Some(version) = msg.version_mismatch() {
        return Err(FingerprintError::VersionMismatch(version));
    }

    msg.classify()
}

/// A reusable fingerprinting frontend.
#[derive(Debug, Clone)]
pub struct Fingerprinter {
    timeout: Duration,
    srv: bool,
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self {
            timeout: crate::client::DEFAULT_TIMEOUT,
            srv: true,
        }
    }
}

impl Fingerprinter {
    /// Create a fingerprinter with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-operation timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Disable SRV record resolution.
    #[must_use]
    pub const fn without_srv(mut self) -> Self {
        self.srv = false;
        self
    }

    /// Fingerprint a server, asking it for its protocol version first.
    ///
    /// Probing with the server's own protocol version avoids the version
    /// gate that would otherwise mask the overrun diagnostic.
    ///
    /// # Errors
    ///
    /// See [`FingerprintError`] for the non-classifiable outcomes.
    pub async fn fingerprint(&self, addr: &str) -> Result<ServerSoftware, FingerprintError> {
        let status = self
            .client(addr)
            .map_err(FingerprintError::Client)?
            .status()
            .await
            .map_err(FingerprintError::Client)?;

        self.fingerprint_with_protocol(addr, status.version.protocol)
            .await
    }

    /// Fingerprint a server announcing a fixed protocol version.
    ///
    /// # Errors
    ///
    /// See [`FingerprintError`] for the non-classifiable outcomes.
    pub async fn fingerprint_with_protocol(
        &self,
        addr: &str,
        protocol: i32,
    ) -> Result<ServerSoftware, FingerprintError> {
        let mut client = self
            .client(addr)
            .map_err(FingerprintError::Client)?
            .with_protocol_version(protocol);

        match client.login_error().await {
            Ok(probe) => classify_probe(&probe),
            Err(err) if is_clean_eof(&err) => Ok(ServerSoftware::Empty),
            Err(err) => Err(FingerprintError::Client(err)),
        }
    }

    fn client(&self, addr: &str) -> Result<Client, ClientError> {
        let mut client = Client::new(addr)?.with_timeout(self.timeout);
        if !self.srv {
            client = client.without_srv();
        }
        Ok(client)
    }
}

/// Fingerprint a server with default settings.
///
/// # Errors
///
/// See [`FingerprintError`] for the non-classifiable outcomes.
pub async fn fingerprint(addr: &str) -> Result<ServerSoftware, FingerprintError> {
    Fingerprinter::new().fingerprint(addr).await
}

/// Fingerprint a server with default settings and a fixed protocol
/// version.
///
/// # Errors
///
/// See [`FingerprintError`] for the non-classifiable outcomes.
pub async fn fingerprint_with_protocol(
    addr: &str,
    protocol: i32,
) -> Result<ServerSoftware, FingerprintError> {
    Fingerprinter::new()
        .fingerprint_with_protocol(addr, protocol)
        .await
}

/// A server that drops the probe without a word counts as empty, not as
/// a failure.
fn is_clean_eof(err: &ClientError) -> bool {
    match err {
        ClientError::Io(e) | ClientError::Protocol(ProtocolError::Io(e)) => {
            e.kind() == std::io::ErrorKind::UnexpectedEof
        }
        _ => false,
    }
}
