//! The status document returned by a server list ping.
//!
//! The document is plain JSON except for the `description` field, which
//! servers send either as a flat string or as a formatted chat component
//! tree. Both shapes are normalised into [`Description`] and flattened to
//! plain text on demand.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Prefix of the data URI carrying the server icon.
const FAVICON_PREFIX: &str = "data:image/png;base64,";

/// A parsed status response.
///
/// Produced once per status query; the client appends `latency` after a
/// successful ping and the document is otherwise immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerStatus {
    /// Server version information.
    pub version: Version,

    /// Player counts and optional sample.
    #[serde(default)]
    pub players: Players,

    /// Message of the day.
    pub description: Description,

    /// Data-URI-embedded base64 PNG icon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,

    #[serde(
        default,
        rename = "enforcesSecureChat",
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub enforces_secure_chat: bool,

    #[serde(
        default,
        rename = "previewsChat",
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub previews_chat: bool,

    /// Forge mod metadata (Forge 1.7 - 1.12).
    #[serde(default, rename = "modinfo", skip_serializing_if = "Option::is_none")]
    pub mod_info: Option<LegacyForgeModInfo>,

    /// Forge mod metadata (Forge 1.13+).
    #[serde(default, rename = "forgeData", skip_serializing_if = "Option::is_none")]
    pub forge_data: Option<ForgeData>,

    /// Roundtrip latency in milliseconds, measured by the client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<u64>,
}

impl ServerStatus {
    /// Parse a raw status response JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid JSON.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Serialize the document back to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// The message of the day as flat text.
    #[must_use]
    pub fn motd(&self) -> String {
        self.description.plain_text()
    }

    /// Decode the favicon data URI into PNG bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the response carries no favicon or the base64
    /// payload is malformed.
    pub fn icon(&self) -> Result<Vec<u8>, FaviconError> {
        let favicon = self.favicon.as_deref().ok_or(FaviconError::Missing)?;
        let encoded = favicon.strip_prefix(FAVICON_PREFIX).unwrap_or(favicon);
        Ok(BASE64.decode(encoded)?)
    }
}

/// Errors produced when decoding the server icon.
#[derive(Debug, Error)]
pub enum FaviconError {
    /// The status response does not contain a favicon.
    #[error("status response does not contain a favicon")]
    Missing,

    /// The favicon payload is not valid base64.
    #[error("failed to decode favicon: {0}")]
    Decode(#[from] base64::DecodeError),
}

/// Server version information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
    /// Human-readable version name.
    pub name: String,
    /// Protocol version number.
    pub protocol: i32,
}

/// Player counts and optional sample.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Players {
    pub max: i32,
    pub online: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sample: Vec<Player>,
}

/// An individual player in the sample list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub id: String,
}

/// Forge mod metadata (Forge 1.13+).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgeData {
    #[serde(default)]
    pub channels: Vec<ForgeChannel>,
    #[serde(default)]
    pub mods: Vec<ForgeMod>,
    #[serde(default, rename = "fmlNetworkVersion")]
    pub fml_network_version: i32,
}

/// A Forge mod channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgeChannel {
    pub res: String,
    pub version: String,
    pub required: bool,
}

/// A Forge mod entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgeMod {
    #[serde(rename = "modId")]
    pub mod_id: String,
    #[serde(rename = "modmarker")]
    pub mod_marker: String,
}

/// Legacy Forge mod metadata (Forge 1.7 - 1.12).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyForgeModInfo {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, rename = "modList")]
    pub mod_list: Vec<LegacyForgeMod>,
}

/// A legacy Forge mod entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyForgeMod {
    #[serde(rename = "modid")]
    pub mod_id: String,
    pub version: String,
}

/// A server description.
///
/// Servers send this either as a flat string or as a chat component
/// tree. The decode step inspects the raw JSON shape and normalises both
/// variants.
#[derive(Debug, Clone)]
pub enum Description {
    /// Flat string form.
    Text(String),
    /// Formatted chat component form.
    Component(ChatComponent),
}

impl Description {
    /// Flatten the description into plain text, walking nested `extra`
    /// segments in order.
    #[must_use]
    pub fn plain_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Component(component) => component.plain_text(),
        }
    }
}

impl<'de> Deserialize<'de> for Description {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::String(text) => Ok(Self::Text(text)),
            serde_json::Value::Object(_) => {
                let component = ChatComponent::deserialize(value).map_err(D::Error::custom)?;
                Ok(Self::Component(component))
            }
            other => Err(D::Error::custom(format!(
                "description must be a string or an object, got {other}"
            ))),
        }
    }
}

impl Serialize for Description {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Text(text) => text.serialize(serializer),
            Self::Component(component) => component.serialize(serializer),
        }
    }
}

/// A formatted text node in a description tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatComponent {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub underlined: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub strikethrough: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub obfuscated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Nested segments, each again either flat or formatted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<Description>,
}

impl ChatComponent {
    /// Concatenate this node's text with all `extra` leaves in order.
    #[must_use]
    pub fn plain_text(&self) -> String {
        let mut text = self.text.clone();
        for extra in &self.extra {
            text.push_str(&extra.plain_text());
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_description() {
        let raw = r#"{
            "version": {"name": "1.20.4", "protocol": 765},
            "players": {"max": 20, "online": 3},
            "description": "A Minecraft Server"
        }"#;

        let status = ServerStatus::from_json(raw).unwrap();
        assert_eq!(status.version.name, "1.20.4");
        assert_eq!(status.version.protocol, 765);
        assert_eq!(status.players.max, 20);
        assert_eq!(status.players.online, 3);
        assert_eq!(status.motd(), "A Minecraft Server");
        assert!(status.latency.is_none());
    }

    #[test]
    fn test_component_description_with_nested_extra() {
        let raw = r#"{
            "version": {"name": "Paper 1.20.4", "protocol": 765},
            "players": {"max": 100, "online": 7, "sample": [{"name": "steve", "id": "abc"}]},
            "description": {
                "text": "Hello, ",
                "color": "gold",
                "extra": [
                    {"text": "world", "bold": true, "extra": ["!"]},
                    " bye"
                ]
            }
        }"#;

        let status = ServerStatus::from_json(raw).unwrap();
        assert_eq!(status.motd(), "Hello, world! bye");
        assert_eq!(status.players.sample.len(), 1);
        assert_eq!(status.players.sample[0].name, "steve");
    }

    #[test]
    fn test_description_rejects_other_shapes() {
        let raw = r#"{
            "version": {"name": "x", "protocol": 0},
            "description": 42
        }"#;
        assert!(ServerStatus::from_json(raw).is_err());
    }

    #[test]
    fn test_favicon_decode() {
        let raw = r#"{
            "version": {"name": "1.20.4", "protocol": 765},
            "players": {"max": 20, "online": 0},
            "description": "icon test",
            "favicon": "data:image/png;base64,aGVsbG8="
        }"#;

        let status = ServerStatus::from_json(raw).unwrap();
        assert_eq!(status.icon().unwrap(), b"hello");
    }

    #[test]
    fn test_favicon_missing() {
        let raw = r#"{
            "version": {"name": "1.20.4", "protocol": 765},
            "players": {"max": 20, "online": 0},
            "description": "no icon"
        }"#;

        let status = ServerStatus::from_json(raw).unwrap();
        assert!(matches!(status.icon(), Err(FaviconError::Missing)));
    }

    #[test]
    fn test_forge_data() {
        let raw = r#"{
            "version": {"name": "forge", "protocol": 763},
            "players": {"max": 20, "online": 0},
            "description": "modded",
            "forgeData": {
                "channels": [{"res": "minecraft:register", "version": "1", "required": true}],
                "mods": [{"modId": "examplemod", "modmarker": "1.0.0"}],
                "fmlNetworkVersion": 3
            }
        }"#;

        let status = ServerStatus::from_json(raw).unwrap();
        let forge = status.forge_data.unwrap();
        assert_eq!(forge.fml_network_version, 3);
        assert_eq!(forge.mods[0].mod_id, "examplemod");
    }

    #[test]
    fn test_json_roundtrip_preserves_description_shape() {
        let flat = ServerStatus {
            version: Version {
                name: "1.20.4".to_string(),
                protocol: 765,
            },
            players: Players::default(),
            description: Description::Text("plain".to_string()),
            favicon: None,
            enforces_secure_chat: false,
            previews_chat: false,
            mod_info: None,
            forge_data: None,
            latency: None,
        };

        let json = flat.to_json().unwrap();
        assert!(json.contains(r#""description":"plain""#));

        let parsed = ServerStatus::from_json(&json).unwrap();
        assert!(matches!(parsed.description, Description::Text(_)));
    }
}
