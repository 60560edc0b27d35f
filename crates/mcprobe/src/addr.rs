//! Server address parsing and SRV resolution.
//!
//! An address is `host[:port]` with the default Minecraft port filled in
//! when none is given. Hostnames without an explicit port may be remapped
//! by a `_minecraft._tcp` SRV record before connecting; the handshake
//! still announces the original host and port.

use std::fmt;

use hickory_resolver::TokioAsyncResolver;
use tracing::debug;

use crate::error::ClientError;

/// The default Minecraft server port.
pub const DEFAULT_PORT: u16 = 25565;

/// A server address with an optional SRV remap.
#[derive(Debug, Clone)]
pub struct Address {
    host: String,
    port: u16,
    explicit_port: bool,
    srv_target: Option<(String, u16)>,
}

impl Address {
    /// Parse an address string of the form `host` or `host:port`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidAddress`] for an empty host, a
    /// malformed port, or more than one colon.
    pub fn parse(raw: &str) -> Result<Self, ClientError> {
        let (host, port, explicit_port) = match raw.split_once(':') {
            None => (raw, DEFAULT_PORT, false),
            Some((host, port)) => {
                if port.contains(':') {
                    return Err(ClientError::InvalidAddress(raw.to_string()));
                }
                let port = port
                    .parse::<u16>()
                    .map_err(|_| ClientError::InvalidAddress(raw.to_string()))?;
                (host, port, true)
            }
        };

        if host.is_empty() {
            return Err(ClientError::InvalidAddress(raw.to_string()));
        }

        Ok(Self {
            host: host.to_string(),
            port,
            explicit_port,
            srv_target: None,
        })
    }

    /// The host as given, announced in the handshake.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The port as given (or the default), announced in the handshake.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Whether the host is an IP literal.
    #[must_use]
    pub fn is_ip(&self) -> bool {
        self.host.parse::<std::net::IpAddr>().is_ok()
    }

    /// The host to actually dial, after any SRV remap.
    #[must_use]
    pub fn connect_host(&self) -> &str {
        self.srv_target.as_ref().map_or(&self.host, |(h, _)| h)
    }

    /// The port to actually dial, after any SRV remap.
    #[must_use]
    pub fn connect_port(&self) -> u16 {
        self.srv_target.as_ref().map_or(self.port, |&(_, p)| p)
    }

    /// Look up the `_minecraft._tcp` SRV record for the host and remap
    /// the connect target to it.
    ///
    /// The lookup is skipped for IP literals and when an explicit port
    /// was supplied. Failures leave the address untouched; callers treat
    /// SRV resolution as best-effort.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the system resolver cannot be constructed
    /// or the lookup fails.
    pub async fn resolve_srv(&mut self) -> Result<(), ClientError> {
        if self.is_ip() || self.explicit_port {
            return Ok(());
        }

        let resolver = TokioAsyncResolver::tokio_from_system_conf()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        let lookup = resolver
            .srv_lookup(format!("_minecraft._tcp.{}.", self.host))
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

        if let Some(record) = lookup.iter().next() {
            let target = record.target().to_utf8();
            let target = target.trim_end_matches('.').to_string();
            debug!(host = %self.host, target = %target, port = record.port(), "SRV record found");
            self.srv_target = Some((target, record.port()));
        }

        Ok(())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.connect_host(), self.connect_port())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_port() {
        let addr = Address::parse("example.com:25566").unwrap();
        assert_eq!(addr.host(), "example.com");
        assert_eq!(addr.port(), 25566);
        assert_eq!(addr.to_string(), "example.com:25566");
    }

    #[test]
    fn test_parse_default_port() {
        let addr = Address::parse("example.com").unwrap();
        assert_eq!(addr.host(), "example.com");
        assert_eq!(addr.port(), DEFAULT_PORT);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(Address::parse("").is_err());
        assert!(Address::parse(":25565").is_err());
        assert!(Address::parse("host:notaport").is_err());
        assert!(Address::parse("host:-1").is_err());
        assert!(Address::parse("host:70000").is_err());
        assert!(Address::parse("a:b:c").is_err());
    }

    #[test]
    fn test_is_ip() {
        assert!(Address::parse("127.0.0.1").unwrap().is_ip());
        assert!(!Address::parse("localhost").unwrap().is_ip());
    }

    #[test]
    fn test_connect_target_without_srv() {
        let addr = Address::parse("play.example.com").unwrap();
        assert_eq!(addr.connect_host(), "play.example.com");
        assert_eq!(addr.connect_port(), DEFAULT_PORT);
    }
}
