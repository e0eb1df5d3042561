//! Default port substitution for Bedrock servers.
//!
//! The host's address parser assumes the Java default port. When connecting
//! to a Bedrock server without an explicit port, the Bedrock default is
//! appended before parsing.

use std::fmt;

use crate::version::ProtocolVersion;

/// Default port of Bedrock Edition servers.
pub const BEDROCK_DEFAULT_PORT: u16 = 19_132;

/// Default port of Java Edition servers.
pub const JAVA_DEFAULT_PORT: u16 = 25_565;

/// Append the Bedrock default port when appropriate.
///
/// The port is appended only when `replace_default_port` is set, `version`
/// is [`ProtocolVersion::BEDROCK_LATEST`], and `address` contains no `:` at
/// all. Any colon counts as an explicit port, including one inside an IPv6
/// literal.
///
/// # Examples
///
/// ```
/// use shimframe::{address::resolve, version::ProtocolVersion};
///
/// let bedrock = ProtocolVersion::BEDROCK_LATEST;
/// assert_eq!(resolve("play.example.net", bedrock, true), "play.example.net:19132");
/// assert_eq!(resolve("play.example.net:25565", bedrock, true), "play.example.net:25565");
/// assert_eq!(resolve("play.example.net", ProtocolVersion::R1_8, true), "play.example.net");
/// ```
#[must_use]
pub fn resolve(address: &str, version: ProtocolVersion, replace_default_port: bool) -> String {
    if replace_default_port && version == ProtocolVersion::BEDROCK_LATEST && !address.contains(':')
    {
        format!("{address}:{BEDROCK_DEFAULT_PORT}")
    } else {
        address.to_owned()
    }
}

/// Host and port of a server.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ServerAddress {
    host: String,
    port: u16,
}

impl ServerAddress {
    /// Create an address from parts.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse `host`, `host:port`, `[v6]` or `[v6]:port`.
    ///
    /// A missing port defaults to [`JAVA_DEFAULT_PORT`]. Unbracketed input
    /// with more than one colon is taken as a bare IPv6 literal. Returns
    /// `None` for an empty host or a port that is not a valid `u16`.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let (host, port) = if let Some(rest) = input.strip_prefix('[') {
            let (host, tail) = rest.split_once(']')?;
            match tail {
                "" => (host, None),
                _ => (host, Some(tail.strip_prefix(':')?)),
            }
        } else {
            match input.split_once(':') {
                Some((host, port)) if !port.contains(':') => (host, Some(port)),
                _ => (input, None),
            }
        };
        if host.is_empty() {
            return None;
        }
        let port = match port {
            Some(port) => port.parse().ok()?,
            None => JAVA_DEFAULT_PORT,
        };
        Some(Self::new(host, port))
    }

    /// Host name or address literal.
    #[must_use]
    pub fn host(&self) -> &str { &self.host }

    /// Port number.
    #[must_use]
    pub fn port(&self) -> u16 { self.port }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// [`resolve`] then [`ServerAddress::parse`].
#[must_use]
pub fn resolve_server_address(
    address: &str,
    version: ProtocolVersion,
    replace_default_port: bool,
) -> Option<ServerAddress> {
    ServerAddress::parse(&resolve(address, version, replace_default_port))
}
