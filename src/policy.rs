//! Per-version behavioural limits.
//!
//! [`active_limits`] is a pure query over the negotiated version and a narrow
//! view of the live connection. It is evaluated on demand and never cached,
//! since the negotiated version may change between calls.

use crate::version::ProtocolVersion;

/// Message length granted when the classic peer supports longer messages.
///
/// Two bytes of head-room above twice the signed 16-bit maximum; effectively
/// unbounded.
pub const LONG_MESSAGE_LENGTH: i32 = 65_534;

/// Classic chat packets carry at most this many characters.
pub const CLASSIC_CHAT_WIDTH: i32 = 64;

/// Extensions a classic server may advertise during extension negotiation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ServerExtension {
    /// Chat messages may be split across several packets.
    LongerMessages,
}

/// Facts about the live connection that the policy depends on.
pub trait ConnectionCapabilities {
    /// Whether the peer advertised `extension` during negotiation.
    fn has_server_extension(&self, extension: ServerExtension) -> bool;

    /// Length of the local player's name, in characters.
    fn current_username_length(&self) -> usize;
}

/// Fixed capabilities, for offline queries and tests.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StaticCapabilities {
    /// Extensions the peer is assumed to have advertised.
    pub extensions: Vec<ServerExtension>,
    /// Assumed username length.
    pub username_length: usize,
}

impl ConnectionCapabilities for StaticCapabilities {
    fn has_server_extension(&self, extension: ServerExtension) -> bool {
        self.extensions.contains(&extension)
    }

    fn current_username_length(&self) -> usize { self.username_length }
}

/// Limits in force for a negotiated version.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActiveLimits {
    /// Longest chat message the peer accepts. May be zero or negative for
    /// long names on classic revisions.
    pub max_message_length: i32,
    /// Whether a legacy protocol extension changed the limits.
    pub legacy_extension_active: bool,
    /// Whether the version belongs to the bedrock family.
    pub is_bedrock_family: bool,
}

/// Compute the limits for `version`.
///
/// Rules are evaluated in order and the first match wins.
///
/// # Examples
///
/// ```
/// use shimframe::{
///     policy::{ConnectionCapabilities, ServerExtension, active_limits},
///     version::ProtocolVersion,
/// };
///
/// struct Offline;
///
/// impl ConnectionCapabilities for Offline {
///     fn has_server_extension(&self, _: ServerExtension) -> bool { false }
///     fn current_username_length(&self) -> usize { 5 }
/// }
///
/// assert_eq!(active_limits(ProtocolVersion::R1_8, &Offline).max_message_length, 100);
/// assert_eq!(active_limits(ProtocolVersion::C0_28_TO_C0_30, &Offline).max_message_length, 57);
/// ```
pub fn active_limits(version: ProtocolVersion, caps: &dyn ConnectionCapabilities) -> ActiveLimits {
    let is_bedrock_family = version.is_bedrock();
    let classic = version.older_than_or_equal_to(ProtocolVersion::C0_28_TO_C0_30);
    let legacy_extension_active =
        classic && caps.has_server_extension(ServerExtension::LongerMessages);

    let max_message_length = if legacy_extension_active {
        LONG_MESSAGE_LENGTH
    } else if classic {
        // the server prefixes every line with the sender's name and ": "
        let prefix = i32::try_from(caps.current_username_length()).unwrap_or(i32::MAX);
        CLASSIC_CHAT_WIDTH.saturating_sub(prefix.saturating_add(2))
    } else if version == ProtocolVersion::BEDROCK_LATEST {
        512
    } else if version.older_than_or_equal_to(ProtocolVersion::R1_9_3) {
        100
    } else {
        256
    };

    ActiveLimits {
        max_message_length,
        legacy_extension_active,
        is_bedrock_family,
    }
}

/// Longest chat message the peer accepts for `version`.
pub fn chat_length(version: ProtocolVersion, caps: &dyn ConnectionCapabilities) -> i32 {
    active_limits(version, caps).max_message_length
}
