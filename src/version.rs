//! Protocol revisions and the negotiated target version.
//!
//! [`ProtocolVersion`] is a totally ordered identifier for a protocol revision.
//! Revisions are ordered first by [`VersionType`] and then by protocol number,
//! so every classic revision sorts before every release revision.
//!
//! [`VersionCell`] holds the process-wide negotiated version. It has a single
//! writer (the connection negotiation code) and any number of readers; values
//! are replaced whole, so readers never see a partial update.

use std::{cmp::Ordering, fmt, hash::Hash, str::FromStr};

use thiserror::Error;
use tokio::sync::watch;

/// Family a protocol revision belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VersionType {
    /// Pre-release classic era revisions.
    Classic,
    /// Release-era revisions of the primary protocol family.
    Release,
    /// Revisions of the secondary (bedrock) protocol family.
    Bedrock,
}

/// Identifier for a protocol revision.
///
/// Equality and ordering consider only the version type and protocol number.
#[derive(Clone, Copy, Debug)]
pub struct ProtocolVersion {
    version_type: VersionType,
    protocol: i32,
    name: &'static str,
}

impl ProtocolVersion {
    /// Classic c0.28 through c0.30, the earliest revision with chat framing
    /// limits.
    pub const C0_28_TO_C0_30: Self = Self::new(VersionType::Classic, 7, "c0.28-c0.30");
    /// Release 1.8.x.
    pub const R1_8: Self = Self::new(VersionType::Release, 47, "1.8.x");
    /// Release 1.9.3 and 1.9.4.
    pub const R1_9_3: Self = Self::new(VersionType::Release, 110, "1.9.3");
    /// Release 1.10.x.
    pub const R1_10: Self = Self::new(VersionType::Release, 210, "1.10.x");
    /// Release 1.11.
    pub const R1_11: Self = Self::new(VersionType::Release, 315, "1.11");
    /// Release 1.12.2.
    pub const R1_12_2: Self = Self::new(VersionType::Release, 340, "1.12.2");
    /// Release 1.17.
    pub const R1_17: Self = Self::new(VersionType::Release, 755, "1.17");
    /// Release 1.20.5, the host's native revision.
    pub const R1_20_5: Self = Self::new(VersionType::Release, 766, "1.20.5");
    /// Newest supported bedrock revision.
    pub const BEDROCK_LATEST: Self = Self::new(VersionType::Bedrock, 671, "bedrock-latest");

    /// Every revision this crate knows by name, oldest first.
    pub const KNOWN: &'static [Self] = &[
        Self::C0_28_TO_C0_30,
        Self::R1_8,
        Self::R1_9_3,
        Self::R1_10,
        Self::R1_11,
        Self::R1_12_2,
        Self::R1_17,
        Self::R1_20_5,
        Self::BEDROCK_LATEST,
    ];

    /// Create a version identifier.
    #[must_use]
    pub const fn new(version_type: VersionType, protocol: i32, name: &'static str) -> Self {
        Self {
            version_type,
            protocol,
            name,
        }
    }

    /// Family of this revision.
    #[must_use]
    pub const fn version_type(&self) -> VersionType { self.version_type }

    /// Protocol number within the family.
    #[must_use]
    pub const fn protocol(&self) -> i32 { self.protocol }

    /// Human-readable name.
    #[must_use]
    pub const fn name(&self) -> &'static str { self.name }

    /// Whether this revision belongs to the bedrock family.
    #[must_use]
    pub fn is_bedrock(&self) -> bool { self.version_type == VersionType::Bedrock }

    /// `self <= other`.
    #[must_use]
    pub fn older_than_or_equal_to(&self, other: Self) -> bool { *self <= other }

    /// `self < other`.
    #[must_use]
    pub fn older_than(&self, other: Self) -> bool { *self < other }

    /// `self >= other`.
    #[must_use]
    pub fn newer_than_or_equal_to(&self, other: Self) -> bool { *self >= other }

    /// `self > other`.
    #[must_use]
    pub fn newer_than(&self, other: Self) -> bool { *self > other }

    fn key(&self) -> (VersionType, i32) { (self.version_type, self.protocol) }
}

impl PartialEq for ProtocolVersion {
    fn eq(&self, other: &Self) -> bool { self.key() == other.key() }
}

impl Eq for ProtocolVersion {}

impl Hash for ProtocolVersion {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) { self.key().hash(state); }
}

impl PartialOrd for ProtocolVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for ProtocolVersion {
    fn cmp(&self, other: &Self) -> Ordering { self.key().cmp(&other.key()) }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name) }
}

/// Errors produced when naming a protocol version.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum VersionError {
    /// No known revision carries this name.
    #[error("unknown protocol version: {0}")]
    Unknown(String),
}

impl FromStr for ProtocolVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::KNOWN
            .iter()
            .find(|version| version.name.eq_ignore_ascii_case(wanted))
            .copied()
            .ok_or_else(|| VersionError::Unknown(wanted.to_owned()))
    }
}

/// Holder for the current negotiated version.
///
/// Created once at startup. Writers replace the whole value; readers either
/// sample it with [`VersionCell::get`] or watch it through a subscription.
#[derive(Debug)]
pub struct VersionCell {
    tx: watch::Sender<ProtocolVersion>,
}

impl VersionCell {
    /// Create a cell holding `initial`.
    #[must_use]
    pub fn new(initial: ProtocolVersion) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Current negotiated version.
    #[must_use]
    pub fn get(&self) -> ProtocolVersion { *self.tx.borrow() }

    /// Replace the negotiated version, returning the previous one.
    pub fn replace(&self, version: ProtocolVersion) -> ProtocolVersion {
        self.tx.send_replace(version)
    }

    /// Subscribe to version changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ProtocolVersion> { self.tx.subscribe() }
}

impl Default for VersionCell {
    fn default() -> Self { Self::new(ProtocolVersion::R1_20_5) }
}
