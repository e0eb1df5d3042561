//! Canonical error and result types for the crate.
//!
//! Each component reports its own error enum. `ShimError` gathers them for
//! callers that drive several components at once.

use crate::{
    pipeline::PipelineError,
    settings::SettingsError,
    sync::SyncError,
    version::VersionError,
    wire::WireError,
};

/// Top-level error type exposed by `shimframe`.
#[derive(Debug)]
pub enum ShimError {
    /// A version name could not be resolved.
    Version(VersionError),
    /// A primitive value could not be decoded.
    Wire(WireError),
    /// The sync channel failed.
    Sync(SyncError),
    /// The adaptation pipeline failed.
    Pipeline(PipelineError),
    /// Settings could not be loaded.
    Settings(SettingsError),
}

impl From<VersionError> for ShimError {
    fn from(error: VersionError) -> Self { Self::Version(error) }
}

impl From<WireError> for ShimError {
    fn from(error: WireError) -> Self { Self::Wire(error) }
}

impl From<SyncError> for ShimError {
    fn from(error: SyncError) -> Self { Self::Sync(error) }
}

impl From<PipelineError> for ShimError {
    fn from(error: PipelineError) -> Self { Self::Pipeline(error) }
}

impl From<SettingsError> for ShimError {
    fn from(error: SettingsError) -> Self { Self::Settings(error) }
}

impl std::fmt::Display for ShimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Version(error) => write!(f, "version error: {error}"),
            Self::Wire(error) => write!(f, "wire error: {error}"),
            Self::Sync(error) => write!(f, "sync error: {error}"),
            Self::Pipeline(error) => write!(f, "pipeline error: {error}"),
            Self::Settings(error) => write!(f, "settings error: {error}"),
        }
    }
}

impl std::error::Error for ShimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Version(error) => Some(error),
            Self::Wire(error) => Some(error),
            Self::Sync(error) => Some(error),
            Self::Pipeline(error) => Some(error),
            Self::Settings(error) => Some(error),
        }
    }
}

/// Canonical result alias used by `shimframe` public APIs.
pub type Result<T> = std::result::Result<T, ShimError>;
