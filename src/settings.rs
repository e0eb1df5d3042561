//! User-tunable settings.
//!
//! Settings load from a TOML document in which every key is optional:
//!
//! ```toml
//! replace_default_port = true
//! custom_payload_id = 0x19
//! compression_level = 6
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{pipeline::DEFAULT_COMPRESSION_LEVEL, sync::DEFAULT_CUSTOM_PAYLOAD_ID};

/// Errors raised while loading [`Settings`].
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid settings TOML.
    #[error("invalid settings: {0}")]
    Parse(#[from] toml::de::Error),

    /// The zlib level is outside `0..=9`.
    #[error("compression level {0} is outside 0..=9")]
    CompressionLevel(u32),
}

/// Settings consulted by the adaptation core.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Append the Bedrock default port to bare Bedrock addresses.
    pub replace_default_port: bool,
    /// Packet id of the clientbound custom payload packet.
    pub custom_payload_id: i32,
    /// zlib level for outbound compression.
    pub compression_level: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            replace_default_port: true,
            custom_payload_id: DEFAULT_CUSTOM_PAYLOAD_ID,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl Settings {
    /// Parse settings from a TOML document.
    ///
    /// # Errors
    ///
    /// Fails on malformed TOML, unknown keys, or an out-of-range level.
    pub fn from_toml_str(document: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(document)?;
        settings.validate()
    }

    /// Read and parse the settings file at `path`.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or [`from_toml_str`](Self::from_toml_str)
    /// rejects it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let document = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("loading settings from {}", path.display());
        Self::from_toml_str(&document)
    }

    fn validate(self) -> Result<Self, SettingsError> {
        if self.compression_level > 9 {
            return Err(SettingsError::CompressionLevel(self.compression_level));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let settings = Settings::from_toml_str("").expect("parse");
        assert_eq!(settings, Settings::default());
        assert!(settings.replace_default_port);
        assert_eq!(settings.custom_payload_id, 0x19);
    }

    #[test]
    fn keys_override_defaults() {
        let settings = Settings::from_toml_str(
            "replace_default_port = false\ncustom_payload_id = 0x18\ncompression_level = 1\n",
        )
        .expect("parse");
        assert!(!settings.replace_default_port);
        assert_eq!(settings.custom_payload_id, 0x18);
        assert_eq!(settings.compression_level, 1);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Settings::from_toml_str("replace_port = true").expect_err("unknown key");
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn level_is_bounded() {
        let err = Settings::from_toml_str("compression_level = 12").expect_err("bad level");
        assert!(matches!(err, SettingsError::CompressionLevel(12)));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Settings::load("/nonexistent/shimframe.toml").expect_err("missing file");
        assert!(err.to_string().contains("/nonexistent/shimframe.toml"));
    }
}
