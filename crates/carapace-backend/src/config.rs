//! Configuration for the software backend.

use crate::{ConfigError, KeyLengths};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Software backend configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftConfig {
    /// Report FIPS-approved mode
    #[serde(default)]
    pub fips_mode: bool,
    /// Algorithm identifiers that fail to open with `NotFound`
    #[serde(default)]
    pub disabled_algorithms: Vec<String>,
    /// Artificial latency added to every provider open, in microseconds
    #[serde(default)]
    pub open_latency_us: u64,
    /// AES provider properties
    #[serde(default)]
    pub aes: AesConfig,
}

/// AES provider properties as reported to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AesConfig {
    /// Reported block length in bytes
    #[serde(default = "default_block_length")]
    pub block_length: u32,
    /// Reported key-length table (not validated, see [`SoftConfig::validate`])
    #[serde(default = "default_key_lengths")]
    pub key_lengths: KeyLengths,
}

// Default values

fn default_key_lengths() -> KeyLengths {
    KeyLengths {
        min: 128,
        max: 256,
        increment: 64,
    }
}

fn default_block_length() -> u32 {
    16
}

impl Default for AesConfig {
    fn default() -> Self {
        Self {
            block_length: default_block_length(),
            key_lengths: default_key_lengths(),
        }
    }
}

impl Default for SoftConfig {
    fn default() -> Self {
        Self {
            fips_mode: false,
            disabled_algorithms: Vec::new(),
            open_latency_us: 0,
            aes: AesConfig::default(),
        }
    }
}

impl SoftConfig {
    /// Parse configuration from a TOML document
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the document is malformed.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Serialize configuration as TOML
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Serialize`] if serialization fails.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check values the backend itself depends on.
    ///
    /// The reported key-length table is passed through untouched so that
    /// callers can observe malformed tables; only the block length and the
    /// open latency are checked here.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.aes.block_length == 0 || self.aes.block_length > 256 {
            return Err(ConfigError::Invalid(format!(
                "AES block length must be between 1 and 256 bytes, got {}",
                self.aes.block_length
            )));
        }

        // Latency is capped at one second
        if self.open_latency_us > 1_000_000 {
            return Err(ConfigError::Invalid(format!(
                "open latency must be at most 1000000us, got {}",
                self.open_latency_us
            )));
        }

        for id in &self.disabled_algorithms {
            if id.is_empty() {
                return Err(ConfigError::Invalid(
                    "disabled algorithm identifier must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Whether `algorithm` has been disabled.
    #[must_use]
    pub fn is_disabled(&self, algorithm: &str) -> bool {
        self.disabled_algorithms.iter().any(|id| id == algorithm)
    }
}
