//! Runtime configuration.
//!
//! Loaded from TOML; every section and key is optional.
//!
//! ```toml
//! [cache]
//! enabled = true
//!
//! [promotion]
//! numeric_fast_path = true
//! builtin_rules = true
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Dispatch cache settings.
    pub cache: CacheConfig,

    /// Promotion settings.
    pub promotion: PromotionConfig,
}

impl Config {
    /// Parse configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

/// Dispatch cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Memoise resolutions per concrete argument tuple. When off, every
    /// call resolves through the index.
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Promotion settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromotionConfig {
    /// Widen `int`/`float` pairs without a rule lookup.
    pub numeric_fast_path: bool,

    /// Install the built-in numeric conversions and promotions.
    pub builtin_rules: bool,
}

impl Default for PromotionConfig {
    fn default() -> Self {
        Self {
            numeric_fast_path: true,
            builtin_rules: true,
        }
    }
}
