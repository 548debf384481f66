//! Application configuration.
//!
//! ```rust
//! use tether_core::Config;
//!
//! let config = Config::from_toml_str("max_body_size = 4096").unwrap();
//! assert_eq!(config.max_body_size, 4096);
//!
//! let config = Config::new().max_body_size_kb(64);
//! assert_eq!(config.max_body_size, 65536);
//! ```

use crate::Error;
use serde::Deserialize;

pub const KB: usize = 1024;
pub const MB: usize = 1024 * KB;

/// Default request body limit: 1 MB.
pub const DEFAULT_MAX_BODY_SIZE: usize = MB;

pub const MAX_BODY_SIZE_ENV: &str = "TETHER_MAX_BODY_SIZE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Largest accepted request body in bytes.
    pub max_body_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = bytes;
        self
    }

    pub fn max_body_size_kb(mut self, kb: usize) -> Self {
        self.max_body_size = kb.saturating_mul(KB);
        self
    }

    pub fn max_body_size_mb(mut self, mb: usize) -> Self {
        self.max_body_size = mb.saturating_mul(MB);
        self
    }

    /// Defaults overridden by `TETHER_MAX_BODY_SIZE`.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let mut config = Self::default();
        if let Some(raw) = lookup(MAX_BODY_SIZE_ENV) {
            config.max_body_size = raw.trim().parse().map_err(|e| {
                Error::Config(format!("{} must be a byte count, got `{}`: {}", MAX_BODY_SIZE_ENV, raw, e))
            })?;
        }
        Ok(config)
    }

    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, Error> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }
}
