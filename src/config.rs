//! Cache configuration.
//!
//! Settings deserialize from a TOML file and `FRESCO_*` environment
//! variables, environment taking precedence.

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_ENABLED: bool = true;
const DEFAULT_LOG_OPERATIONS: bool = false;
const ENV_PREFIX: &str = "FRESCO";

/// Cache engine configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Master switch. When false, reads are uniform misses and writes are
    /// consumed but not stored.
    pub enabled: bool,
    /// Elevate per-operation diagnostics from `debug` to `info`.
    pub log_operations: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: DEFAULT_ENABLED,
            log_operations: DEFAULT_LOG_OPERATIONS,
        }
    }
}

impl CacheConfig {
    /// Load configuration, layering an optional TOML file under `FRESCO_*`
    /// environment overrides.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigLoadError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path));
        }
        let settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

/// Configuration could not be read or deserialized.
#[derive(Debug, Error)]
#[error("cache configuration error: {0}")]
pub struct ConfigLoadError(#[from] config::ConfigError);
