//! # Configuration Management Module
//!
//! ## Purpose
//! Centralized configuration for the match pipeline: parser limits, remote
//! LLM parser settings, filter defaults and logging. Supports TOML files with
//! environment-variable overrides and validation.
//!
//! ## Configuration Sources (in order of precedence)
//! 1. Environment variables
//! 2. Configuration file
//! 3. Default values
//!
//! ## Usage
//! ```rust,no_run
//! use school_match_search::Config;
//!
//! let config = Config::from_file("config.toml").unwrap();
//! println!("Query cap: {}", config.parser.max_query_length);
//! ```

use crate::errors::{MatchError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure containing all system settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Query parsing settings
    pub parser: ParserConfig,
    /// Filter engine defaults
    pub filter: FilterConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

/// Query parsing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Maximum query length in characters; longer input is truncated by the
    /// calling layer before parsing
    pub max_query_length: usize,
    /// Remote LLM parser collaborator
    pub remote: RemoteParserConfig,
}

/// Remote parser collaborator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteParserConfig {
    /// Whether to try the remote parser before the local one
    pub enabled: bool,
    /// Endpoint returning a `ParsedFilter`-shaped JSON object
    pub api_url: String,
    /// Bearer token (optional)
    pub api_key: Option<String>,
    /// Single timeout-based abort for the remote call
    pub timeout_ms: u64,
}

/// Filter engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Default nearby radius in kilometers
    pub default_radius_km: f64,
    /// Maximum number of results returned by the CLI
    pub max_results: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Enable structured JSON logging
    pub json_format: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            parser: ParserConfig::default(),
            filter: FilterConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_query_length: 1500,
            remote: RemoteParserConfig::default(),
        }
    }
}

impl Default for RemoteParserConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: String::new(),
            api_key: None,
            timeout_ms: 4000,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            default_radius_km: 5.0,
            max_results: 50,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Config {
    /// Load configuration from a specific file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!("Configuration file not found: {:?}, using defaults", path);
            let mut config = Self::default();
            config.apply_env_overrides()?;
            config.validate()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path).map_err(|e| MatchError::Config {
            message: format!("Failed to read config file {:?}: {}", path, e),
        })?;

        let mut config: Config = toml::from_str(&content).map_err(|e| MatchError::Config {
            message: format!("Failed to parse config file {:?}: {}", path, e),
        })?;

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("SCHOOL_SEARCH_REMOTE_URL") {
            self.parser.remote.api_url = url;
            self.parser.remote.enabled = true;
        }
        if let Ok(api_key) = std::env::var("SCHOOL_SEARCH_REMOTE_API_KEY") {
            self.parser.remote.api_key = Some(api_key);
        }
        if let Ok(timeout) = std::env::var("SCHOOL_SEARCH_REMOTE_TIMEOUT_MS") {
            self.parser.remote.timeout_ms =
                timeout.parse().map_err(|_| MatchError::Config {
                    message: "Invalid SCHOOL_SEARCH_REMOTE_TIMEOUT_MS".to_string(),
                })?;
        }
        if let Ok(level) = std::env::var("SCHOOL_SEARCH_LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.parser.max_query_length == 0 {
            return Err(MatchError::Validation {
                field: "parser.max_query_length".to_string(),
                reason: "Query length cap cannot be zero".to_string(),
            });
        }

        if self.parser.remote.enabled && self.parser.remote.api_url.is_empty() {
            return Err(MatchError::Validation {
                field: "parser.remote.api_url".to_string(),
                reason: "Remote parser is enabled but no URL is configured".to_string(),
            });
        }

        if self.parser.remote.timeout_ms == 0 {
            return Err(MatchError::Validation {
                field: "parser.remote.timeout_ms".to_string(),
                reason: "Remote timeout must be greater than zero".to_string(),
            });
        }

        if !self.filter.default_radius_km.is_finite() || self.filter.default_radius_km <= 0.0 {
            return Err(MatchError::Validation {
                field: "filter.default_radius_km".to_string(),
                reason: "Nearby radius must be a positive number".to_string(),
            });
        }

        Ok(())
    }

    /// Get configuration as TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| MatchError::Config {
            message: format!("Failed to serialize config to TOML: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.parser.max_query_length, 1500);
        assert!(!config.parser.remote.enabled);
    }

    #[test]
    fn file_round_trip() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(toml.as_bytes()).unwrap();

        let loaded = Config::from_file(file.path()).unwrap();
        assert_eq!(loaded.parser.max_query_length, config.parser.max_query_length);
        assert_eq!(loaded.filter.max_results, config.filter.max_results);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[filter]\nmax_results = 10\n").unwrap();

        let loaded = Config::from_file(file.path()).unwrap();
        assert_eq!(loaded.filter.max_results, 10);
        assert_eq!(loaded.parser.max_query_length, 1500);
    }

    #[test]
    fn remote_enabled_without_url_is_rejected() {
        let mut config = Config::default();
        config.parser.remote.enabled = true;
        assert!(config.validate().is_err());
    }
}
