//! # Error Handling Module
//!
//! ## Purpose
//! Centralized error handling for the school match pipeline, providing
//! structured error types for configuration, remote-parser and engine
//! components.
//!
//! ## Input/Output Specification
//! - **Input**: Error conditions from the parser, remote collaborator,
//!   configuration and CLI layers
//! - **Output**: Structured error types with context
//! - **Error Categories**: Configuration, Parser, Remote, Geolocation, I/O
//!
//! ## Propagation Policy
//! Parsing and filtering never fail for data-shape reasons: malformed queries
//! parse to defaults and out-of-domain values are coerced or dropped. The
//! error types here cover the fallible edges of the system only — loading
//! configuration, calling the remote parser collaborator, reading record
//! files and resolving geolocation.

use thiserror::Error;

/// Result type used throughout the application
pub type Result<T> = std::result::Result<T, MatchError>;

/// Error types for the school match pipeline
#[derive(Debug, Error)]
pub enum MatchError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Remote parser returned an unusable response
    #[error("Remote parser error: {details}")]
    RemoteParser { details: String },

    /// Remote parser did not answer within the configured timeout
    #[error("Remote parser timed out after {timeout_ms}ms")]
    RemoteTimeout { timeout_ms: u64 },

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(serde_json::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(toml::de::Error),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(std::io::Error),

    /// Geolocation denied or unavailable (nearby filtering disabled)
    #[error("Geolocation unavailable: {reason}")]
    GeolocationUnavailable { reason: String },

    /// Validation errors
    #[error("Validation failed for field '{field}': {reason}")]
    Validation { field: String, reason: String },

    /// Internal system errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl MatchError {
    /// Check if the error is recoverable: the search feature keeps working by
    /// falling back to the local parser or dropping the nearby constraint.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MatchError::RemoteParser { .. }
                | MatchError::RemoteTimeout { .. }
                | MatchError::Http(_)
                | MatchError::GeolocationUnavailable { .. }
        )
    }

    /// Get error category for metrics and logging
    pub fn category(&self) -> &'static str {
        match self {
            MatchError::Config { .. } | MatchError::Toml(_) => "configuration",
            MatchError::RemoteParser { .. }
            | MatchError::RemoteTimeout { .. }
            | MatchError::Http(_) => "remote_parser",
            MatchError::GeolocationUnavailable { .. } => "geolocation",
            MatchError::Json(_) | MatchError::Io(_) => "io",
            MatchError::Validation { .. } | MatchError::Internal { .. } => "generic",
        }
    }
}

// Conversion from common error types
impl From<std::io::Error> for MatchError {
    fn from(err: std::io::Error) -> Self {
        MatchError::Io(err)
    }
}

impl From<serde_json::Error> for MatchError {
    fn from(err: serde_json::Error) -> Self {
        MatchError::Json(err)
    }
}

impl From<reqwest::Error> for MatchError {
    fn from(err: reqwest::Error) -> Self {
        MatchError::Http(err)
    }
}

impl From<toml::de::Error> for MatchError {
    fn from(err: toml::de::Error) -> Self {
        MatchError::Toml(err)
    }
}
