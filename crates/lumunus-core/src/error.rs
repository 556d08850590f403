//! Error types for Lumunus.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the Lumunus crates.
///
/// Only construction-time and I/O problems are errors. Ignored input, turn
/// violations and stale timer callbacks are reported through
/// [`crate::session::Outcome`] instead, because a presentation layer may race
/// against the engine harmlessly.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LumunusError {
    /// A canned response list was configured without entries.
    #[error("Response list '{list}' must contain at least one entry")]
    EmptyResponseList { list: String },

    /// Configuration error (thresholds, delays, missing sections)
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (configuration file access)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// The scheduler could not be created or used.
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LumunusError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates an EmptyResponseList error
    pub fn empty_response_list(list: impl Into<String>) -> Self {
        Self::EmptyResponseList { list: list.into() }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Scheduler error
    pub fn scheduler(message: impl Into<String>) -> Self {
        Self::Scheduler(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this error was caused by invalid configuration.
    ///
    /// Empty response lists count as configuration errors.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::EmptyResponseList { .. })
    }

    /// Check if this is an IO error
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Check if this is a serialization error
    pub fn is_serialization(&self) -> bool {
        matches!(self, Self::Serialization { .. })
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for LumunusError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<toml::de::Error> for LumunusError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for LumunusError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, LumunusError>`.
pub type Result<T> = std::result::Result<T, LumunusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_response_list_is_config_error() {
        let err = LumunusError::empty_response_list("turn.responses.ai");
        assert!(err.is_config());
        assert_eq!(
            err.to_string(),
            "Response list 'turn.responses.ai' must contain at least one entry"
        );
    }

    #[test]
    fn test_io_conversion_keeps_kind() {
        let err: LumunusError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert!(err.is_io());
        assert!(err.to_string().contains("NotFound"));
    }

    #[test]
    fn test_toml_conversion() {
        let err: LumunusError = toml::from_str::<toml::Table>("= broken").unwrap_err().into();
        assert!(err.is_serialization());
    }
}
