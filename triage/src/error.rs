//! Error types for the triage core
//!
//! Input problems (empty or malformed customer text) are never errors: the
//! classifier falls back to the default classification. What remains is
//! configuration validation, which is fatal at startup, and bus plumbing.

use std::path::PathBuf;
use thiserror::Error;

use crate::events::EventBusError;
use crate::intent::Intent;

/// Result type alias for configuration loading and validation
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type alias for pipeline operations
pub type TriageResult<T> = Result<T, TriageError>;

/// Errors raised while loading or validating a [`crate::TriageConfig`]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file contents could not be parsed
    #[error("Failed to parse {format} config from {origin}: {message}")]
    Parse {
        format: &'static str,
        origin: String,
        message: String,
    },

    /// File extension is not one of toml/yaml/yml/json
    #[error("Unsupported config format '{extension}' (expected toml, yaml, yml or json)")]
    UnsupportedFormat { extension: String },

    /// An intent rule is malformed
    #[error("Invalid intent rule for {intent}: {message}")]
    InvalidIntentRule { intent: Intent, message: String },

    /// The same intent is declared by more than one rule
    #[error("Duplicate intent rule for {intent}")]
    DuplicateIntentRule { intent: Intent },

    /// An escalation rule is malformed
    #[error("Invalid escalation rule #{index} ({trigger}): {message}")]
    InvalidEscalationRule {
        index: usize,
        trigger: String,
        message: String,
    },

    /// A lexicon required by an enabled trigger is empty or has blank entries
    #[error("Invalid lexicon '{name}': {message}")]
    InvalidLexicon { name: &'static str, message: String },

    /// Topic names must be non-empty
    #[error("Invalid topic configuration: {message}")]
    InvalidTopic { message: String },

    /// A scalar setting is out of range
    #[error("Invalid setting '{field}': {message}")]
    InvalidSetting { field: &'static str, message: String },
}

/// Errors surfaced by the message pipeline
#[derive(Error, Debug)]
pub enum TriageError {
    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Event bus error
    #[error(transparent)]
    Bus(#[from] EventBusError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ConfigError::Parse {
            format: "toml",
            origin: "/etc/triage.toml".to_string(),
            message: "expected `=`".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to parse toml config from /etc/triage.toml: expected `=`"
        );
    }

    #[test]
    fn test_triage_error_is_transparent() {
        let err: TriageError = ConfigError::DuplicateIntentRule {
            intent: Intent::Complaint,
        }
        .into();
        assert_eq!(err.to_string(), "Duplicate intent rule for COMPLAINT");
    }
}
