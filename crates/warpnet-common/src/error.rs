//! Error types for configuration, credential and store operations.

use thiserror::Error;

/// Failure to decode a scanned credential payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// A required field is absent (under every accepted spelling).
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// The payload is not a well-formed JSON object.
    ///
    /// Carries the parser message for diagnostics.
    #[error("malformed credential payload: {0}")]
    MalformedPayload(String),
}

/// Configuration loading and validation error.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading or writing a settings file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing a TOML settings file.
    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    /// Error serializing settings to TOML.
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value violates a configuration invariant.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// Failure of the underlying key-value store.
///
/// Only `save` and `clear` surface these; `load` downgrades every failure to
/// "absent".
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode config: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("store backend error: {0}")]
    Backend(String),
}
