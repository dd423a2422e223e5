//! Error types for reference resolution and the suite harness

use std::path::PathBuf;

use thiserror::Error;

/// Result type for harness operations
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Resolution and harness errors
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Invalid fixture base directory {path}: {reason}")]
    InvalidBaseDirectory { path: PathBuf, reason: String },

    #[error("Resource not found: {path}")]
    ResourceNotFound { path: PathBuf },

    #[error("Unknown reference: {uri}")]
    UnknownReference { uri: String },

    #[error("Duplicate registration: {uri} is already registered with different content")]
    DuplicateRegistration { uri: String },

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid URI '{uri}': {source}")]
    InvalidUri {
        uri: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Reference chain exceeded maximum depth {max_depth} at {uri}")]
    RecursionLimit { uri: String, max_depth: usize },

    #[error("Fragment '{pointer}' does not resolve inside {uri}")]
    PointerNotFound { uri: String, pointer: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Schema compilation failed: {0}")]
    Compile(String),

    #[error("Invalid filter pattern: {0}")]
    Filter(#[from] regex::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}
