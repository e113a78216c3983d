//! Error types for Parlance
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Parlance operations
///
/// This enum encompasses all possible errors that can occur during
/// session management, completion and moderation calls, cache operations,
/// and configuration loading.
#[derive(Error, Debug)]
pub enum ParlanceError {
    /// Configuration-related errors (bad config file, unknown filter keys,
    /// unknown template tags). These indicate programmer or operator misuse
    /// and are not recovered from.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Completion client errors (API calls, error payloads, transport)
    #[error("Completion client error: {0}")]
    Client(String),

    /// Moderation service errors. A transient failure of the classifier is
    /// a hard failure, never silently treated as "safe".
    #[error("Moderation error: {0}")]
    Moderation(String),

    /// Cache store errors (persistence, corrupt store)
    #[error("Cache error: {0}")]
    Cache(String),

    /// Unknown role string at a parsing boundary
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    /// Unknown summarization template tag
    #[error("Unknown summarization template tag: {0}")]
    UnknownTemplateTag(String),

    /// Durable-form errors (unsupported extension, malformed file data)
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Parlance operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
