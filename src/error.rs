//! Custom error types for paperdigest.
//!
//! This module defines all error types used throughout the pipeline.
//! All functions return `Result<T, DigestError>` instead of using `unwrap()`.

use std::time::Duration;
use thiserror::Error;

/// Main error type for paperdigest operations.
///
/// Uses `thiserror` for ergonomic error handling and automatic `Display` implementation.
#[derive(Debug, Error)]
pub enum DigestError {
    /// Browser automation error (Chromium/CDP)
    #[error("Browser error: {0}")]
    Browser(String),

    /// A selector did not appear before the wait expired
    #[error("Timed out after {}s waiting for '{selector}'", .waited.as_secs())]
    Timeout {
        /// CSS selector that was awaited
        selector: String,
        /// How long we waited
        waited: Duration,
    },

    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// HTML or model output parsing error
    #[error("Parse error: {0}")]
    Parse(String),

    /// External API returned an error
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status code from API
        code: u16,
        /// Error message from API
        message: String,
    },

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Word document generation error
    #[error("Document error: {0}")]
    Document(String),
}

/// Result type alias using `DigestError`
pub type Result<T> = std::result::Result<T, DigestError>;

/// Extension trait for adding context to Option types
pub trait OptionExt<T> {
    /// Convert Option to Result with a parse error message
    fn ok_or_parse(self, msg: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_parse(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| DigestError::Parse(msg.to_string()))
    }
}
