// src/error.rs

//! Unified error handling for the seat watcher.

use std::fmt;

use thiserror::Error;

/// Result type alias for seat watcher operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed (network, timeout)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Storage backend failed
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// A blocking storage task panicked or was cancelled
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// A page could not be fetched
    #[error("Fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    /// A page was missing a structural anchor
    #[error("Parse error in {context}: {message}")]
    Parse { context: String, message: String },

    /// A notification could not be delivered
    #[error("Notify failed for {recipient}: {message}")]
    Notify { recipient: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a fetch error for a URL.
    pub fn fetch(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a parse error with context.
    pub fn parse(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Parse {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a notification error for a recipient.
    pub fn notify(recipient: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Notify {
            recipient: recipient.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_panicked_blocking_task_is_task_error() {
        let joined =
            tokio::task::spawn_blocking(|| -> Result<()> { panic!("worker died") }).await;
        let err = joined.map_err(AppError::from).and_then(|r| r).unwrap_err();
        assert!(matches!(err, AppError::Task(_)));
    }

    #[test]
    fn test_helper_constructors() {
        let err = AppError::fetch("https://catalog.test/", "HTTP 500");
        assert_eq!(err.to_string(), "Fetch failed for https://catalog.test/: HTTP 500");
        assert!(matches!(AppError::validation("x"), AppError::Validation(_)));
    }
}
