//! Error types for shoplist.

use thiserror::Error;

/// Errors produced by the shoplist core and its adapters.
#[derive(Debug, Error)]
pub enum ShopError {
    /// Local `SQLite` storage failure.
    #[error("Database error: {0}")]
    Database(String),

    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The remote store rejected or failed a call.
    #[error("Remote store error: {0}")]
    Remote(String),

    /// The remote store could not be reached.
    #[error("Remote store unreachable: {0}")]
    Unreachable(String),

    /// A list or item does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The requested operation is not supported.
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// An argument failed validation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A shared lock was poisoned by a panicking holder.
    #[error("Lock poisoned: {0}")]
    Poisoned(String),

    /// JSON (de)serialization failure.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ShopError {
    /// Whether the failure is a connectivity problem rather than a rejection.
    ///
    /// Connectivity failures leave a change in the queue without implying
    /// anything is wrong with the change itself.
    #[must_use]
    pub const fn is_connectivity(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}

impl From<rusqlite::Error> for ShopError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.to_string())
    }
}

impl From<reqwest::Error> for ShopError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            Self::Unreachable(e.to_string())
        } else {
            Self::Remote(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ShopError::NotFound("item 5".to_string());
        assert_eq!(err.to_string(), "Not found: item 5");

        let err = ShopError::Remote("HTTP 500".to_string());
        assert_eq!(err.to_string(), "Remote store error: HTTP 500");
    }

    #[test]
    fn test_is_connectivity() {
        assert!(ShopError::Unreachable("refused".to_string()).is_connectivity());
        assert!(!ShopError::Remote("HTTP 400".to_string()).is_connectivity());
    }
}
