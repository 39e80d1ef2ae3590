//! Error types for TITS operations

use thiserror::Error;

/// Result type for TITS operations
pub type TitsResult<T> = Result<T, TitsError>;

/// Error types for TITS operations.
///
/// "No matching rows" is not an error: query operations return `Ok(None)` for it.
#[derive(Error, Debug)]
pub enum TitsError {
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Write notification failed: {0}")]
    Notification(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Time range error: {0}")]
    TimeRange(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

}

impl TitsError {
    /// Create a new store unavailable error
    pub fn store_unavailable<S: Into<String>>(message: S) -> Self {
        Self::StoreUnavailable(message.into())
    }

    /// Create a new notification error
    pub fn notification<S: Into<String>>(message: S) -> Self {
        Self::Notification(message.into())
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new parse error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }


    /// Check if the failure came from the transport to the store.
    ///
    /// Nothing in this crate retries; callers decide.
    pub fn is_retriable(&self) -> bool {
        matches!(self, TitsError::StoreUnavailable(_))
    }

    /// Get the error category for monitoring/metrics
    pub fn category(&self) -> &'static str {
        match self {
            TitsError::StoreUnavailable(_) => "store_unavailable",
            TitsError::Notification(_) => "notification",
            TitsError::Configuration(_) => "configuration",
            TitsError::Validation(_) => "validation",
            TitsError::TimeRange(_) => "time_range",
            TitsError::Parse(_) => "parse",
            TitsError::Json(_) => "json",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transport_errors_are_retriable() {
        assert!(TitsError::store_unavailable("connection refused").is_retriable());
        assert!(!TitsError::notification("observer failed").is_retriable());
        assert!(!TitsError::configuration("missing host").is_retriable());
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(TitsError::parse("bad body").category(), "parse");
        assert_eq!(
            TitsError::TimeRange("start after end".into()).category(),
            "time_range"
        );
        assert_eq!(
            TitsError::store_unavailable("x").to_string(),
            "Store unavailable: x"
        );
    }
}
