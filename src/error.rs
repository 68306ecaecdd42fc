//! Error types for the cache
//!
//! Provides unified error handling using thiserror. Lookups and removals of
//! absent keys are not errors; they surface as `None` or a no-op.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// A cache operation was issued from inside that cache's own delegate callback
    #[error("Reentrant call rejected: {0} was called while the cache was notifying its delegate")]
    Reentrant(&'static str),

    /// A configuration value could not be parsed
    #[error("Invalid configuration: {key}={value:?}")]
    InvalidConfig { key: String, value: String },
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reentrant_message_names_operation() {
        let err = CacheError::Reentrant("remove");
        assert!(err.to_string().contains("remove"));
    }

    #[test]
    fn test_invalid_config_message() {
        let err = CacheError::InvalidConfig {
            key: "CACHE_COST_LIMIT".to_string(),
            value: "lots".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("CACHE_COST_LIMIT"));
        assert!(msg.contains("\"lots\""));
    }
}
