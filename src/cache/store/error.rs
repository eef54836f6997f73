//! Error types for backing store operations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage full: cannot persist element")]
    StorageFull,

    #[error("Metadata corrupted: {0}")]
    Corrupted(String),

    #[error("Backing store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid key pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_converts_into_store_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: StoreError = io_err.into();
        assert!(matches!(err, StoreError::Io(_)));
        assert!(err.to_string().contains("access denied"));
    }

    #[test]
    fn test_serde_error_converts_into_store_error() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{invalid json}").unwrap_err();
        let err: StoreError = serde_err.into();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[test]
    fn test_unavailable_display_includes_reason() {
        let err = StoreError::Unavailable("simulated outage".to_string());
        assert_eq!(err.to_string(), "Backing store unavailable: simulated outage");
    }
}
