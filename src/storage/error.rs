//! Error types for local persistence.

use thiserror::Error;

/// Error type for store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Database error from `SQLite`.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored row could not be interpreted.
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_display() {
        let err = StoreError::Storage("lock poisoned".to_string());
        assert_eq!(err.to_string(), "Storage error: lock poisoned");
    }

    #[test]
    fn invalid_data_error_display() {
        let err = StoreError::InvalidData("bad key length".to_string());
        assert_eq!(err.to_string(), "Invalid data: bad key length");
    }

    #[test]
    fn database_error_from_rusqlite() {
        let err: StoreError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, StoreError::Database(_)));
    }
}
