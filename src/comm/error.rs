//! Error types for communication decoding.

use thiserror::Error;

/// Errors that can occur while decoding or encoding a communication.
#[derive(Error, Debug)]
pub enum CommError {
    /// Payload is not a JSON communication object.
    #[error("Malformed communication: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A field required by the declared type is absent.
    #[error("Communication {comm_type} is missing field {field}")]
    MissingField {
        /// Declared type tag.
        comm_type: &'static str,
        /// Name of the missing field.
        field: &'static str,
    },

    /// A field is present but does not hold a usable value.
    #[error("Invalid field {field}: {reason}")]
    InvalidField {
        /// Name of the offending field.
        field: &'static str,
        /// What was wrong with it.
        reason: String,
    },
}

/// Result type alias for communication operations.
pub type Result<T> = std::result::Result<T, CommError>;
