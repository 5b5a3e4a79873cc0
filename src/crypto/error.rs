//! Error types for envelope cryptography.

use thiserror::Error;

/// Errors that can occur while sealing or opening an envelope.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// A key or nonce has the wrong length.
    #[error("Invalid {what} length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Which input was wrong.
        what: &'static str,
        /// Required length in bytes.
        expected: usize,
        /// Length actually supplied.
        actual: usize,
    },

    /// Ciphertext is too short to hold a MAC and any payload.
    #[error("Ciphertext too short: {0} bytes")]
    CiphertextTooShort(usize),

    /// Authentication or decryption failed.
    #[error("Decryption failed")]
    Decryption,

    /// Encryption failed.
    #[error("Encryption failed")]
    Encryption,
}

/// Result type for cryptographic operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
