//! Outcome codes for envelope processing.
//!
//! Every call to [`MessageProcessor::process`](crate::MessageProcessor::process)
//! ends in exactly one of these values (or `Ok(())`). No other error type
//! crosses the pipeline boundary.

use thiserror::Error;

use crate::comm::CommError;
use crate::crypto::CryptoError;
use crate::identity::LookupError;
use crate::storage::StoreError;

/// Closed set of envelope processing failures.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessError {
    /// No active session or no local key material.
    #[error("Not logged in")]
    NotLoggedIn,

    /// The directory could not be reached.
    #[error("No network connection")]
    NoNetwork,

    /// The directory does not know the sender.
    #[error("Unknown sender")]
    UnknownSender,

    /// The directory failed internally.
    #[error("Remote internal error")]
    RemoteInternal,

    /// Unclassified directory failure or undecodable directory response.
    #[error("Unknown error")]
    Unknown,

    /// The plaintext is not a valid communication.
    #[error("Invalid communication")]
    InvalidCommunication,

    /// Local persistence failed.
    #[error("Database exception")]
    DatabaseException,

    /// The sender id has the wrong length.
    #[error("Invalid sender id")]
    InvalidSenderId,

    /// The envelope carries no ciphertext.
    #[error("Missing ciphertext")]
    MissingCipherText,

    /// The envelope carries no nonce.
    #[error("Missing nonce")]
    MissingNonce,

    /// Location received from an identity that is not a friend.
    #[error("Sender is not a friend")]
    NotAFriend,

    /// Authentication or decryption of the ciphertext failed.
    #[error("Decryption failed")]
    DecryptionFailed,
}

impl ProcessError {
    /// Stable numeric code; `0` is reserved for success.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::NotLoggedIn => 1,
            Self::NoNetwork => 2,
            Self::UnknownSender => 3,
            Self::RemoteInternal => 4,
            Self::Unknown => 5,
            Self::InvalidCommunication => 6,
            Self::DatabaseException => 7,
            Self::InvalidSenderId => 8,
            Self::MissingCipherText => 9,
            Self::MissingNonce => 10,
            Self::NotAFriend => 11,
            Self::DecryptionFailed => 12,
        }
    }

    /// Returns the numeric code of a processing result.
    #[must_use]
    pub fn code_of(result: &Result<(), Self>) -> u8 {
        match result {
            Ok(()) => 0,
            Err(e) => e.code(),
        }
    }

    /// Whether redelivering the same envelope later may succeed.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::NoNetwork | Self::RemoteInternal)
    }

    /// Whether the caller handed us a structurally broken envelope.
    #[must_use]
    pub const fn is_caller_bug(self) -> bool {
        matches!(
            self,
            Self::InvalidSenderId | Self::MissingCipherText | Self::MissingNonce
        )
    }
}

impl From<StoreError> for ProcessError {
    fn from(_: StoreError) -> Self {
        Self::DatabaseException
    }
}

impl From<CryptoError> for ProcessError {
    fn from(_: CryptoError) -> Self {
        Self::DecryptionFailed
    }
}

impl From<CommError> for ProcessError {
    fn from(_: CommError) -> Self {
        Self::InvalidCommunication
    }
}

impl From<LookupError> for ProcessError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::Network(_) => Self::NoNetwork,
            LookupError::InvalidToken => Self::NotLoggedIn,
            LookupError::NotFound => Self::UnknownSender,
            LookupError::Internal => Self::RemoteInternal,
            LookupError::Other(_) => Self::Unknown,
        }
    }
}
