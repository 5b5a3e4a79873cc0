//! Remote user directory abstraction.
//!
//! The directory is the server that maps a user id to its username and public
//! key. It is only consulted the first time a sender is seen.

use thiserror::Error;

/// Failure modes of a directory lookup.
///
/// Connectivity failures are kept apart from errors the server reported, so
/// the pipeline can tell a transient outage from a definitive answer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The request never reached the server.
    #[error("Network unavailable: {0}")]
    Network(String),

    /// The server rejected our access token.
    #[error("Invalid or expired access token")]
    InvalidToken,

    /// The server has no user with this id.
    #[error("User not found")]
    NotFound,

    /// The server failed internally.
    #[error("Directory internal error")]
    Internal,

    /// Any other non-success response.
    #[error("Directory error: {0}")]
    Other(String),
}

/// Client for the remote user directory.
///
/// Implementations are provided by the platform layer and may block.
pub trait UserDirectory: Send + Sync {
    /// Fetches the user record for `hex_id`.
    ///
    /// On success returns the raw response body, a JSON object with
    /// `username` and hex `public_key` fields.
    ///
    /// # Errors
    ///
    /// Returns a [`LookupError`] describing why no user record was obtained.
    fn fetch_user(&self, access_token: &str, hex_id: &str) -> Result<Vec<u8>, LookupError>;
}
