//! Capabilities supplied by the host application.
//!
//! The processor never reads ambient global state: login status, key
//! material and the location trigger are injected through these traits.

use chrono::{DateTime, Utc};

use crate::crypto::KeyPair;

/// The local user's session.
pub trait Session: Send + Sync {
    /// Whether a user is logged in.
    fn is_logged_in(&self) -> bool;

    /// Access token for the remote directory, if any.
    fn access_token(&self) -> Option<String>;

    /// The local key pair, if one has been provisioned.
    fn key_pair(&self) -> Option<KeyPair>;

    /// When this device last published its own location.
    fn last_location_update(&self) -> Option<DateTime<Utc>>;
}

/// Starts acquisition and broadcast of a fresh device location.
///
/// Called without waiting for completion; implementations should hand the
/// work off and return promptly.
pub trait LocationBroadcaster: Send + Sync {
    /// Requests a fresh location fix to be published to friends.
    fn request_fresh_location(&self);
}
