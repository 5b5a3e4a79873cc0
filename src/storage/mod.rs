//! Local persistence for identities and friend relationships.
//!
//! The pipeline talks to storage only through the [`IdentityStore`] trait so
//! platforms can supply their own database. [`SqliteStore`] is the bundled
//! implementation.
//!
//! # Invariants
//!
//! - A sender id maps to at most one identity, and its public key never
//!   changes once written (trust on first use)
//! - Every write is a single atomic statement; sharing and location writes
//!   are overwrites, so replaying a message leaves the same state

mod error;
mod sqlite;
pub mod types;

pub use error::{Result, StoreError};
pub use sqlite::SqliteStore;
pub use types::{FriendLocation, FriendRelationship};

use crate::comm::{DropBoxId, LocationInfo};
use crate::identity::{Identity, SenderId};

/// Data-access interface used by the message pipeline.
///
/// Implementations must be `Send + Sync`; the pipeline calls them from
/// worker threads without additional locking.
pub trait IdentityStore: Send + Sync {
    /// Looks up a known identity by sender id.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    fn get_identity(&self, sender_id: &SenderId) -> Result<Option<Identity>>;

    /// Creates an identity, or returns the existing one for this sender id.
    ///
    /// If an identity already exists its stored username and public key are
    /// returned unchanged; the first writer wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn create_identity(
        &self,
        sender_id: &SenderId,
        username: &str,
        public_key: &[u8; 32],
    ) -> Result<Identity>;

    /// Records that `identity` granted us location sharing via `drop_box`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn record_sharing_granted(&self, identity: &Identity, drop_box: &DropBoxId) -> Result<()>;

    /// Records that `identity` revoked location sharing.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn record_sharing_revoked(&self, identity: &Identity) -> Result<()>;

    /// Returns the friend record for an identity, if one exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    fn get_friend_by_identity(&self, identity_id: i64) -> Result<Option<FriendRelationship>>;

    /// Overwrites the current location of a friend.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn upsert_friend_location(&self, friend_id: i64, location: &LocationInfo) -> Result<()>;

    /// Records an incoming request to share our location.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn record_incoming_share_request(&self, identity_id: i64, timestamp: i64) -> Result<()>;
}
