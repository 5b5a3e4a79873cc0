//! Relationship records kept in the local store.

use crate::comm::{DropBoxId, LocationInfo};

/// Marks that location updates from an identity are expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FriendRelationship {
    /// Local row id of the friend record.
    pub friend_local_id: i64,
    /// Local row id of the friend's identity.
    pub identity_local_id: i64,
    /// Drop box the friend publishes into, while sharing is granted.
    pub receiving_box_id: Option<DropBoxId>,
}

impl FriendRelationship {
    /// Returns whether the friend currently shares their location with us.
    #[must_use]
    pub const fn is_sharing_granted(&self) -> bool {
        self.receiving_box_id.is_some()
    }
}

/// The latest known location of a friend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FriendLocation {
    /// Local row id of the friend record.
    pub friend_local_id: i64,
    /// The location fix as reported.
    pub location: LocationInfo,
}
