//! State transitions for decoded communications.
//!
//! | Communication           | Mutation                         | Event                   |
//! |-------------------------|----------------------------------|-------------------------|
//! | `SharingGrant`          | friend gets the drop box         | `SharingGranted`        |
//! | `SharingRevocation`     | friend's drop box cleared        | `SharingRevoked`        |
//! | `LocationInfo`          | friend location overwritten      | `FriendLocationUpdated` |
//! | `LocationUpdateRequest` | none (may trigger a broadcast)   | none                    |
//! | `SharingRequest`        | recorded only if configured      | `SharingRequested`      |
//! | anything else           | none                             | none                    |
//!
//! The mutation always happens before the event; when it fails no event is
//! published.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};

use super::events::{Event, EventBus};
use crate::comm::{Communication, DropBoxId, LocationInfo};
use crate::config::ProcessorConfig;
use crate::error::ProcessError;
use crate::identity::Identity;
use crate::session::{LocationBroadcaster, Session};
use crate::storage::IdentityStore;

/// Applies communications from authenticated senders to local state.
pub struct DispatchEngine {
    store: Arc<dyn IdentityStore>,
    session: Arc<dyn Session>,
    broadcaster: Arc<dyn LocationBroadcaster>,
    events: EventBus,
    update_cooldown: Duration,
    record_share_requests: bool,
    last_refresh: Mutex<Option<DateTime<Utc>>>,
}

impl DispatchEngine {
    /// Creates a dispatch engine.
    #[must_use]
    pub fn new(
        store: Arc<dyn IdentityStore>,
        session: Arc<dyn Session>,
        broadcaster: Arc<dyn LocationBroadcaster>,
        events: EventBus,
        config: &ProcessorConfig,
    ) -> Self {
        Self {
            store,
            session,
            broadcaster,
            events,
            update_cooldown: config.update_cooldown(),
            record_share_requests: config.record_share_requests,
            last_refresh: Mutex::new(None),
        }
    }

    /// Applies `communication` on behalf of `identity`.
    ///
    /// Callers must only pass communications that were authenticated as
    /// coming from `identity`.
    ///
    /// # Errors
    ///
    /// - `NotAFriend` for a location from an identity with no friend record
    /// - `InvalidCommunication` for a location with out-of-range coordinates
    /// - `DatabaseException` if the store fails
    pub fn apply(
        &self,
        identity: &Identity,
        communication: &Communication,
    ) -> Result<(), ProcessError> {
        debug!(
            "dispatching {} from {}",
            communication.type_tag(),
            identity.sender_id
        );

        match communication {
            Communication::SharingGrant { drop_box } => self.sharing_granted(identity, drop_box),
            Communication::SharingRevocation => self.sharing_revoked(identity),
            Communication::LocationInfo(location) => self.friend_location(identity, location),
            Communication::LocationUpdateRequest => {
                self.update_requested(Utc::now());
                Ok(())
            }
            Communication::SharingRequest => self.sharing_requested(identity),
            Communication::SharingRejection | Communication::Unhandled(_) => {
                debug!("no action for {}", communication.type_tag());
                Ok(())
            }
            Communication::Unrecognized(tag) => {
                debug!("ignoring unrecognized communication type {tag:?}");
                Ok(())
            }
        }
    }

    fn sharing_granted(&self, identity: &Identity, drop_box: &DropBoxId) -> Result<(), ProcessError> {
        self.store
            .record_sharing_granted(identity, drop_box)
            .map_err(|e| {
                warn!("error recording location grant from {}: {e}", identity.sender_id);
                ProcessError::DatabaseException
            })?;

        self.events.publish(Event::SharingGranted {
            identity_id: identity.local_id,
        });
        Ok(())
    }

    fn sharing_revoked(&self, identity: &Identity) -> Result<(), ProcessError> {
        self.store.record_sharing_revoked(identity).map_err(|e| {
            warn!("error recording revocation from {}: {e}", identity.sender_id);
            ProcessError::DatabaseException
        })?;

        self.events.publish(Event::SharingRevoked {
            identity_id: identity.local_id,
        });
        Ok(())
    }

    fn friend_location(
        &self,
        identity: &Identity,
        location: &LocationInfo,
    ) -> Result<(), ProcessError> {
        if !location.has_valid_coordinates() {
            info!(
                "rejecting out-of-range location ({}, {}) from {}",
                location.latitude, location.longitude, identity.sender_id
            );
            return Err(ProcessError::InvalidCommunication);
        }

        let friend = self
            .store
            .get_friend_by_identity(identity.local_id)
            .map_err(|e| {
                warn!("error loading friend for {}: {e}", identity.sender_id);
                ProcessError::DatabaseException
            })?
            .ok_or_else(|| {
                info!("location from {} who is not a friend", identity.sender_id);
                ProcessError::NotAFriend
            })?;

        self.store
            .upsert_friend_location(friend.friend_local_id, location)
            .map_err(|e| {
                warn!("error setting location info for friend {}: {e}", friend.friend_local_id);
                ProcessError::DatabaseException
            })?;

        self.events.publish(Event::FriendLocationUpdated {
            friend_id: friend.friend_local_id,
            location: *location,
        });
        Ok(())
    }

    fn sharing_requested(&self, identity: &Identity) -> Result<(), ProcessError> {
        if !self.record_share_requests {
            debug!("sharing request from {} left to caller", identity.sender_id);
            return Ok(());
        }

        self.store
            .record_incoming_share_request(identity.local_id, Utc::now().timestamp_millis())
            .map_err(|e| {
                warn!("error recording share request from {}: {e}", identity.sender_id);
                ProcessError::DatabaseException
            })?;

        self.events.publish(Event::SharingRequested {
            identity_id: identity.local_id,
        });
        Ok(())
    }

    /// Triggers a fresh location broadcast unless one happened within the
    /// cooldown. Returns whether a broadcast was requested.
    fn update_requested(&self, now: DateTime<Utc>) -> bool {
        let due = {
            let mut last_refresh = self
                .last_refresh
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let previous = (*last_refresh).max(self.session.last_location_update());
            let due = previous.map_or(true, |at| now - at > self.update_cooldown);
            if due {
                *last_refresh = Some(now);
            }
            if !due {
                debug!("already provided an update at {previous:?}; it is {now} now");
            }
            due
        };

        if due {
            info!("providing a location update");
            self.broadcaster.request_fresh_location();
        }
        due
    }
}
