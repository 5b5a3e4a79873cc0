//! Sender identity resolution with trust on first use.
//!
//! Known senders are answered from the local store. An unknown sender is
//! looked up once in the remote directory and persisted; from then on its
//! public key is pinned and never re-validated.
//!
//! # Concurrency
//!
//! First contact is serialized per sender id: concurrent resolutions of the
//! same unknown sender wait on a shared slot, and all but the first find the
//! identity in the store when they get the slot. Different senders never
//! contend. The store's insert-or-keep semantics back this up across
//! processes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, info, warn};
use subtle::ConstantTimeEq;

use super::directory::UserDirectory;
use super::types::{Identity, RemoteUser, SenderId};
use crate::error::ProcessError;
use crate::storage::IdentityStore;

/// How an identity was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Already present in the local store.
    Found(Identity),
    /// Fetched from the directory and persisted by this call.
    Created(Identity),
}

impl Resolution {
    /// Returns the resolved identity.
    #[must_use]
    pub const fn identity(&self) -> &Identity {
        match self {
            Self::Found(identity) | Self::Created(identity) => identity,
        }
    }

    /// Consumes the resolution and returns the identity.
    #[must_use]
    pub fn into_identity(self) -> Identity {
        match self {
            Self::Found(identity) | Self::Created(identity) => identity,
        }
    }

    /// Returns whether this call created the identity.
    #[must_use]
    pub const fn was_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Resolves sender ids to identities, bootstrapping unknown senders.
pub struct IdentityResolver {
    store: Arc<dyn IdentityStore>,
    directory: Arc<dyn UserDirectory>,
    in_flight: Mutex<HashMap<SenderId, Arc<Mutex<()>>>>,
}

impl IdentityResolver {
    /// Creates a resolver over the given store and directory.
    #[must_use]
    pub fn new(store: Arc<dyn IdentityStore>, directory: Arc<dyn UserDirectory>) -> Self {
        Self {
            store,
            directory,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Resolves `sender_id`, consulting the directory if it is unknown.
    ///
    /// # Errors
    ///
    /// - `NoNetwork` if the directory is unreachable
    /// - `UnknownSender` if the directory has no such user
    /// - `NotLoggedIn` if the directory rejects `access_token`
    /// - `RemoteInternal` if the directory failed internally
    /// - `Unknown` for any other directory failure or an undecodable response
    /// - `DatabaseException` if the store fails
    pub fn resolve(
        &self,
        sender_id: &SenderId,
        access_token: &str,
    ) -> Result<Resolution, ProcessError> {
        if let Some(identity) = self.lookup(sender_id)? {
            return Ok(Resolution::Found(identity));
        }

        let claim = self.acquire_slot(sender_id);
        let _guard = claim.slot.lock().unwrap_or_else(PoisonError::into_inner);
        self.resolve_first_contact(sender_id, access_token)
    }

    fn lookup(&self, sender_id: &SenderId) -> Result<Option<Identity>, ProcessError> {
        self.store.get_identity(sender_id).map_err(|e| {
            warn!("identity lookup for {sender_id} failed: {e}");
            ProcessError::DatabaseException
        })
    }

    fn resolve_first_contact(
        &self,
        sender_id: &SenderId,
        access_token: &str,
    ) -> Result<Resolution, ProcessError> {
        // Another caller may have finished first contact while we waited.
        if let Some(identity) = self.lookup(sender_id)? {
            return Ok(Resolution::Found(identity));
        }

        debug!("fetching unknown sender {sender_id} from directory");
        let body = self
            .directory
            .fetch_user(access_token, &sender_id.to_hex())
            .map_err(|e| {
                info!("directory lookup for {sender_id} failed: {e}");
                ProcessError::from(e)
            })?;

        let user = RemoteUser::from_json(&body).map_err(|e| {
            warn!("unable to decode directory user {sender_id}: {e}");
            ProcessError::Unknown
        })?;
        let public_key = user.public_key_bytes().ok_or_else(|| {
            warn!("directory returned a malformed public key for {sender_id}");
            ProcessError::Unknown
        })?;

        let identity = self
            .store
            .create_identity(sender_id, &user.username, &public_key)
            .map_err(|e| {
                warn!("failed to persist identity {sender_id}: {e}");
                ProcessError::DatabaseException
            })?;

        if !bool::from(identity.public_key.as_slice().ct_eq(public_key.as_slice())) {
            warn!("sender {sender_id} already pinned to a different key; keeping the pinned key");
        }

        info!("added user {} ({sender_id})", identity.username);
        Ok(Resolution::Created(identity))
    }

    fn acquire_slot(&self, sender_id: &SenderId) -> SlotClaim<'_> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        SlotClaim {
            resolver: self,
            sender_id: *sender_id,
            slot: Arc::clone(in_flight.entry(*sender_id).or_default()),
        }
    }

    fn release_slot(&self, sender_id: &SenderId, slot: &Arc<Mutex<()>>) {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Only the map and this caller hold the slot: nobody else is waiting.
        if Arc::strong_count(slot) == 2 {
            in_flight.remove(sender_id);
        }
    }

    #[cfg(test)]
    fn in_flight_len(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// A caller's share of a first-contact slot, released on drop even if the
/// directory call unwinds.
struct SlotClaim<'a> {
    resolver: &'a IdentityResolver,
    sender_id: SenderId,
    slot: Arc<Mutex<()>>,
}

impl Drop for SlotClaim<'_> {
    fn drop(&mut self) {
        self.resolver.release_slot(&self.sender_id, &self.slot);
    }
}
