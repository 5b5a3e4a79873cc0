//! The envelope pipeline.
//!
//! ```text
//! envelope ──► validate ──► session ──► resolve sender ──► open ──► decode ──► dispatch
//! ```
//!
//! Each stage either passes its output on or ends processing with a
//! [`ProcessError`]. Nothing after a failed stage runs, so a failure never
//! leaves partial state behind other than an identity learned on first
//! contact.

use std::sync::Arc;

use log::{debug, info, warn};

use crate::comm;
use crate::config::{ConfigError, ProcessorConfig};
use crate::crypto;
use crate::dispatch::{DispatchEngine, EventBus, EventReceiver};
use crate::error::ProcessError;
use crate::identity::{IdentityResolver, SenderId, UserDirectory, USER_ID_LENGTH};
use crate::session::{LocationBroadcaster, Session};
use crate::storage::IdentityStore;

/// Unwraps and dispatches encrypted envelopes from peers.
///
/// `process` may be called from several threads at once.
pub struct MessageProcessor {
    session: Arc<dyn Session>,
    resolver: IdentityResolver,
    engine: DispatchEngine,
    events: EventBus,
}

impl MessageProcessor {
    /// Creates a processor over the host's store, directory and session.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is invalid.
    pub fn new(
        store: Arc<dyn IdentityStore>,
        directory: Arc<dyn UserDirectory>,
        session: Arc<dyn Session>,
        broadcaster: Arc<dyn LocationBroadcaster>,
        config: &ProcessorConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let events = EventBus::new(config.event_capacity);
        let resolver = IdentityResolver::new(Arc::clone(&store), directory);
        let engine = DispatchEngine::new(
            store,
            Arc::clone(&session),
            broadcaster,
            events.clone(),
            config,
        );

        Ok(Self {
            session,
            resolver,
            engine,
            events,
        })
    }

    /// Subscribes to state-change events raised by processed envelopes.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    /// Processes one envelope.
    ///
    /// Checks run in a fixed order and the first failure wins: the sender
    /// id length, then ciphertext and nonce presence, then the session. Only
    /// after that may the directory be contacted.
    ///
    /// # Errors
    ///
    /// Returns the [`ProcessError`] of the first stage that failed.
    pub fn process(
        &self,
        sender_id: &[u8],
        ciphertext: Option<&[u8]>,
        nonce: Option<&[u8]>,
    ) -> Result<(), ProcessError> {
        let sender_id = SenderId::from_slice(sender_id).ok_or_else(|| {
            info!(
                "rejecting envelope: sender id is {} bytes, expected {USER_ID_LENGTH}",
                sender_id.len()
            );
            ProcessError::InvalidSenderId
        })?;
        let ciphertext = ciphertext.ok_or(ProcessError::MissingCipherText)?;
        let nonce = nonce.ok_or(ProcessError::MissingNonce)?;

        if !self.session.is_logged_in() {
            debug!("dropping envelope from {sender_id}: not logged in");
            return Err(ProcessError::NotLoggedIn);
        }
        let access_token = self
            .session
            .access_token()
            .filter(|token| !token.is_empty())
            .ok_or(ProcessError::NotLoggedIn)?;
        let key_pair = self.session.key_pair().ok_or_else(|| {
            warn!("logged in without a key pair");
            ProcessError::NotLoggedIn
        })?;

        let identity = self
            .resolver
            .resolve(&sender_id, &access_token)?
            .into_identity();

        let plaintext = crypto::open(ciphertext, nonce, &identity.public_key, &key_pair.secret_key)
            .map_err(|e| {
                info!("unable to open envelope from {sender_id}: {e}");
                ProcessError::from(e)
            })?;

        let communication = comm::decode(&plaintext).map_err(|e| {
            info!("invalid communication from {sender_id}: {e}");
            ProcessError::from(e)
        })?;

        self.engine.apply(&identity, &communication)
    }
}

impl std::fmt::Debug for MessageProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageProcessor")
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}
