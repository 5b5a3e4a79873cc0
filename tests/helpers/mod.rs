//! Reusable test doubles for pipeline integration tests.
//!
//! Storage and crypto are real: the store is an in-memory `SqliteStore` and
//! envelopes are sealed with real key pairs. Only the host capabilities
//! (directory, session, broadcaster) are replaced by counting fakes.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use zood_core::comm::{Communication, DropBoxId, LocationInfo};
use zood_core::crypto::{generate_key_pair, seal, KeyPair, Sealed};
use zood_core::identity::{Identity, LookupError, SenderId, UserDirectory};
use zood_core::session::{LocationBroadcaster, Session};
use zood_core::storage::{
    FriendRelationship, IdentityStore, Result as StoreResult, SqliteStore, StoreError,
};
use zood_core::{MessageProcessor, ProcessorConfig};

/// Store wrapper that counts calls and can be told to fail writes.
pub struct RecordingStore {
    pub inner: SqliteStore,
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
    pub fail_writes: AtomicBool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            inner: SqliteStore::in_memory().expect("in-memory store"),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn calls(&self) -> usize {
        self.reads.load(Ordering::SeqCst) + self.writes.load(Ordering::SeqCst)
    }

    fn read(&self) {
        self.reads.fetch_add(1, Ordering::SeqCst);
    }

    fn write(&self) -> StoreResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Storage("injected failure".to_string()));
        }
        Ok(())
    }
}

impl IdentityStore for RecordingStore {
    fn get_identity(&self, sender_id: &SenderId) -> StoreResult<Option<Identity>> {
        self.read();
        self.inner.get_identity(sender_id)
    }

    fn create_identity(
        &self,
        sender_id: &SenderId,
        username: &str,
        public_key: &[u8; 32],
    ) -> StoreResult<Identity> {
        self.write()?;
        self.inner.create_identity(sender_id, username, public_key)
    }

    fn record_sharing_granted(&self, identity: &Identity, drop_box: &DropBoxId) -> StoreResult<()> {
        self.write()?;
        self.inner.record_sharing_granted(identity, drop_box)
    }

    fn record_sharing_revoked(&self, identity: &Identity) -> StoreResult<()> {
        self.write()?;
        self.inner.record_sharing_revoked(identity)
    }

    fn get_friend_by_identity(&self, identity_id: i64) -> StoreResult<Option<FriendRelationship>> {
        self.read();
        self.inner.get_friend_by_identity(identity_id)
    }

    fn upsert_friend_location(&self, friend_id: i64, location: &LocationInfo) -> StoreResult<()> {
        self.write()?;
        self.inner.upsert_friend_location(friend_id, location)
    }

    fn record_incoming_share_request(&self, identity_id: i64, timestamp: i64) -> StoreResult<()> {
        self.write()?;
        self.inner.record_incoming_share_request(identity_id, timestamp)
    }
}

/// Directory backed by a map of registered peers.
#[derive(Default)]
pub struct FakeDirectory {
    users: Mutex<HashMap<String, Vec<u8>>>,
    failure: Mutex<Option<LookupError>>,
    delay: Mutex<Option<StdDuration>>,
    pub calls: AtomicUsize,
}

impl FakeDirectory {
    pub fn register(&self, peer: &Peer) {
        self.register_with_key(peer, &peer.key_pair.public_key);
    }

    pub fn register_with_key(&self, peer: &Peer, public_key: &[u8; 32]) {
        let body = format!(
            r#"{{"username":"{}","public_key":"{}"}}"#,
            peer.username,
            hex::encode(public_key)
        );
        self.users
            .lock()
            .unwrap()
            .insert(peer.sender_id.to_hex(), body.into_bytes());
    }

    pub fn fail_with(&self, error: LookupError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    pub fn slow_down(&self, delay: StdDuration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl UserDirectory for FakeDirectory {
    fn fetch_user(&self, _access_token: &str, hex_id: &str) -> Result<Vec<u8>, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        if let Some(error) = self.failure.lock().unwrap().clone() {
            return Err(error);
        }
        self.users
            .lock()
            .unwrap()
            .get(hex_id)
            .cloned()
            .ok_or(LookupError::NotFound)
    }
}

/// Mutable session for the local user.
pub struct FakeSession {
    pub logged_in: AtomicBool,
    pub access_token: Mutex<Option<String>>,
    pub key_pair: Mutex<Option<KeyPair>>,
    pub last_update: Mutex<Option<DateTime<Utc>>>,
}

impl FakeSession {
    pub fn logged_in_as(key_pair: KeyPair) -> Self {
        Self {
            logged_in: AtomicBool::new(true),
            access_token: Mutex::new(Some("access-token".to_string())),
            key_pair: Mutex::new(Some(key_pair)),
            last_update: Mutex::new(None),
        }
    }
}

impl Session for FakeSession {
    fn is_logged_in(&self) -> bool {
        self.logged_in.load(Ordering::SeqCst)
    }

    fn access_token(&self) -> Option<String> {
        self.access_token.lock().unwrap().clone()
    }

    fn key_pair(&self) -> Option<KeyPair> {
        self.key_pair.lock().unwrap().clone()
    }

    fn last_location_update(&self) -> Option<DateTime<Utc>> {
        *self.last_update.lock().unwrap()
    }
}

#[derive(Default)]
pub struct CountingBroadcaster {
    pub calls: AtomicUsize,
}

impl CountingBroadcaster {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LocationBroadcaster for CountingBroadcaster {
    fn request_fresh_location(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// A remote peer with its own key pair.
pub struct Peer {
    pub sender_id: SenderId,
    pub username: String,
    pub key_pair: KeyPair,
}

impl Peer {
    pub fn new(id: u8, username: &str) -> Self {
        Self {
            sender_id: SenderId::from([id; 16]),
            username: username.to_string(),
            key_pair: generate_key_pair(),
        }
    }

    /// Seals `communication` for `recipient`.
    pub fn envelope(&self, recipient: &KeyPair, communication: &Communication) -> Sealed {
        let plaintext = communication.to_json_bytes().expect("encode communication");
        self.seal_raw(recipient, &plaintext)
    }

    /// Seals arbitrary bytes for `recipient`.
    pub fn seal_raw(&self, recipient: &KeyPair, plaintext: &[u8]) -> Sealed {
        seal(plaintext, &recipient.public_key, &self.key_pair.secret_key).expect("seal")
    }
}

/// A processor wired to fakes, with handles to each of them.
pub struct Harness {
    pub processor: MessageProcessor,
    pub store: Arc<RecordingStore>,
    pub directory: Arc<FakeDirectory>,
    pub session: Arc<FakeSession>,
    pub broadcaster: Arc<CountingBroadcaster>,
    pub local: KeyPair,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(&ProcessorConfig::default())
    }

    pub fn with_config(config: &ProcessorConfig) -> Self {
        let local = generate_key_pair();
        let store = Arc::new(RecordingStore::new());
        let directory = Arc::new(FakeDirectory::default());
        let session = Arc::new(FakeSession::logged_in_as(local.clone()));
        let broadcaster = Arc::new(CountingBroadcaster::default());
        let processor = MessageProcessor::new(
            store.clone(),
            directory.clone(),
            session.clone(),
            broadcaster.clone(),
            config,
        )
        .expect("valid config");

        Self {
            processor,
            store,
            directory,
            session,
            broadcaster,
            local,
        }
    }

    /// Stores `peer` locally as if first contact had already happened.
    pub fn know(&self, peer: &Peer) -> Identity {
        self.store
            .inner
            .create_identity(&peer.sender_id, &peer.username, &peer.key_pair.public_key)
            .expect("create identity")
    }

    /// Processes a sealed envelope from `peer`.
    pub fn deliver(&self, peer: &Peer, sealed: &Sealed) -> Result<(), zood_core::ProcessError> {
        self.processor.process(
            peer.sender_id.as_bytes(),
            Some(sealed.ciphertext.as_slice()),
            Some(sealed.nonce.as_slice()),
        )
    }

    /// Seals and processes `communication` from `peer`.
    pub fn send(
        &self,
        peer: &Peer,
        communication: &Communication,
    ) -> Result<(), zood_core::ProcessError> {
        let sealed = peer.envelope(&self.local, communication);
        self.deliver(peer, &sealed)
    }
}
