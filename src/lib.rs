//! Zood Core Library
//!
//! Receives encrypted envelopes from peers in a location-sharing network,
//! authenticates them against the sender's pinned public key and applies the
//! typed communication inside to local state.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use zood_core::identity::{LookupError, UserDirectory};
//! use zood_core::session::{LocationBroadcaster, Session};
//! use zood_core::storage::SqliteStore;
//! use zood_core::{MessageProcessor, ProcessError, ProcessorConfig};
//!
//! struct Offline;
//!
//! impl UserDirectory for Offline {
//!     fn fetch_user(&self, _: &str, _: &str) -> Result<Vec<u8>, LookupError> {
//!         Err(LookupError::Network("offline".to_string()))
//!     }
//! }
//!
//! struct LoggedOut;
//!
//! impl Session for LoggedOut {
//!     fn is_logged_in(&self) -> bool { false }
//!     fn access_token(&self) -> Option<String> { None }
//!     fn key_pair(&self) -> Option<zood_core::crypto::KeyPair> { None }
//!     fn last_location_update(&self) -> Option<chrono::DateTime<chrono::Utc>> { None }
//! }
//!
//! struct Noop;
//!
//! impl LocationBroadcaster for Noop {
//!     fn request_fresh_location(&self) {}
//! }
//!
//! let store = Arc::new(SqliteStore::new(std::path::Path::new(":memory:")).unwrap());
//! let processor = MessageProcessor::new(
//!     store,
//!     Arc::new(Offline),
//!     Arc::new(LoggedOut),
//!     Arc::new(Noop),
//!     &ProcessorConfig::default(),
//! )
//! .unwrap();
//!
//! let result = processor.process(&[0; 16], Some(&[0u8; 32][..]), Some(&[0u8; 24][..]));
//! assert_eq!(result, Err(ProcessError::NotLoggedIn));
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![deny(unsafe_code)]

pub mod comm;
pub mod config;
pub mod crypto;
pub mod dispatch;
mod error;
pub mod identity;
mod processor;
pub mod session;
pub mod storage;

pub use config::{ConfigError, ProcessorConfig};
pub use dispatch::{Event, EventBus, EventReceiver};
pub use error::ProcessError;
pub use processor::MessageProcessor;
