//! Peer identities and how they are learned.
//!
//! # Architecture
//!
//! ```text
//! IdentityResolver
//!     ├── IdentityStore (local, always consulted first)
//!     └── UserDirectory (remote, only on first contact)
//! ```
//!
//! The resolver is the only part of the pipeline that performs network I/O.

mod directory;
mod resolver;
pub mod types;

pub use directory::{LookupError, UserDirectory};
pub use resolver::{IdentityResolver, Resolution};
pub use types::{Identity, RemoteUser, SenderId, PUBLIC_KEY_LENGTH, USER_ID_LENGTH};
