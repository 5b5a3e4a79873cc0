//! Typed communications exchanged between peers.
//!
//! A communication is the plaintext inside an envelope: a JSON object with a
//! `type` tag and type-dependent fields.
//!
//! # Types
//!
//! - [`Communication`]: a validated, tagged payload
//! - [`CommType`]: the closed set of known tags
//! - [`LocationInfo`]: a friend's location fix
//! - [`DropBoxId`]: where a granting peer publishes its updates

mod codec;
mod error;
pub mod types;

pub use codec::decode;
pub use error::{CommError, Result};
pub use types::{CommType, Communication, DropBoxId, LocationInfo, DROP_BOX_ID_LENGTH};
