//! Identity data types.
//!
//! A peer is addressed by a fixed-length [`SenderId`]. Once its public key is
//! known locally it becomes an [`Identity`], which is pinned forever: the first
//! public key observed for a sender id is the only one ever trusted.

use serde::Deserialize;

/// Length in bytes of every user/sender identifier.
pub const USER_ID_LENGTH: usize = 16;

/// Length in bytes of a Curve25519 public key.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Fixed-length identifier of a peer.
///
/// # Example
///
/// ```
/// use zood_core::identity::SenderId;
///
/// let id = SenderId::from_slice(&[0xab; 16]).unwrap();
/// assert_eq!(id.to_hex(), "ab".repeat(16));
/// assert!(SenderId::from_slice(&[0xab; 15]).is_none());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SenderId([u8; USER_ID_LENGTH]);

impl SenderId {
    /// Creates a sender id from raw bytes.
    ///
    /// Returns `None` unless `bytes` is exactly [`USER_ID_LENGTH`] long.
    #[must_use]
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Self)
    }

    /// Returns the raw identifier bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; USER_ID_LENGTH] {
        &self.0
    }

    /// Returns the identifier as lowercase hex, the form used by the directory.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<[u8; USER_ID_LENGTH]> for SenderId {
    fn from(bytes: [u8; USER_ID_LENGTH]) -> Self {
        Self(bytes)
    }
}

impl std::fmt::Debug for SenderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SenderId({})", self.to_hex())
    }
}

impl std::fmt::Display for SenderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// A locally known peer identity.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    /// Local database row id.
    pub local_id: i64,
    /// The peer's sender id.
    pub sender_id: SenderId,
    /// Username as reported by the directory on first contact.
    pub username: String,
    /// Pinned Curve25519 public key.
    pub public_key: [u8; PUBLIC_KEY_LENGTH],
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("local_id", &self.local_id)
            .field("sender_id", &self.sender_id)
            .field("username", &self.username)
            .field("public_key", &hex::encode(self.public_key))
            .finish()
    }
}

/// User record returned by the remote directory on a successful lookup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteUser {
    /// The user's public username.
    pub username: String,
    /// Hex-encoded public key.
    pub public_key: String,
}

impl RemoteUser {
    /// Decodes a directory response body.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not a JSON user record.
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Decodes the hex public key into a fixed-size key.
    ///
    /// Returns `None` if the key is not valid hex of the right length.
    #[must_use]
    pub fn public_key_bytes(&self) -> Option<[u8; PUBLIC_KEY_LENGTH]> {
        hex::decode(&self.public_key)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
    }
}
