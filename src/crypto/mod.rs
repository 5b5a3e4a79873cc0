//! Public-key authenticated encryption for envelopes.
//!
//! Envelopes are sealed with libsodium's `crypto_box` construction
//! (X25519 key agreement, XSalsa20-Poly1305). Opening is the only trust check
//! in the pipeline: a plaintext returned by [`open`] is known to come from the
//! holder of the sender's secret key.
//!
//! # Security
//!
//! - [`open`] is total: every malformed input maps to a [`CryptoError`]
//! - No partial plaintext is ever returned
//! - Secret key copies are held in `Zeroizing` buffers

mod error;

use crypto_box::aead::generic_array::GenericArray;
use crypto_box::aead::{Aead, AeadCore};
use crypto_box::{PublicKey, SalsaBox, SecretKey};
use rand::rngs::OsRng;
use zeroize::Zeroizing;

pub use error::{CryptoError, Result};

/// Length of a Curve25519 key in bytes.
pub const KEY_LENGTH: usize = 32;

/// Length of a `crypto_box` nonce in bytes.
pub const NONCE_LENGTH: usize = 24;

/// Length of the Poly1305 authentication tag in bytes.
pub const MAC_LENGTH: usize = 16;

/// A local Curve25519 key pair.
///
/// The secret half is zeroized on drop.
#[derive(Clone)]
pub struct KeyPair {
    /// Public key, shared with peers through the directory.
    pub public_key: [u8; KEY_LENGTH],
    /// Secret key, never leaves the device.
    pub secret_key: Zeroizing<[u8; KEY_LENGTH]>,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &hex::encode(self.public_key))
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

/// Output of [`seal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    /// Ciphertext including the authentication tag.
    pub ciphertext: Vec<u8>,
    /// Random nonce used for this message.
    pub nonce: [u8; NONCE_LENGTH],
}

/// Generates a fresh key pair from the operating system RNG.
#[must_use]
pub fn generate_key_pair() -> KeyPair {
    let secret = SecretKey::generate(&mut OsRng);
    KeyPair {
        public_key: *secret.public_key().as_bytes(),
        secret_key: Zeroizing::new(secret.to_bytes()),
    }
}

fn key_array(what: &'static str, key: &[u8]) -> Result<[u8; KEY_LENGTH]> {
    key.try_into().map_err(|_| CryptoError::InvalidLength {
        what,
        expected: KEY_LENGTH,
        actual: key.len(),
    })
}

fn salsa_box(public_key: &[u8], secret_key: &[u8; KEY_LENGTH]) -> Result<SalsaBox> {
    let public = PublicKey::from(key_array("public key", public_key)?);
    let secret = SecretKey::from(*secret_key);
    Ok(SalsaBox::new(&public, &secret))
}

/// Authenticates and decrypts a ciphertext from `sender_public_key`.
///
/// # Errors
///
/// Returns an error if the nonce or key has the wrong length, the ciphertext
/// cannot hold a MAC plus at least one byte, or authentication fails
/// (wrong key, wrong nonce, or tampered bytes).
///
/// # Example
///
/// ```
/// use zood_core::crypto::{generate_key_pair, open, seal};
///
/// let alice = generate_key_pair();
/// let bob = generate_key_pair();
///
/// let sealed = seal(b"hi bob", &bob.public_key, &alice.secret_key).unwrap();
/// let opened = open(&sealed.ciphertext, &sealed.nonce, &alice.public_key, &bob.secret_key);
/// assert_eq!(opened.unwrap(), b"hi bob");
/// ```
pub fn open(
    ciphertext: &[u8],
    nonce: &[u8],
    sender_public_key: &[u8],
    local_secret_key: &[u8; KEY_LENGTH],
) -> Result<Vec<u8>> {
    if nonce.len() != NONCE_LENGTH {
        return Err(CryptoError::InvalidLength {
            what: "nonce",
            expected: NONCE_LENGTH,
            actual: nonce.len(),
        });
    }
    if ciphertext.len() <= MAC_LENGTH {
        return Err(CryptoError::CiphertextTooShort(ciphertext.len()));
    }

    let salsa_box = salsa_box(sender_public_key, local_secret_key)?;
    salsa_box
        .decrypt(GenericArray::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::Decryption)
}

/// Encrypts `plaintext` for `recipient_public_key` with a fresh random nonce.
///
/// # Errors
///
/// Returns an error if the recipient key has the wrong length or encryption
/// fails.
pub fn seal(
    plaintext: &[u8],
    recipient_public_key: &[u8],
    local_secret_key: &[u8; KEY_LENGTH],
) -> Result<Sealed> {
    let salsa_box = salsa_box(recipient_public_key, local_secret_key)?;
    let nonce = SalsaBox::generate_nonce(&mut OsRng);
    let ciphertext = salsa_box
        .encrypt(&nonce, plaintext)
        .map_err(|_| CryptoError::Encryption)?;

    let mut nonce_bytes = [0u8; NONCE_LENGTH];
    nonce_bytes.copy_from_slice(&nonce);
    Ok(Sealed {
        ciphertext,
        nonce: nonce_bytes,
    })
}
