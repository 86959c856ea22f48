//! Cryptographic operations.
//!
//! Provides the encryption/decryption abstraction shared by every provider.
//!
//! ## Backends
//!
//! - **aes-256-gcm**: Always available. Local symmetric key derived from
//!   key material by a [`Kdf`].
//! - **AWS KMS**: Feature-gated (`aws`).
//! - **GCP KMS**: Feature-gated (`gcp`). Uses the gcloud CLI.
//!
//! ## Adding a New Backend
//!
//! 1. For a remote service, implement [`KmsClient`]; for a local scheme,
//!    implement [`Cipher`] directly
//! 2. Add the implementation in a new file
//! 3. Feature-gate if it pulls in an SDK
//! 4. Wire it into `Providers` in `core::provider`

use crate::core::types::{EncryptedValue, PlaintextValue};
use crate::error::CipherError;

mod aead;
mod kdf;
pub mod kms;

#[cfg(feature = "aws")]
pub mod aws;

#[cfg(feature = "gcp")]
pub mod gcp;

pub use aead::{open, seal, LocalCipher, SymmetricKey, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use kdf::Kdf;
pub use kms::{KmsCipher, KmsClient, KmsProvider};

#[cfg(test)]
pub(crate) use kdf::test_kdf;

/// Per-value encryption backend.
///
/// A cipher is bound to its key material when constructed, so callers only
/// ever hand it values.
pub trait Cipher: std::fmt::Debug + Send + Sync {
    /// Encrypt a single plaintext value.
    ///
    /// # Errors
    ///
    /// Returns `CipherError` if encryption fails.
    fn encrypt(&self, plaintext: &str) -> Result<EncryptedValue, CipherError>;

    /// Decrypt a single stored value.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::Authentication` if the value does not
    /// authenticate, or `CipherError::Remote` if a key service fails.
    fn decrypt(&self, encrypted: &str) -> Result<PlaintextValue, CipherError>;

    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Identity of the key this cipher is bound to.
    ///
    /// Two ciphers with the same binding open each other's output. Never
    /// contains key material.
    ///
    /// # Errors
    ///
    /// Returns `CipherError` if the identity cannot be computed.
    fn binding(&self) -> Result<String, CipherError>;
}
