//! AES-256-GCM backend implementation.
//!
//! Seals a single value under a local symmetric key. The stored form is
//! `base64(nonce ++ ciphertext ++ tag)` with a fresh random 96-bit nonce per
//! call.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::trace;
use zeroize::Zeroizing;

use super::Cipher;
use crate::core::types::{EncryptedValue, PlaintextValue};
use crate::error::CipherError;

/// Size of the symmetric key in bytes (AES-256).
pub const KEY_SIZE: usize = 32;

/// Size of the AES-GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Associated data of the key check value.
const KEY_CHECK_AAD: &[u8] = b"cryptctl/v1/key-check";

/// A fixed-length symmetric key, wiped from memory on drop.
#[derive(Clone)]
pub struct SymmetricKey(Zeroizing<[u8; KEY_SIZE]>);

impl SymmetricKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Key check value: hex of the GCM tag over an empty message under the
    /// all-zero nonce.
    ///
    /// Equal keys give equal fingerprints; the key itself is not
    /// recoverable from it. The zero nonce is never used by [`seal`], whose
    /// nonces are random.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::EncryptionFailed` if the AEAD rejects the input.
    pub fn fingerprint(&self) -> Result<String, CipherError> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(self.as_bytes()));
        let tag = cipher
            .encrypt(
                Nonce::from_slice(&[0u8; NONCE_SIZE]),
                Payload {
                    msg: &[],
                    aad: KEY_CHECK_AAD,
                },
            )
            .map_err(|e| CipherError::EncryptionFailed(format!("key check failed: {}", e)))?;
        Ok(tag.iter().map(|b| format!("{:02x}", b)).collect())
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SymmetricKey([REDACTED])")
    }
}

/// Seal a plaintext value under `key`.
///
/// # Errors
///
/// Returns `CipherError::EncryptionFailed` if the AEAD rejects the input,
/// which only happens for plaintexts beyond the GCM length limit.
pub fn seal(plaintext: &str, key: &SymmetricKey) -> Result<EncryptedValue, CipherError> {
    trace!(plaintext_len = plaintext.len(), "sealing");

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext.as_bytes())
        .map_err(|e| CipherError::EncryptionFailed(format!("AES-GCM seal failed: {}", e)))?;

    let mut blob = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);

    let encoded = STANDARD.encode(blob);
    trace!(ciphertext_len = encoded.len(), "sealed");
    Ok(encoded)
}

/// Open a value produced by [`seal`].
///
/// # Errors
///
/// Returns `CipherError::Authentication` for anything that does not
/// authenticate under `key`: invalid base64, a blob shorter than nonce plus
/// tag, a tag mismatch (wrong key or tampering), or non-UTF-8 plaintext.
/// No partial output is ever returned.
pub fn open(blob: &str, key: &SymmetricKey) -> Result<PlaintextValue, CipherError> {
    trace!(ciphertext_len = blob.len(), "opening");

    let raw = STANDARD
        .decode(blob.trim())
        .map_err(|e| CipherError::Authentication(format!("invalid base64: {}", e)))?;

    if raw.len() < NONCE_SIZE + TAG_SIZE {
        return Err(CipherError::Authentication(format!(
            "ciphertext too short: {} bytes, need at least {}",
            raw.len(),
            NONCE_SIZE + TAG_SIZE
        )));
    }

    let (nonce, sealed) = raw.split_at(NONCE_SIZE);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));

    let plaintext = Zeroizing::new(
        cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| {
                CipherError::Authentication("message authentication failed".to_string())
            })?,
    );

    let value = std::str::from_utf8(&plaintext)
        .map_err(|e| CipherError::Authentication(format!("plaintext is not UTF-8: {}", e)))?
        .to_string();

    trace!(plaintext_len = value.len(), "opened");
    Ok(value)
}

/// Cipher bound to a local symmetric key.
#[derive(Debug, Clone)]
pub struct LocalCipher {
    key: SymmetricKey,
}

impl LocalCipher {
    pub fn new(key: SymmetricKey) -> Self {
        Self { key }
    }
}

impl Cipher for LocalCipher {
    fn name(&self) -> &'static str {
        "aes-256-gcm"
    }

    fn encrypt(&self, plaintext: &str) -> Result<EncryptedValue, CipherError> {
        seal(plaintext, &self.key)
    }

    fn decrypt(&self, encrypted: &str) -> Result<PlaintextValue, CipherError> {
        open(encrypted, &self.key)
    }

    fn binding(&self) -> Result<String, CipherError> {
        Ok(format!("aes-256-gcm:{}", self.key.fingerprint()?))
    }
}
