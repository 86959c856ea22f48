//! Remote key-management services.
//!
//! With a remote key no symmetric key ever exists in process memory: each
//! value is sent to the service together with a key handle. Returned blobs
//! are stored base64-encoded.
//!
//! - `aws`: AWS KMS (feature `aws`)
//! - `gcp`: GCP Cloud KMS via the gcloud CLI (feature `gcp`)
//! - [`StubKms`]: reversible fake for tests (feature `test-kms`)

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::trace;

use super::Cipher;
use crate::core::types::{EncryptedValue, KeyHandle, PlaintextValue};
use crate::error::CipherError;

/// Supported remote KMS services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum KmsProvider {
    Aws,
    Gcp,
}

impl KmsProvider {
    /// Detect the service from a key handle.
    ///
    /// - `arn:aws:kms:...`, `alias/...` or a bare key id → AWS
    /// - `projects/.../cryptoKeys/...` → GCP
    pub fn detect(key: &str) -> Option<Self> {
        if key.starts_with("arn:aws:kms:") || key.starts_with("alias/") {
            return Some(Self::Aws);
        }
        if key.starts_with("projects/") && key.contains("/cryptoKeys/") {
            return Some(Self::Gcp);
        }
        let is_key_id = key.len() == 36
            && key
                .chars()
                .all(|c| c.is_ascii_hexdigit() || c == '-');
        if is_key_id {
            return Some(Self::Aws);
        }
        None
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::Gcp => "gcp",
        }
    }
}

/// Remote encrypt/decrypt operations keyed by a handle.
///
/// Implementations carry their own credentials; they are constructed once
/// and injected, never discovered per call.
pub trait KmsClient: std::fmt::Debug + Send + Sync {
    fn encrypt(&self, key: &str, plaintext: &[u8]) -> Result<Vec<u8>, CipherError>;
    fn decrypt(&self, key: &str, ciphertext: &[u8]) -> Result<Vec<u8>, CipherError>;
    fn name(&self) -> &'static str;
}

/// Cipher delegating every value to a remote service.
#[derive(Debug, Clone)]
pub struct KmsCipher {
    client: Arc<dyn KmsClient>,
    key: KeyHandle,
}

impl KmsCipher {
    pub fn new(client: Arc<dyn KmsClient>, key: KeyHandle) -> Self {
        Self { client, key }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Cipher for KmsCipher {
    fn name(&self) -> &'static str {
        self.client.name()
    }

    fn encrypt(&self, plaintext: &str) -> Result<EncryptedValue, CipherError> {
        trace!(key = %self.key, plaintext_len = plaintext.len(), "remote encrypt");
        let blob = self.client.encrypt(&self.key, plaintext.as_bytes())?;
        Ok(STANDARD.encode(blob))
    }

    fn decrypt(&self, encrypted: &str) -> Result<PlaintextValue, CipherError> {
        trace!(key = %self.key, ciphertext_len = encrypted.len(), "remote decrypt");
        let blob = STANDARD
            .decode(encrypted.trim())
            .map_err(|e| CipherError::Authentication(format!("invalid base64: {}", e)))?;
        let plaintext = self.client.decrypt(&self.key, &blob)?;
        String::from_utf8(plaintext)
            .map_err(|e| CipherError::Authentication(format!("plaintext is not UTF-8: {}", e)))
    }

    fn binding(&self) -> Result<String, CipherError> {
        Ok(format!("{}:{}", self.client.name(), self.key))
    }
}

/// Stub KMS for testing.
///
/// "Encrypts" by hex-encoding behind a prefix that names the key, so a blob
/// only decrypts under the key that produced it. NOT cryptographically
/// secure; it exercises the remote plumbing without a cloud account.
#[cfg(any(test, feature = "test-kms"))]
#[derive(Debug, Default)]
pub struct StubKms {
    reject: Option<String>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "test-kms"))]
impl StubKms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail any call whose plaintext equals `value`.
    pub fn rejecting(value: impl Into<String>) -> Self {
        Self {
            reject: Some(value.into()),
            ..Self::default()
        }
    }

    /// Number of encrypt and decrypt calls served.
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn check(&self, plaintext: &[u8]) -> Result<(), CipherError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.reject.as_deref().map(str::as_bytes) == Some(plaintext) {
            return Err(CipherError::Remote {
                service: "stub-kms",
                message: "rejected by stub".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(any(test, feature = "test-kms"))]
impl KmsClient for StubKms {
    fn encrypt(&self, key: &str, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        self.check(plaintext)?;
        let hex: String = plaintext.iter().map(|b| format!("{:02x}", b)).collect();
        Ok(format!("stub-kms:{}:{}", key, hex).into_bytes())
    }

    fn decrypt(&self, key: &str, ciphertext: &[u8]) -> Result<Vec<u8>, CipherError> {
        let remote = |message: &str| CipherError::Remote {
            service: "stub-kms",
            message: message.to_string(),
        };

        let text = std::str::from_utf8(ciphertext).map_err(|_| remote("not a stub blob"))?;
        let rest = text
            .strip_prefix("stub-kms:")
            .ok_or_else(|| remote("not a stub blob"))?;
        let (blob_key, hex) = rest
            .rsplit_once(':')
            .ok_or_else(|| remote("not a stub blob"))?;
        if blob_key != key {
            return Err(remote("blob was encrypted under another key"));
        }
        if hex.len() % 2 != 0 {
            return Err(remote("invalid hex"));
        }

        let bytes = (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16))
            .collect::<Result<Vec<u8>, _>>()
            .map_err(|_| remote("invalid hex"))?;
        self.check(&bytes)?;
        Ok(bytes)
    }

    fn name(&self) -> &'static str {
        "stub-kms"
    }
}
