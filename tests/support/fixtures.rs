//! Shared fixtures: keys, manifests and a local KMS double.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use cryptctl::core::cipher::{seal, Kdf, KmsClient, SymmetricKey};
use cryptctl::core::constants;
use cryptctl::core::domain::{EncryptedRecord, ObjectMeta, ResourceId, Secret};
use cryptctl::core::provider::Providers;
use cryptctl::core::reconcile::Reconciler;
use cryptctl::core::resolver::{ClusterSecretKey, StaticPassphrase};
use cryptctl::core::store::{MemoryStore, ResourceStore};
use cryptctl::error::CipherError;

/// Passphrase used by every test.
pub const PASSPHRASE: &str = "hello";

/// Config with cheap Argon2 parameters, matching [`fast_kdf`].
pub const FAST_CONFIG: &str = r#"
[kdf]
algorithm = "argon2id"
memory_kib = 64
iterations = 1
parallelism = 1
"#;

/// Cheap Argon2 parameters; production defaults are too slow for tests.
pub fn fast_kdf() -> Kdf {
    Kdf::Argon2id {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    }
}

/// Key derived from `passphrase` with [`fast_kdf`].
pub fn key(passphrase: &str) -> SymmetricKey {
    fast_kdf().derive(passphrase.as_bytes()).unwrap()
}

/// Seal `value` under [`PASSPHRASE`].
pub fn sealed(value: &str) -> String {
    seal(value, &key(PASSPHRASE)).unwrap()
}

/// Encrypted record with the given provider and sealed fields.
pub fn record(namespace: &str, name: &str, provider: &str, fields: &[(&str, &str)]) -> EncryptedRecord {
    let meta = ObjectMeta::new(&ResourceId::new(namespace, name))
        .with_annotation(constants::PROVIDER_ANNOTATION, provider);
    fields
        .iter()
        .fold(EncryptedRecord::new(meta), |record, (field, value)| {
            record.with_field(*field, *value)
        })
}

/// Static-provider record whose fields are sealed under [`PASSPHRASE`].
pub fn static_record(namespace: &str, name: &str, fields: &[(&str, &str)]) -> EncryptedRecord {
    let sealed_fields: Vec<(String, String)> = fields
        .iter()
        .map(|(field, value)| (field.to_string(), sealed(value)))
        .collect();
    let refs: Vec<(&str, &str)> = sealed_fields
        .iter()
        .map(|(f, v)| (f.as_str(), v.as_str()))
        .collect();
    record(namespace, name, "static", &refs)
}

/// Key secret read by the `k8s` provider.
pub fn key_secret(namespace: &str, material: &str) -> Secret {
    Secret::new(ObjectMeta::new(&ResourceId::new(
        namespace,
        constants::CLUSTER_KEY_SECRET,
    )))
    .with_field(constants::CLUSTER_KEY_FIELD, material)
}

/// EncryptedSecret manifest JSON.
pub fn manifest(record: &EncryptedRecord) -> String {
    serde_json::to_string_pretty(record).unwrap()
}

/// In-memory store plus a reconciler over it using [`PASSPHRASE`].
pub fn memory_reconciler() -> (Arc<MemoryStore>, Reconciler) {
    let store = Arc::new(MemoryStore::new());
    let reconciler = Reconciler::new(store.clone(), providers(store.clone()));
    (store, reconciler)
}

/// Providers over `store` using [`PASSPHRASE`] and [`fast_kdf`].
pub fn providers(store: Arc<dyn ResourceStore>) -> Providers {
    Providers::new(
        StaticPassphrase::fixed(PASSPHRASE, fast_kdf()),
        ClusterSecretKey::new(store, fast_kdf()),
    )
}

/// Reversible KMS double that keeps "keys" in memory.
///
/// Each handle maps to a one-byte mask; a blob is the mask followed by the
/// masked plaintext, so it only opens under the key that produced it. Counts
/// calls so tests can see skipped work.
#[derive(Debug, Default)]
pub struct LocalKms {
    keys: BTreeMap<String, u8>,
    encrypts: AtomicUsize,
    decrypts: AtomicUsize,
}

impl LocalKms {
    /// A KMS that knows the given key handles.
    pub fn with_keys(keys: &[&str]) -> Self {
        Self {
            keys: keys
                .iter()
                .enumerate()
                .map(|(i, k)| (k.to_string(), i as u8 + 1))
                .collect(),
            ..Self::default()
        }
    }

    pub fn encrypts(&self) -> usize {
        self.encrypts.load(Ordering::SeqCst)
    }

    pub fn decrypts(&self) -> usize {
        self.decrypts.load(Ordering::SeqCst)
    }

    fn mask(&self, key: &str) -> Result<u8, CipherError> {
        self.keys.get(key).copied().ok_or_else(|| CipherError::Remote {
            service: "local-kms",
            message: format!("key {} not found", key),
        })
    }
}

impl KmsClient for LocalKms {
    fn encrypt(&self, key: &str, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        self.encrypts.fetch_add(1, Ordering::SeqCst);
        let mask = self.mask(key)?;
        let mut blob = vec![mask];
        blob.extend(plaintext.iter().map(|b| b ^ mask));
        Ok(blob)
    }

    fn decrypt(&self, key: &str, ciphertext: &[u8]) -> Result<Vec<u8>, CipherError> {
        self.decrypts.fetch_add(1, Ordering::SeqCst);
        let mask = self.mask(key)?;
        match ciphertext.split_first() {
            Some((&tag, body)) if tag == mask => Ok(body.iter().map(|b| b ^ mask).collect()),
            _ => Err(CipherError::Remote {
                service: "local-kms",
                message: "ciphertext was not produced by this key".to_string(),
            }),
        }
    }

    fn name(&self) -> &'static str {
        "local-kms"
    }
}

/// Base64 blob as [`LocalKms`] would produce it through the provider.
pub fn local_kms_blob(kms: &LocalKms, key: &str, plaintext: &str) -> String {
    STANDARD.encode(kms.encrypt(key, plaintext.as_bytes()).unwrap())
}
