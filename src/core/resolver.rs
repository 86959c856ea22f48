//! Key material resolvers.
//!
//! A resolver turns a record's metadata into the key a provider needs:
//! either a local symmetric key or a handle for a remote key service. It
//! runs once per reconciliation pass per record, never per field.

use std::sync::Arc;

use tracing::{debug, instrument};
use zeroize::Zeroizing;

use crate::core::cipher::{Kdf, SymmetricKey};
use crate::core::constants;
use crate::core::domain::{ObjectMeta, ResourceId};
use crate::core::store::ResourceStore;
use crate::core::types::KeyHandle;
use crate::error::KeyError;

/// Resolved key material.
#[derive(Debug)]
pub enum KeyMaterial {
    /// Key bytes held in process memory.
    Local(SymmetricKey),
    /// Reference to a key that never leaves the remote service.
    Remote(KeyHandle),
}

/// Key material resolver.
pub trait KeyResolver: std::fmt::Debug + Send + Sync {
    /// Resolve key material for a record.
    ///
    /// # Errors
    ///
    /// Returns `KeyError` if the key source is absent or unreadable.
    fn resolve(&self, meta: &ObjectMeta) -> Result<KeyMaterial, KeyError>;

    /// Resolver name for logs.
    fn name(&self) -> &'static str;
}

#[derive(Clone)]
enum PassphraseSource {
    Env(String),
    Fixed(Zeroizing<String>),
}

/// Shared passphrase from process configuration.
///
/// The environment variable is read at resolution time, so a passphrase
/// exported after startup is picked up by the next pass.
#[derive(Clone)]
pub struct StaticPassphrase {
    source: PassphraseSource,
    kdf: Kdf,
}

impl std::fmt::Debug for StaticPassphrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let source = match &self.source {
            PassphraseSource::Env(var) => format!("env:{}", var),
            PassphraseSource::Fixed(_) => "[REDACTED]".to_string(),
        };
        f.debug_struct("StaticPassphrase")
            .field("source", &source)
            .field("kdf", &self.kdf.name())
            .finish()
    }
}

impl StaticPassphrase {
    /// Read the passphrase from `CRYPTCTL_PASSPHRASE`.
    pub fn from_env(kdf: Kdf) -> Self {
        Self::from_env_var(constants::PASSPHRASE_ENV, kdf)
    }

    /// Read the passphrase from a named environment variable.
    pub fn from_env_var(var: impl Into<String>, kdf: Kdf) -> Self {
        Self {
            source: PassphraseSource::Env(var.into()),
            kdf,
        }
    }

    /// Use a passphrase supplied up front, e.g. from an interactive prompt.
    pub fn fixed(passphrase: impl Into<String>, kdf: Kdf) -> Self {
        Self {
            source: PassphraseSource::Fixed(Zeroizing::new(passphrase.into())),
            kdf,
        }
    }

    pub fn kdf(&self) -> &Kdf {
        &self.kdf
    }

    /// Derive the symmetric key without a record, for the raw primitive.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::Unavailable` if the passphrase is unset or empty.
    pub fn key(&self) -> Result<SymmetricKey, KeyError> {
        let passphrase = match &self.source {
            PassphraseSource::Env(var) => Zeroizing::new(std::env::var(var).map_err(|_| {
                KeyError::Unavailable(format!("passphrase variable {} is not set", var))
            })?),
            PassphraseSource::Fixed(value) => value.clone(),
        };

        if passphrase.is_empty() {
            return Err(KeyError::Unavailable("passphrase is empty".to_string()));
        }

        Ok(self.kdf.derive(passphrase.as_bytes())?)
    }
}

impl KeyResolver for StaticPassphrase {
    fn resolve(&self, _meta: &ObjectMeta) -> Result<KeyMaterial, KeyError> {
        self.key().map(KeyMaterial::Local)
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Key stored in a well-known secret in the record's namespace.
#[derive(Clone)]
pub struct ClusterSecretKey {
    store: Arc<dyn ResourceStore>,
    secret_name: String,
    field: String,
    kdf: Kdf,
}

impl std::fmt::Debug for ClusterSecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterSecretKey")
            .field("secret_name", &self.secret_name)
            .field("field", &self.field)
            .field("kdf", &self.kdf.name())
            .finish_non_exhaustive()
    }
}

impl ClusterSecretKey {
    /// Look the key up in secret `cryptctl-key`, field `tls.crt`.
    pub fn new(store: Arc<dyn ResourceStore>, kdf: Kdf) -> Self {
        Self {
            store,
            secret_name: constants::CLUSTER_KEY_SECRET.to_string(),
            field: constants::CLUSTER_KEY_FIELD.to_string(),
            kdf,
        }
    }

    pub fn with_location(mut self, secret_name: impl Into<String>, field: impl Into<String>) -> Self {
        self.secret_name = secret_name.into();
        self.field = field.into();
        self
    }
}

impl KeyResolver for ClusterSecretKey {
    #[instrument(skip_all, fields(namespace = %meta.namespace, secret = %self.secret_name))]
    fn resolve(&self, meta: &ObjectMeta) -> Result<KeyMaterial, KeyError> {
        let id = ResourceId::new(&meta.namespace, &self.secret_name);

        let secret = self
            .store
            .get_secret(&id)
            .map_err(|source| KeyError::Store {
                context: format!("error getting key secret {}", id),
                source,
            })?
            .ok_or_else(|| KeyError::Unavailable(format!("key secret {} not found", id)))?;

        let material = secret.data.get(&self.field).ok_or_else(|| {
            KeyError::Unavailable(format!("key secret {} has no field {}", id, self.field))
        })?;

        debug!(field = %self.field, "resolved cluster key");
        Ok(KeyMaterial::Local(self.kdf.derive(material)?))
    }

    fn name(&self) -> &'static str {
        "k8s"
    }
}

/// Handle for a key held by a remote key service.
///
/// The per-record annotation wins over the configured default.
#[derive(Debug, Clone, Default)]
pub struct RemoteManagedKey {
    default_key: Option<KeyHandle>,
}

impl RemoteManagedKey {
    pub fn new(default_key: Option<KeyHandle>) -> Self {
        Self { default_key }
    }
}

impl KeyResolver for RemoteManagedKey {
    fn resolve(&self, meta: &ObjectMeta) -> Result<KeyMaterial, KeyError> {
        meta.annotation(constants::KMS_KEY_ANNOTATION)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .or_else(|| self.default_key.clone())
            .map(KeyMaterial::Remote)
            .ok_or_else(|| {
                KeyError::Unavailable(format!(
                    "no KMS key for {}: set annotation {} or a default key",
                    meta.id(),
                    constants::KMS_KEY_ANNOTATION
                ))
            })
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}
