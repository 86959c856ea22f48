//! Providers.
//!
//! A provider binds a key material resolver to a cipher behind one contract:
//! decrypt every field of a record, or encrypt every field of a plaintext
//! projection. The variant is chosen by the record's provider annotation.
//!
//! | annotation | resolver            | cipher                   |
//! |------------|---------------------|--------------------------|
//! | `static`   | [`StaticPassphrase`]| AES-256-GCM              |
//! | `k8s`      | [`ClusterSecretKey`]| AES-256-GCM              |
//! | `aws-kms`  | [`RemoteManagedKey`]| AWS KMS (feature `aws`)  |
//! | `gcp-kms`  | [`RemoteManagedKey`]| GCP KMS (feature `gcp`)  |

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::core::cache::{FieldId, ReencryptionCache};
use crate::core::cipher::{Cipher, KmsCipher, KmsClient, KmsProvider, LocalCipher};
use crate::core::constants;
use crate::core::domain::{DecryptedRecord, EncryptedRecord, ObjectMeta};
use crate::core::resolver::{
    ClusterSecretKey, KeyMaterial, KeyResolver, RemoteManagedKey, StaticPassphrase,
};
use crate::error::{KeyError, ProviderError};

/// Provider selected by a record's annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderKind {
    Static,
    ClusterKey,
    AwsKms,
    GcpKms,
    Unknown(String),
}

impl ProviderKind {
    /// Parse an annotation value.
    pub fn parse(value: &str) -> Self {
        match value {
            "static" => Self::Static,
            "k8s" => Self::ClusterKey,
            "aws-kms" => Self::AwsKms,
            "gcp-kms" => Self::GcpKms,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Provider of a record, `None` if the annotation is absent.
    pub fn of(meta: &ObjectMeta) -> Option<Self> {
        meta.annotation(constants::PROVIDER_ANNOTATION)
            .map(Self::parse)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Static => "static",
            Self::ClusterKey => "k8s",
            Self::AwsKms => "aws-kms",
            Self::GcpKms => "gcp-kms",
            Self::Unknown(value) => value,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handling of records with a missing or unrecognized provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownProviderPolicy {
    /// Fail the pass and record the error in the status.
    #[default]
    Error,
    /// Skip the record without touching it.
    Ignore,
}

#[derive(Debug, Clone)]
struct RemoteBackend {
    client: Arc<dyn KmsClient>,
    resolver: RemoteManagedKey,
}

/// Provider registry.
///
/// Holds the collaborators every provider needs and hands out a
/// [`Provider`] bound to one record.
#[derive(Debug)]
pub struct Providers {
    passphrase: StaticPassphrase,
    cluster_key: ClusterSecretKey,
    remote: BTreeMap<KmsProvider, RemoteBackend>,
    unknown: UnknownProviderPolicy,
    cache: Arc<ReencryptionCache>,
}

impl Providers {
    /// Registry with the local providers, a fresh cache and no remote
    /// backends.
    pub fn new(passphrase: StaticPassphrase, cluster_key: ClusterSecretKey) -> Self {
        Self {
            passphrase,
            cluster_key,
            remote: BTreeMap::new(),
            unknown: UnknownProviderPolicy::default(),
            cache: Arc::new(ReencryptionCache::new()),
        }
    }

    pub fn with_unknown_policy(mut self, policy: UnknownProviderPolicy) -> Self {
        self.unknown = policy;
        self
    }

    /// Share a cache with other registries.
    pub fn with_cache(mut self, cache: Arc<ReencryptionCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Register a remote key service for `aws-kms` or `gcp-kms` records.
    pub fn with_remote(
        mut self,
        kind: KmsProvider,
        client: Arc<dyn KmsClient>,
        resolver: RemoteManagedKey,
    ) -> Self {
        self.remote.insert(kind, RemoteBackend { client, resolver });
        self
    }

    pub fn cache(&self) -> &Arc<ReencryptionCache> {
        &self.cache
    }

    /// Bind a provider to a record, resolving its key once.
    ///
    /// Returns `Ok(None)` when the provider is missing or unknown and the
    /// policy is [`UnknownProviderPolicy::Ignore`].
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::UnknownProvider` or `MissingProvider` under
    /// the default policy, `ProviderError::NotCompiled` for a remote
    /// provider built without its feature, or `ProviderError::Key` if key
    /// resolution fails.
    #[instrument(skip_all, fields(record = %meta.id()))]
    pub fn bind(&self, meta: &ObjectMeta) -> Result<Option<Provider>, ProviderError> {
        let kind = match ProviderKind::of(meta) {
            Some(kind) => kind,
            None => return self.unmatched(ProviderError::MissingProvider(meta.id().to_string())),
        };

        let cipher: Box<dyn Cipher> = match &kind {
            ProviderKind::Static => local(self.passphrase.resolve(meta)?)?,
            ProviderKind::ClusterKey => local(self.cluster_key.resolve(meta)?)?,
            ProviderKind::AwsKms => self.remote_cipher(KmsProvider::Aws, meta)?,
            ProviderKind::GcpKms => self.remote_cipher(KmsProvider::Gcp, meta)?,
            ProviderKind::Unknown(value) => {
                return self.unmatched(ProviderError::UnknownProvider(value.clone()))
            }
        };

        let binding = format!("{}/{}", kind, cipher.binding()?);
        debug!(provider = %kind, cipher = cipher.name(), "provider bound");
        Ok(Some(Provider {
            kind,
            cipher,
            binding,
            cache: Arc::clone(&self.cache),
        }))
    }

    fn unmatched(&self, err: ProviderError) -> Result<Option<Provider>, ProviderError> {
        match self.unknown {
            UnknownProviderPolicy::Error => Err(err),
            UnknownProviderPolicy::Ignore => {
                debug!(reason = %err, "skipping record");
                Ok(None)
            }
        }
    }

    fn remote_cipher(
        &self,
        service: KmsProvider,
        meta: &ObjectMeta,
    ) -> Result<Box<dyn Cipher>, ProviderError> {
        let backend = match self.remote.get(&service) {
            Some(backend) => backend,
            None => return Err(not_configured(service)),
        };
        match backend.resolver.resolve(meta)? {
            KeyMaterial::Remote(handle) => {
                Ok(Box::new(KmsCipher::new(Arc::clone(&backend.client), handle)))
            }
            KeyMaterial::Local(_) => Err(KeyError::Unavailable(
                "remote provider resolved a local key".to_string(),
            )
            .into()),
        }
    }
}

fn local(material: KeyMaterial) -> Result<Box<dyn Cipher>, ProviderError> {
    match material {
        KeyMaterial::Local(key) => Ok(Box::new(LocalCipher::new(key))),
        KeyMaterial::Remote(handle) => Err(KeyError::Unavailable(format!(
            "local provider resolved remote key {}",
            handle
        ))
        .into()),
    }
}

fn not_configured(service: KmsProvider) -> ProviderError {
    let compiled = match service {
        KmsProvider::Aws => cfg!(feature = "aws"),
        KmsProvider::Gcp => cfg!(feature = "gcp"),
    };
    if compiled {
        KeyError::Unavailable(format!("no {} client configured", service.name())).into()
    } else {
        match service {
            KmsProvider::Aws => ProviderError::NotCompiled("AWS KMS", "aws"),
            KmsProvider::Gcp => ProviderError::NotCompiled("GCP KMS", "gcp"),
        }
    }
}

/// A provider bound to one record's key.
#[derive(Debug)]
pub struct Provider {
    kind: ProviderKind,
    cipher: Box<dyn Cipher>,
    /// Provider kind plus cipher key identity; tags cache entries.
    binding: String,
    cache: Arc<ReencryptionCache>,
}

impl Provider {
    pub fn kind(&self) -> &ProviderKind {
        &self.kind
    }

    /// Decrypt every field of a record.
    ///
    /// Stops at the first field that fails; no partial record is returned.
    /// On success the cache remembers every (plaintext, ciphertext) pair
    /// under this provider's binding. On failure the record's entries are
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Field` naming the field that failed.
    #[instrument(skip_all, fields(record = %record.id(), provider = %self.kind))]
    pub fn decrypt_all(&self, record: &EncryptedRecord) -> Result<DecryptedRecord, ProviderError> {
        let mut decrypted = DecryptedRecord::new(record.metadata.clone());
        for (field, value) in &record.data {
            let plaintext = match self.cipher.decrypt(value) {
                Ok(plaintext) => plaintext,
                Err(source) => {
                    self.cache.forget(&record.id());
                    return Err(ProviderError::Field {
                        field: field.clone(),
                        source,
                    });
                }
            };
            decrypted.data.insert(field.clone(), plaintext);
        }

        self.cache.remember(record, &decrypted, &self.binding);
        debug!(fields = decrypted.data.len(), "decrypted record");
        Ok(decrypted)
    }

    /// Encrypt every field of a plaintext projection.
    ///
    /// Without `re_encrypt_all`, a field whose plaintext equals the last
    /// decrypt of the same record instance under the same key keeps its
    /// previous ciphertext.
    /// With it, every field of that last decrypt is sealed afresh and the
    /// values in `decrypted` are ignored.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::MissingSnapshot` if `re_encrypt_all` is set
    /// and the record was never decrypted under this key by this process, or
    /// `ProviderError::Field` naming the field that failed.
    #[instrument(skip_all, fields(record = %decrypted.id(), provider = %self.kind, re_encrypt_all = re_encrypt_all))]
    pub fn encrypt_all(
        &self,
        decrypted: &DecryptedRecord,
        re_encrypt_all: bool,
    ) -> Result<EncryptedRecord, ProviderError> {
        let id = decrypted.id();
        let uid = decrypted.metadata.uid.as_deref();
        let mut encrypted = EncryptedRecord::new(decrypted.metadata.clone());

        if re_encrypt_all {
            let snapshot = self
                .cache
                .snapshot(&id, uid, &self.binding)
                .ok_or_else(|| ProviderError::MissingSnapshot(id.to_string()))?;
            for (field, plaintext) in snapshot {
                let value = self.seal(&field, &plaintext)?;
                encrypted.data.insert(field, value);
            }
            debug!(fields = encrypted.data.len(), "re-encrypted record");
            return Ok(encrypted);
        }

        let mut reused = 0usize;
        for (field, plaintext) in &decrypted.data {
            let value = match self
                .cache
                .reuse(
                    &FieldId::new(id.clone(), field.clone()),
                    uid,
                    &self.binding,
                    plaintext,
                )
            {
                Some(ciphertext) => {
                    trace!(field = %field, "reusing ciphertext");
                    reused += 1;
                    ciphertext
                }
                None => self.seal(field, plaintext)?,
            };
            encrypted.data.insert(field.clone(), value);
        }

        debug!(fields = encrypted.data.len(), reused, "encrypted record");
        Ok(encrypted)
    }

    fn seal(&self, field: &str, plaintext: &str) -> Result<String, ProviderError> {
        self.cipher
            .encrypt(plaintext)
            .map_err(|source| ProviderError::Field {
                field: field.to_string(),
                source,
            })
    }
}
