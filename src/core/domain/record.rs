//! Encrypted and decrypted secret records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{ObjectMeta, ReconciliationStatus, ResourceId};
use crate::core::constants;
use crate::core::types::{EncryptedValue, FieldName, PlaintextValue};
use crate::error::ValidationError;

fn encrypted_kind() -> String {
    constants::ENCRYPTED_SECRET_KIND.to_string()
}

fn decrypted_kind() -> String {
    constants::DECRYPTED_SECRET_KIND.to_string()
}

fn api_version() -> String {
    constants::API_VERSION.to_string()
}

/// Source-of-truth resource holding ciphertext field values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedRecord {
    #[serde(default = "api_version")]
    pub api_version: String,
    #[serde(default = "encrypted_kind")]
    pub kind: String,
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub data: BTreeMap<FieldName, EncryptedValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ReconciliationStatus>,
}

impl EncryptedRecord {
    pub fn new(metadata: ObjectMeta) -> Self {
        Self {
            api_version: api_version(),
            kind: encrypted_kind(),
            metadata,
            data: BTreeMap::new(),
            status: None,
        }
    }

    pub fn id(&self) -> ResourceId {
        self.metadata.id()
    }

    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(field.into(), value.into());
        self
    }

    /// Whether another actor owns this record's plaintext projection.
    pub fn is_injected(&self) -> bool {
        self.metadata.annotation(constants::INJECT_ANNOTATION) == Some("true")
    }

    /// Reject manifests of another kind.
    pub fn check_kind(&self) -> Result<(), ValidationError> {
        if self.kind != constants::ENCRYPTED_SECRET_KIND {
            return Err(ValidationError::UnexpectedKind {
                expected: constants::ENCRYPTED_SECRET_KIND,
                found: self.kind.clone(),
            });
        }
        Ok(())
    }
}

/// Transient plaintext projection of an [`EncryptedRecord`].
///
/// Never persisted by the core; the derived secret is a separate resource.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptedRecord {
    #[serde(default = "api_version")]
    pub api_version: String,
    #[serde(default = "decrypted_kind")]
    pub kind: String,
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub data: BTreeMap<FieldName, PlaintextValue>,
}

impl DecryptedRecord {
    pub fn new(metadata: ObjectMeta) -> Self {
        Self {
            api_version: api_version(),
            kind: decrypted_kind(),
            metadata,
            data: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> ResourceId {
        self.metadata.id()
    }

    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(field.into(), value.into());
        self
    }

    pub fn check_kind(&self) -> Result<(), ValidationError> {
        if self.kind != constants::DECRYPTED_SECRET_KIND {
            return Err(ValidationError::UnexpectedKind {
                expected: constants::DECRYPTED_SECRET_KIND,
                found: self.kind.clone(),
            });
        }
        Ok(())
    }
}

// Plaintext must not end up in logs.
impl std::fmt::Debug for DecryptedRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecryptedRecord")
            .field("metadata", &self.metadata)
            .field("fields", &self.data.keys().collect::<Vec<_>>())
            .finish()
    }
}
