//! Secret type.
//!
//! A plaintext secret resource: the derived projection of an encrypted
//! record, or a stored key consumed by the cluster-key resolver. Values are
//! raw bytes and serialize as base64, the way clusters expose secret data.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{DecryptedRecord, EncryptedRecord, ObjectMeta, ResourceId};
use crate::core::constants;
use crate::core::types::FieldName;
use crate::error::ValidationError;

fn secret_kind() -> String {
    constants::SECRET_KIND.to_string()
}

fn secret_api_version() -> String {
    constants::SECRET_API_VERSION.to_string()
}

/// A plaintext secret resource
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Secret {
    #[serde(default = "secret_api_version")]
    pub api_version: String,
    #[serde(default = "secret_kind")]
    pub kind: String,
    pub metadata: ObjectMeta,
    #[serde(default, with = "base64_map")]
    pub data: BTreeMap<FieldName, Vec<u8>>,
}

impl Secret {
    pub fn new(metadata: ObjectMeta) -> Self {
        Self {
            api_version: secret_api_version(),
            kind: secret_kind(),
            metadata,
            data: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> ResourceId {
        self.metadata.id()
    }

    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.data.insert(field.into(), value.into());
        self
    }

    /// Build the derived secret for a decrypted record.
    ///
    /// Labels and annotations are copied verbatim from the source record and
    /// the field map is replaced wholesale. `existing` keeps whatever owner
    /// references the live object already carries.
    pub fn derive(
        source: &EncryptedRecord,
        decrypted: &DecryptedRecord,
        existing: Option<&Secret>,
    ) -> Self {
        let mut metadata = ObjectMeta::new(&source.id());
        metadata.labels = source.metadata.labels.clone();
        metadata.annotations = source.metadata.annotations.clone();
        if let Some(live) = existing {
            metadata.uid = live.metadata.uid.clone();
            metadata.owner_references = live.metadata.owner_references.clone();
        }

        let mut secret = Self::new(metadata);
        secret.data = decrypted
            .data
            .iter()
            .map(|(field, value)| (field.clone(), value.as_bytes().to_vec()))
            .collect();
        secret
    }

    pub fn check_kind(&self) -> Result<(), ValidationError> {
        if self.kind != constants::SECRET_KIND {
            return Err(ValidationError::UnexpectedKind {
                expected: constants::SECRET_KIND,
                found: self.kind.clone(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secret")
            .field("metadata", &self.metadata)
            .field("fields", &self.data.keys().collect::<Vec<_>>())
            .finish()
    }
}

mod base64_map {
    use std::collections::BTreeMap;

    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        data: &BTreeMap<String, Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        data.iter()
            .map(|(k, v)| (k, STANDARD.encode(v)))
            .collect::<BTreeMap<_, _>>()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, Vec<u8>>, D::Error> {
        BTreeMap::<String, String>::deserialize(deserializer)?
            .into_iter()
            .map(|(k, v)| {
                STANDARD
                    .decode(&v)
                    .map(|bytes| (k.clone(), bytes))
                    .map_err(|e| D::Error::custom(format!("field {}: invalid base64: {}", k, e)))
            })
            .collect()
    }
}
