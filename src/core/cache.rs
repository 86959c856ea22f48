//! Change-aware re-encryption cache.
//!
//! Remembers the (plaintext, ciphertext) pair of every field of the most
//! recent decrypt of each record, so encrypting an unchanged value can reuse
//! its ciphertext instead of sealing it again.
//!
//! Entries are only trusted for the same record instance (matching uid)
//! bound to the same key (matching binding) within this process; nothing is
//! persisted. The cache is shared through an `Arc` and injected into the
//! provider registry.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use tracing::trace;
use zeroize::Zeroizing;

use crate::core::domain::{DecryptedRecord, EncryptedRecord, ResourceId};
use crate::core::types::{EncryptedValue, FieldName, PlaintextValue};

/// Identity of a single field: record identity plus field name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldId {
    pub record: ResourceId,
    pub field: FieldName,
}

impl FieldId {
    pub fn new(record: ResourceId, field: impl Into<FieldName>) -> Self {
        Self {
            record,
            field: field.into(),
        }
    }
}

struct CacheEntry {
    plaintext: Zeroizing<PlaintextValue>,
    ciphertext: EncryptedValue,
}

struct RecordEntry {
    uid: Option<String>,
    binding: String,
    fields: BTreeMap<FieldName, CacheEntry>,
}

impl RecordEntry {
    fn matches(&self, uid: Option<&str>, binding: &str) -> bool {
        self.uid.as_deref() == uid && self.binding == binding
    }
}

/// Process-wide re-encryption cache.
#[derive(Default)]
pub struct ReencryptionCache {
    records: Mutex<HashMap<ResourceId, RecordEntry>>,
}

impl std::fmt::Debug for ReencryptionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReencryptionCache")
            .field("fields", &self.len())
            .finish()
    }
}

impl ReencryptionCache {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave an entry half-written, so
    // a poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<ResourceId, RecordEntry>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record the result of a successful decrypt under the key identified
    /// by `binding`.
    ///
    /// Replaces every entry previously held for the record.
    pub fn remember(
        &self,
        source: &EncryptedRecord,
        decrypted: &DecryptedRecord,
        binding: &str,
    ) {
        let fields = decrypted
            .data
            .iter()
            .filter_map(|(field, plaintext)| {
                source.data.get(field).map(|ciphertext| {
                    (
                        field.clone(),
                        CacheEntry {
                            plaintext: Zeroizing::new(plaintext.clone()),
                            ciphertext: ciphertext.clone(),
                        },
                    )
                })
            })
            .collect::<BTreeMap<_, _>>();

        trace!(record = %source.id(), fields = fields.len(), "remembering decrypt");
        self.lock().insert(
            source.id(),
            RecordEntry {
                uid: source.metadata.uid.clone(),
                binding: binding.to_string(),
                fields,
            },
        );
    }

    /// Ciphertext to reuse for `plaintext`, if the last decrypt of the same
    /// record instance under the same binding produced exactly that value
    /// for this field.
    pub fn reuse(
        &self,
        field: &FieldId,
        uid: Option<&str>,
        binding: &str,
        plaintext: &str,
    ) -> Option<EncryptedValue> {
        let records = self.lock();
        let record = records.get(&field.record)?;
        if !record.matches(uid, binding) {
            return None;
        }
        let entry = record.fields.get(&field.field)?;
        (entry.plaintext.as_str() == plaintext).then(|| entry.ciphertext.clone())
    }

    /// Plaintext of the last decrypt of the record instance, field by field.
    pub fn snapshot(
        &self,
        record: &ResourceId,
        uid: Option<&str>,
        binding: &str,
    ) -> Option<BTreeMap<FieldName, Zeroizing<PlaintextValue>>> {
        let records = self.lock();
        let entry = records.get(record)?;
        if !entry.matches(uid, binding) {
            return None;
        }
        Some(
            entry
                .fields
                .iter()
                .map(|(field, e)| (field.clone(), e.plaintext.clone()))
                .collect(),
        )
    }

    /// Drop every entry for a record.
    pub fn forget(&self, record: &ResourceId) {
        if self.lock().remove(record).is_some() {
            trace!(record = %record, "forgot cached decrypt");
        }
    }

    /// Number of cached fields across all records.
    pub fn len(&self) -> usize {
        self.lock().values().map(|r| r.fields.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
