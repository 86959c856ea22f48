//! In-memory resource store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use super::{merge_encrypted, merge_secret, Applied, ResourceStore};
use crate::core::domain::{EncryptedRecord, ReconciliationStatus, ResourceId, Secret};
use crate::error::StoreError;

#[derive(Debug, Default)]
struct State {
    encrypted: BTreeMap<ResourceId, EncryptedRecord>,
    secrets: BTreeMap<ResourceId, Secret>,
}

/// Resource store backed by in-process maps.
///
/// Writes can be made to fail on demand to drive the convergence loop's
/// error paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    fail_secret_writes: AtomicBool,
    fail_status_writes: AtomicBool,
    secret_writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `apply_secret` call fail until switched off.
    pub fn fail_secret_writes(&self, fail: bool) {
        self.fail_secret_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every `update_status` call fail until switched off.
    pub fn fail_status_writes(&self, fail: bool) {
        self.fail_status_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of `apply_secret` calls that created or changed a secret.
    pub fn secret_writes(&self) -> usize {
        self.secret_writes.load(Ordering::SeqCst)
    }

    /// Delete an encrypted record, as a user deleting the resource would.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Poisoned` if the lock is poisoned.
    pub fn delete_encrypted(
        &self,
        id: &ResourceId,
    ) -> Result<Option<EncryptedRecord>, StoreError> {
        let removed = self.lock()?.encrypted.remove(id);
        debug!(record = %id, found = removed.is_some(), "deleted encrypted record");
        Ok(removed)
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl ResourceStore for MemoryStore {
    fn get_encrypted(&self, id: &ResourceId) -> Result<Option<EncryptedRecord>, StoreError> {
        Ok(self.lock()?.encrypted.get(id).cloned())
    }

    fn put_encrypted(&self, record: EncryptedRecord) -> Result<EncryptedRecord, StoreError> {
        let id = record.id();
        let mut state = self.lock()?;
        let stored = merge_encrypted(record, state.encrypted.get(&id));
        state.encrypted.insert(id, stored.clone());
        Ok(stored)
    }

    fn update_status(
        &self,
        id: &ResourceId,
        status: ReconciliationStatus,
    ) -> Result<(), StoreError> {
        if self.fail_status_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteRejected {
                kind: "EncryptedSecret",
                id: id.to_string(),
                reason: "status writes disabled".to_string(),
            });
        }

        let mut state = self.lock()?;
        let record = state
            .encrypted
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound {
                kind: "EncryptedSecret",
                id: id.to_string(),
            })?;
        record.status = Some(status);
        Ok(())
    }

    fn get_secret(&self, id: &ResourceId) -> Result<Option<Secret>, StoreError> {
        Ok(self.lock()?.secrets.get(id).cloned())
    }

    fn apply_secret(&self, secret: Secret) -> Result<Applied, StoreError> {
        let id = secret.id();
        if self.fail_secret_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteRejected {
                kind: "Secret",
                id: id.to_string(),
                reason: "secret writes disabled".to_string(),
            });
        }

        let mut state = self.lock()?;
        let (stored, applied) = merge_secret(secret, state.secrets.get(&id));
        if applied != Applied::Unchanged {
            self.secret_writes.fetch_add(1, Ordering::SeqCst);
            state.secrets.insert(id.clone(), stored);
        }
        debug!(secret = %id, %applied, "applied secret");
        Ok(applied)
    }

    fn list_encrypted(&self) -> Result<Vec<ResourceId>, StoreError> {
        Ok(self.lock()?.encrypted.keys().cloned().collect())
    }
}
