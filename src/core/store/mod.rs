//! Resource store.
//!
//! The convergence loop reads and writes cluster-style resources through the
//! [`ResourceStore`] trait: encrypted records, their status, and plaintext
//! secrets (both derived secrets and the key secrets consumed by the
//! cluster-key resolver).
//!
//! ## Implementations
//!
//! - [`MemoryStore`]: in-process maps with write-failure injection
//! - [`FileStore`]: a JSON state file, used by the CLI
//!
//! ## Adding a New Store
//!
//! 1. Implement [`ResourceStore`]
//! 2. Add the implementation in a new file (e.g., `cluster.rs`)
//! 3. Re-export from this module
//!
//! Not-found is `Ok(None)`, never an error: the convergence loop treats a
//! missing record as a terminal success.

use crate::core::domain::{EncryptedRecord, ReconciliationStatus, ResourceId, Secret};
use crate::error::StoreError;

mod fs;
mod memory;

pub use fs::FileStore;
pub use memory::MemoryStore;

/// Result of a create-or-update on a secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Created,
    Updated,
    Unchanged,
}

impl std::fmt::Display for Applied {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Applied::Created => write!(f, "created"),
            Applied::Updated => write!(f, "updated"),
            Applied::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// Resource store trait.
///
/// Shared between the convergence loop and the cluster-key resolver, so
/// implementations must be usable behind `Arc<dyn ResourceStore>`.
pub trait ResourceStore: std::fmt::Debug + Send + Sync {
    /// Fetch an encrypted record.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the read fails. A missing record is `Ok(None)`.
    fn get_encrypted(&self, id: &ResourceId) -> Result<Option<EncryptedRecord>, StoreError>;

    /// Create or replace an encrypted record.
    ///
    /// A record seen for the first time is assigned a uid. An existing
    /// record keeps its uid, and keeps its status unless the incoming record
    /// carries one. Returns the stored record.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the write fails.
    fn put_encrypted(&self, record: EncryptedRecord) -> Result<EncryptedRecord, StoreError>;

    /// Replace the status of an encrypted record.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the record no longer exists, or
    /// another `StoreError` if the write fails.
    fn update_status(&self, id: &ResourceId, status: ReconciliationStatus)
        -> Result<(), StoreError>;

    /// Fetch a secret.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the read fails. A missing secret is `Ok(None)`.
    fn get_secret(&self, id: &ResourceId) -> Result<Option<Secret>, StoreError>;

    /// Create or update a secret.
    ///
    /// New secrets are assigned a uid; updates keep the stored one.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the write fails.
    fn apply_secret(&self, secret: Secret) -> Result<Applied, StoreError>;

    /// Identities of every encrypted record, in a stable order.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the read fails.
    fn list_encrypted(&self) -> Result<Vec<ResourceId>, StoreError>;
}

/// Merge an incoming encrypted record over the stored one.
pub(crate) fn merge_encrypted(
    mut incoming: EncryptedRecord,
    existing: Option<&EncryptedRecord>,
) -> EncryptedRecord {
    match existing {
        Some(current) => {
            incoming.metadata.uid = current.metadata.uid.clone();
            if incoming.status.is_none() {
                incoming.status = current.status.clone();
            }
        }
        None => {
            if incoming.metadata.uid.is_none() {
                incoming.metadata.uid = Some(new_uid());
            }
        }
    }
    incoming
}

/// Merge an incoming secret over the stored one.
///
/// Reports [`Applied::Unchanged`] when the stored secret already matches.
pub(crate) fn merge_secret(mut incoming: Secret, existing: Option<&Secret>) -> (Secret, Applied) {
    match existing {
        Some(current) => {
            incoming.metadata.uid = current.metadata.uid.clone();
            if &incoming == current {
                (incoming, Applied::Unchanged)
            } else {
                (incoming, Applied::Updated)
            }
        }
        None => {
            if incoming.metadata.uid.is_none() {
                incoming.metadata.uid = Some(new_uid());
            }
            (incoming, Applied::Created)
        }
    }
}

fn new_uid() -> String {
    uuid::Uuid::new_v4().to_string()
}
