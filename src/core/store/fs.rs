//! File-backed resource store.
//!
//! Keeps every resource in a single JSON document (`cryptctl-state.json` by
//! default). Each operation loads the file, applies the change and writes it
//! back through a temporary file, so a crash never leaves a half-written
//! state file behind.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{merge_encrypted, merge_secret, Applied, ResourceStore};
use crate::core::domain::{EncryptedRecord, ReconciliationStatus, ResourceId, Secret};
use crate::error::StoreError;

/// On-disk layout.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct State {
    #[serde(default)]
    encrypted_secrets: Vec<EncryptedRecord>,
    #[serde(default)]
    secrets: Vec<Secret>,
}

impl State {
    fn encrypted(&self) -> BTreeMap<ResourceId, EncryptedRecord> {
        self.encrypted_secrets
            .iter()
            .map(|r| (r.id(), r.clone()))
            .collect()
    }
}

/// Resource store backed by a JSON state file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // Serializes load-modify-save within this process.
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<State, StoreError> {
        if !self.path.exists() {
            trace!(path = %self.path.display(), "state file missing, starting empty");
            return Ok(State::default());
        }
        let contents = fs::read_to_string(&self.path).map_err(StoreError::Read)?;
        if contents.trim().is_empty() {
            return Ok(State::default());
        }
        serde_json::from_str(&contents).map_err(StoreError::Corrupt)
    }

    fn save(&self, state: &State) -> Result<(), StoreError> {
        let contents = serde_json::to_string_pretty(state).map_err(StoreError::Corrupt)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(StoreError::Write)?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, format!("{}\n", contents)).map_err(StoreError::Write)?;

        // The state file holds derived plaintext secrets.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))
                .map_err(StoreError::Write)?;
        }

        fs::rename(&tmp, &self.path).map_err(StoreError::Write)?;
        debug!(path = %self.path.display(), "state saved");
        Ok(())
    }

    fn modify<T>(&self, f: impl FnOnce(&mut State) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut state = self.load()?;
        let value = f(&mut state)?;
        self.save(&state)?;
        Ok(value)
    }
}

impl ResourceStore for FileStore {
    fn get_encrypted(&self, id: &ResourceId) -> Result<Option<EncryptedRecord>, StoreError> {
        Ok(self
            .load()?
            .encrypted_secrets
            .into_iter()
            .find(|r| &r.id() == id))
    }

    fn put_encrypted(&self, record: EncryptedRecord) -> Result<EncryptedRecord, StoreError> {
        self.modify(|state| {
            let id = record.id();
            let position = state.encrypted_secrets.iter().position(|r| r.id() == id);
            let stored = merge_encrypted(
                record,
                position.map(|i| &state.encrypted_secrets[i]),
            );
            match position {
                Some(i) => state.encrypted_secrets[i] = stored.clone(),
                None => state.encrypted_secrets.push(stored.clone()),
            }
            Ok(stored)
        })
    }

    fn update_status(
        &self,
        id: &ResourceId,
        status: ReconciliationStatus,
    ) -> Result<(), StoreError> {
        self.modify(|state| {
            let record = state
                .encrypted_secrets
                .iter_mut()
                .find(|r| &r.id() == id)
                .ok_or_else(|| StoreError::NotFound {
                    kind: "EncryptedSecret",
                    id: id.to_string(),
                })?;
            record.status = Some(status);
            Ok(())
        })
    }

    fn get_secret(&self, id: &ResourceId) -> Result<Option<Secret>, StoreError> {
        Ok(self.load()?.secrets.into_iter().find(|s| &s.id() == id))
    }

    fn apply_secret(&self, secret: Secret) -> Result<Applied, StoreError> {
        self.modify(|state| {
            let id = secret.id();
            let position = state.secrets.iter().position(|s| s.id() == id);
            let (stored, applied) = merge_secret(secret, position.map(|i| &state.secrets[i]));
            match position {
                Some(i) => state.secrets[i] = stored,
                None => state.secrets.push(stored),
            }
            debug!(secret = %id, %applied, "applied secret");
            Ok(applied)
        })
    }

    fn list_encrypted(&self) -> Result<Vec<ResourceId>, StoreError> {
        Ok(self.load()?.encrypted().into_keys().collect())
    }
}
