//! Convergence loop.
//!
//! One pass turns an encrypted record into its derived plaintext secret:
//!
//! ```text
//! Fetching → Resolved → Decrypting → Writing → {Ready, Error}
//! ```
//!
//! A missing record, an injected record and (under the `ignore` policy) a
//! record with an unknown provider end the pass without touching anything.
//! Every other pass ends by writing the record's status. Failures are not
//! retried here; the caller decides whether to run the pass again.

use std::sync::Arc;

use tracing::{debug, error, info, info_span, warn};

use crate::core::constants;
use crate::core::domain::{
    EncryptedRecord, ReconciliationStatus, ResourceId, Secret, StatusState,
};
use crate::core::provider::Providers;
use crate::core::store::ResourceStore;
use crate::error::Result;

/// Where a pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    /// No record with that identity; nothing to converge.
    Missing,
    /// Record marked as injected by another actor.
    Bypassed,
    /// Provider missing or unknown under the `ignore` policy.
    Ignored,
    /// Derived secret written and status set to `Ready`.
    Ready,
    /// A stage failed and status set to `Error`.
    Error,
}

impl std::fmt::Display for PassState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Missing => "missing",
            Self::Bypassed => "bypassed",
            Self::Ignored => "ignored",
            Self::Ready => "ready",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Result of one pass, reported to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// Run the pass again; set when the status could not be written.
    pub requeue: bool,
    pub state: PassState,
}

impl Outcome {
    fn done(state: PassState) -> Self {
        Self {
            requeue: false,
            state,
        }
    }
}

/// Drives reconciliation passes against a store.
#[derive(Debug)]
pub struct Reconciler {
    store: Arc<dyn ResourceStore>,
    providers: Providers,
}

impl Reconciler {
    pub fn new(store: Arc<dyn ResourceStore>, providers: Providers) -> Self {
        Self { store, providers }
    }

    pub fn providers(&self) -> &Providers {
        &self.providers
    }

    /// Run one pass for `id`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` only when the record itself cannot be read.
    /// Every later failure is recorded in the record's status instead.
    pub fn reconcile(&self, id: &ResourceId) -> Result<Outcome> {
        let _span = info_span!("reconcile", record = %id).entered();

        let record = match self.store.get_encrypted(id)? {
            Some(record) => record,
            None => {
                debug!("record not found, nothing to do");
                self.providers.cache().forget(id);
                return Ok(Outcome::done(PassState::Missing));
            }
        };

        if record.is_injected() {
            debug!(
                annotation = constants::INJECT_ANNOTATION,
                "record is injected elsewhere, skipping"
            );
            self.providers.cache().forget(id);
            return Ok(Outcome::done(PassState::Bypassed));
        }

        let provider = match self.providers.bind(&record.metadata) {
            Ok(Some(provider)) => provider,
            Ok(None) => {
                self.providers.cache().forget(id);
                return Ok(Outcome::done(PassState::Ignored));
            }
            Err(e) => {
                error!(error = %e, "failed to resolve provider");
                self.providers.cache().forget(id);
                return Ok(self.finish(
                    &record,
                    ReconciliationStatus::error(format!("failed to decrypt value for {}", e)),
                ));
            }
        };

        let decrypted = match provider.decrypt_all(&record) {
            Ok(decrypted) => decrypted,
            Err(e) => {
                error!(error = %e, "failed to decrypt");
                return Ok(self.finish(
                    &record,
                    ReconciliationStatus::error(format!("failed to decrypt value for {}", e)),
                ));
            }
        };

        let existing = match self.store.get_secret(id) {
            Ok(existing) => existing,
            Err(e) => {
                error!(error = %e, "failed to read secret");
                return Ok(self.finish(
                    &record,
                    ReconciliationStatus::error(format!("error getting secret {}", e)),
                ));
            }
        };

        let mut secret = Secret::derive(&record, &decrypted, existing.as_ref());
        if let Err(e) = secret.metadata.set_controller(
            &record.metadata,
            &record.api_version,
            constants::ENCRYPTED_SECRET_KIND,
        ) {
            error!(error = %e, "failed to set owner reference");
            return Ok(self.finish(
                &record,
                ReconciliationStatus::error(format!("error setting owner reference {}", e)),
            ));
        }

        match self.store.apply_secret(secret) {
            Ok(applied) => debug!(%applied, "secret written"),
            Err(e) => {
                error!(error = %e, "failed to write secret");
                return Ok(self.finish(
                    &record,
                    ReconciliationStatus::error(format!("error writing secret {}", e)),
                ));
            }
        }

        Ok(self.finish(
            &record,
            ReconciliationStatus::ready(format!(
                "encrypted secrets {} is ready to be used",
                record.metadata.name
            )),
        ))
    }

    /// Run a pass for every record in the store.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the record list cannot be read. Per-record
    /// read failures are reported in place.
    pub fn reconcile_all(&self) -> Result<Vec<(ResourceId, Result<Outcome>)>> {
        let ids = self.store.list_encrypted()?;
        info!(records = ids.len(), "reconciling all records");
        Ok(ids
            .into_iter()
            .map(|id| {
                let outcome = self.reconcile(&id);
                (id, outcome)
            })
            .collect())
    }

    fn finish(&self, record: &EncryptedRecord, status: ReconciliationStatus) -> Outcome {
        let state = match status.status {
            StatusState::Ready => PassState::Ready,
            _ => PassState::Error,
        };
        let status = status.after(record.status.as_ref());
        info!(status = %status.status, message = %status.message, "pass finished");

        match self.store.update_status(&record.id(), status) {
            Ok(()) => Outcome::done(state),
            Err(e) => {
                warn!(error = %e, "failed to update status");
                Outcome {
                    requeue: true,
                    state,
                }
            }
        }
    }
}
