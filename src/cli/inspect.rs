//! Status and get-secret commands.

use tracing::debug;

use crate::cli::context::Context;
use crate::cli::{output, Globals};
use crate::core::constants;
use crate::core::domain::ResourceId;
use crate::error::{Result, StoreError};

/// Show the status of an encrypted record.
pub fn status(globals: &Globals, id: &str, json: bool) -> Result<()> {
    let ctx = Context::load(globals)?;
    let id: ResourceId = id.parse()?;
    let record = ctx
        .store
        .get_encrypted(&id)?
        .ok_or_else(|| StoreError::NotFound {
            kind: "EncryptedSecret",
            id: id.to_string(),
        })?;
    let status = record.status.clone().unwrap_or_default();

    if json {
        return output::json(&status);
    }

    output::kv("record", output::key(&id));
    output::kv(
        "provider",
        record
            .metadata
            .annotation(constants::PROVIDER_ANNOTATION)
            .unwrap_or("-"),
    );
    output::kv("fields", record.data.len());
    output::kv("status", output::state(&status.status.to_string()));
    if !status.message.is_empty() {
        output::kv("message", &status.message);
    }
    if let Some(at) = status.last_transition_time {
        output::kv("since", at.to_rfc3339());
    }
    Ok(())
}

/// Show a derived secret.
///
/// Text output prints each value, lossily decoded as UTF-8.
pub fn secret(globals: &Globals, id: &str, json: bool) -> Result<()> {
    let ctx = Context::load(globals)?;
    let id: ResourceId = id.parse()?;
    let secret = ctx.store.get_secret(&id)?.ok_or_else(|| StoreError::NotFound {
        kind: "Secret",
        id: id.to_string(),
    })?;
    debug!(secret = %id, fields = secret.data.len(), "loaded secret");

    if json {
        return output::json(&secret);
    }

    if secret.data.is_empty() {
        output::dimmed("no fields");
    }
    for (field, value) in &secret.data {
        output::kv(field, String::from_utf8_lossy(value));
    }
    Ok(())
}
