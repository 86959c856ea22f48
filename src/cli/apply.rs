//! Apply command.
//!
//! Stores an EncryptedSecret or Secret manifest in the state file.

use std::path::Path;

use serde_json::Value;
use tracing::info;

use crate::cli::context::{read_input, Context};
use crate::cli::{output, Globals};
use crate::core::constants;
use crate::core::domain::{EncryptedRecord, Secret};
use crate::error::{Result, ValidationError};

/// Store a manifest, dispatching on its `kind`.
pub fn execute(globals: &Globals, manifest: &Path) -> Result<()> {
    let ctx = Context::load(globals)?;
    let value: Value = serde_json::from_str(&read_input(manifest)?)?;
    let kind = value
        .get("kind")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    match kind.as_str() {
        constants::ENCRYPTED_SECRET_KIND => {
            let record: EncryptedRecord = serde_json::from_value(value)?;
            let stored = ctx.store.put_encrypted(record)?;
            info!(record = %stored.id(), "stored encrypted record");
            output::success(&format!(
                "applied {} {}",
                constants::ENCRYPTED_SECRET_KIND,
                output::key(stored.id())
            ));
        }
        constants::SECRET_KIND => {
            let secret: Secret = serde_json::from_value(value)?;
            let id = secret.id();
            let applied = ctx.store.apply_secret(secret)?;
            info!(secret = %id, %applied, "stored secret");
            output::success(&format!(
                "{} {} {}",
                applied,
                constants::SECRET_KIND,
                output::key(id)
            ));
        }
        _ => {
            return Err(ValidationError::UnexpectedKind {
                expected: "EncryptedSecret or Secret",
                found: kind,
            }
            .into())
        }
    }
    Ok(())
}
