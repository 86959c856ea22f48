//! Decrypt and encrypt commands.
//!
//! Run a provider over manifests without touching the state file.

use std::path::Path;

use tracing::info;

use crate::cli::context::{read_input, Context};
use crate::cli::{output, Globals};
use crate::core::domain::{DecryptedRecord, EncryptedRecord, ObjectMeta};
use crate::core::provider::{Provider, ProviderKind, Providers};
use crate::error::{ProviderError, Result, ValidationError};

fn load_encrypted(path: &Path) -> Result<EncryptedRecord> {
    let record: EncryptedRecord = serde_json::from_str(&read_input(path)?)?;
    record.check_kind()?;
    Ok(record)
}

fn providers_for(ctx: &Context, meta: &ObjectMeta) -> Result<Providers> {
    let prompt = ProviderKind::of(meta) == Some(ProviderKind::Static);
    let passphrase = ctx.passphrase(ctx.config.kdf, prompt)?;
    ctx.providers(passphrase)
}

fn bind(providers: &Providers, meta: &ObjectMeta) -> Result<Option<Provider>> {
    let provider = providers.bind(meta)?;
    if provider.is_none() {
        output::warn(&format!(
            "{} has no usable provider; skipped",
            output::key(meta.id())
        ));
    }
    Ok(provider)
}

/// Decrypt an EncryptedSecret manifest and print the DecryptedSecret.
pub fn decrypt(globals: &Globals, manifest: &Path) -> Result<()> {
    let ctx = Context::load(globals)?;
    let record = load_encrypted(manifest)?;
    let providers = providers_for(&ctx, &record.metadata)?;

    let Some(provider) = bind(&providers, &record.metadata)? else {
        return Ok(());
    };
    let decrypted = provider.decrypt_all(&record)?;
    info!(record = %record.id(), fields = decrypted.data.len(), "decrypted manifest");
    output::json(&decrypted)
}

/// Encrypt a DecryptedSecret manifest and print the EncryptedSecret.
///
/// With `from`, the previous EncryptedSecret is decrypted first so fields
/// whose plaintext is unchanged keep their ciphertext, or, with
/// `re_encrypt`, so every field is sealed afresh from it.
pub fn encrypt(
    globals: &Globals,
    manifest: &Path,
    from: Option<&Path>,
    re_encrypt: bool,
) -> Result<()> {
    let ctx = Context::load(globals)?;
    let mut decrypted: DecryptedRecord = serde_json::from_str(&read_input(manifest)?)?;
    decrypted.check_kind()?;

    let previous = from.map(load_encrypted).transpose()?;
    if let Some(previous) = &previous {
        if previous.id() != decrypted.id() {
            return Err(ValidationError::InvalidResourceId(format!(
                "--from is {} but the manifest is {}",
                previous.id(),
                decrypted.id()
            ))
            .into());
        }
        if decrypted.metadata.uid.is_none() {
            decrypted.metadata.uid = previous.metadata.uid.clone();
        }
    }

    let providers = providers_for(&ctx, &decrypted.metadata)?;
    let Some(provider) = bind(&providers, &decrypted.metadata)? else {
        return Ok(());
    };

    if let Some(previous) = &previous {
        provider.decrypt_all(previous)?;
    } else if re_encrypt {
        return Err(ProviderError::MissingSnapshot(decrypted.id().to_string()).into());
    }

    let encrypted = provider.encrypt_all(&decrypted, re_encrypt)?;
    info!(
        record = %encrypted.id(),
        fields = encrypted.data.len(),
        re_encrypt,
        "encrypted manifest"
    );
    output::json(&encrypted)
}
