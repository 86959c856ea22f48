//! Seal and open commands.
//!
//! Expose the crypto primitive directly, keyed by the static passphrase.

use tracing::info;

use crate::cli::context::Context;
use crate::cli::{output, Globals, KdfChoice};
use crate::core::cipher;
use crate::error::{ProviderError, Result};

fn input(value: Option<String>) -> Result<String> {
    match value {
        Some(value) => Ok(value),
        None => {
            let buf = super::context::read_input(std::path::Path::new("-"))?;
            Ok(buf.trim_end_matches(['\r', '\n']).to_string())
        }
    }
}

/// Seal a value and print the blob.
pub fn seal(globals: &Globals, value: Option<String>, kdf: Option<KdfChoice>) -> Result<()> {
    let ctx = Context::load(globals)?;
    let value = input(value)?;
    let key = ctx
        .required_passphrase(ctx.kdf(kdf))?
        .key()
        .map_err(ProviderError::from)?;

    info!(len = value.len(), "sealing value");
    let blob = cipher::seal(&value, &key).map_err(ProviderError::from)?;
    output::raw(&blob);
    Ok(())
}

/// Open a blob and print the plaintext.
pub fn open(globals: &Globals, blob: Option<String>, kdf: Option<KdfChoice>) -> Result<()> {
    let ctx = Context::load(globals)?;
    let blob = input(blob)?;
    let key = ctx
        .required_passphrase(ctx.kdf(kdf))?
        .key()
        .map_err(ProviderError::from)?;

    let plaintext = cipher::open(blob.trim(), &key).map_err(ProviderError::from)?;
    output::raw(&plaintext);
    Ok(())
}
