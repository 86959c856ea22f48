//! Shared command setup.
//!
//! Loads the config, opens the state file and wires providers the same way
//! for every command.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use dialoguer::Password;
use tracing::debug;

use crate::cli::{Globals, KdfChoice};
use crate::core::cipher::Kdf;
use crate::core::config::Config;
use crate::core::constants;
use crate::core::provider::Providers;
use crate::core::reconcile::Reconciler;
use crate::core::resolver::{ClusterSecretKey, StaticPassphrase};
use crate::core::store::{FileStore, ResourceStore};
use crate::error::{ConfigError, Result};

/// Config and store for one invocation.
pub struct Context {
    pub config: Config,
    pub store: Arc<dyn ResourceStore>,
}

impl Context {
    /// # Errors
    ///
    /// Returns `ConfigError` if the config file is unreadable or invalid.
    pub fn load(globals: &Globals) -> Result<Self> {
        let config = Config::load(globals.config.as_deref())?;
        debug!(state = %globals.state.display(), "opening state file");
        Ok(Self {
            config,
            store: Arc::new(FileStore::new(&globals.state)),
        })
    }

    /// KDF from config, with an optional command-line override.
    pub fn kdf(&self, choice: Option<KdfChoice>) -> Kdf {
        match (choice, self.config.kdf) {
            (None, kdf) => kdf,
            (Some(KdfChoice::LegacyMd5), _) => Kdf::LegacyMd5,
            (Some(KdfChoice::Argon2id), kdf @ Kdf::Argon2id { .. }) => kdf,
            (Some(KdfChoice::Argon2id), Kdf::LegacyMd5) => Kdf::default(),
        }
    }

    /// Static passphrase resolver.
    ///
    /// Uses `CRYPTCTL_PASSPHRASE` when set. Otherwise, with `prompt` and a
    /// terminal on stdin, asks for it; without a terminal the variable is
    /// read lazily and resolution fails if it stays unset.
    ///
    /// # Errors
    ///
    /// Returns an error if the prompt fails.
    pub fn passphrase(&self, kdf: Kdf, prompt: bool) -> Result<StaticPassphrase> {
        if std::env::var_os(constants::PASSPHRASE_ENV).is_some()
            || !prompt
            || !atty::is(atty::Stream::Stdin)
        {
            return Ok(StaticPassphrase::from_env(kdf));
        }

        let passphrase = Password::new()
            .with_prompt("Passphrase")
            .interact()?;
        Ok(StaticPassphrase::fixed(passphrase, kdf))
    }

    /// Passphrase required up front, for the raw primitive.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingPassphrase` if neither the variable nor
    /// a terminal is available.
    pub fn required_passphrase(&self, kdf: Kdf) -> Result<StaticPassphrase> {
        if std::env::var_os(constants::PASSPHRASE_ENV).is_none() && !atty::is(atty::Stream::Stdin)
        {
            return Err(ConfigError::MissingPassphrase(constants::PASSPHRASE_ENV).into());
        }
        self.passphrase(kdf, true)
    }

    /// Provider registry wired from config.
    ///
    /// # Errors
    ///
    /// Returns an error if a compiled-in remote backend cannot start.
    pub fn providers(&self, passphrase: StaticPassphrase) -> Result<Providers> {
        let cluster_key = ClusterSecretKey::new(Arc::clone(&self.store), self.config.kdf)
            .with_location(&self.config.cluster_key.secret, &self.config.cluster_key.field);

        #[allow(unused_mut)]
        let mut providers = Providers::new(passphrase, cluster_key)
            .with_unknown_policy(self.config.provider.unknown);

        #[cfg(feature = "test-kms")]
        {
            use crate::core::cipher::kms::StubKms;
            use crate::core::cipher::KmsProvider;
            use crate::core::resolver::RemoteManagedKey;

            debug!("using stub KMS for remote providers");
            let stub = Arc::new(StubKms::new());
            providers = providers
                .with_remote(
                    KmsProvider::Aws,
                    stub.clone(),
                    RemoteManagedKey::new(self.config.kms.aws_key.clone()),
                )
                .with_remote(
                    KmsProvider::Gcp,
                    stub,
                    RemoteManagedKey::new(self.config.kms.gcp_key.clone()),
                );
        }

        #[cfg(all(feature = "aws", not(feature = "test-kms")))]
        {
            use crate::core::cipher::aws::AwsKms;
            use crate::core::cipher::KmsProvider;
            use crate::core::resolver::RemoteManagedKey;
            use crate::error::ProviderError;

            let client = AwsKms::from_env().map_err(ProviderError::from)?;
            providers = providers.with_remote(
                KmsProvider::Aws,
                Arc::new(client),
                RemoteManagedKey::new(self.config.kms.aws_key.clone()),
            );
        }

        #[cfg(all(feature = "gcp", not(feature = "test-kms")))]
        {
            use crate::core::cipher::gcp::GcpKms;
            use crate::core::cipher::KmsProvider;
            use crate::core::resolver::RemoteManagedKey;

            match GcpKms::new(self.config.kms.gcp_account.clone()) {
                Ok(client) => {
                    providers = providers.with_remote(
                        KmsProvider::Gcp,
                        Arc::new(client),
                        RemoteManagedKey::new(self.config.kms.gcp_key.clone()),
                    );
                }
                Err(e) => debug!(error = %e, "GCP KMS unavailable"),
            }
        }

        Ok(providers)
    }

    /// Reconciler over the state file.
    ///
    /// # Errors
    ///
    /// Returns an error if providers cannot be wired.
    pub fn reconciler(&self) -> Result<Reconciler> {
        let passphrase = self.passphrase(self.config.kdf, false)?;
        Ok(Reconciler::new(
            Arc::clone(&self.store),
            self.providers(passphrase)?,
        ))
    }
}

/// Read a manifest or value from a path, `-` meaning stdin.
///
/// # Errors
///
/// Returns `Error::Io` if reading fails.
pub fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    Ok(std::fs::read_to_string(path)?)
}
