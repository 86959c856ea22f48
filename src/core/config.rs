//! Configuration file management.
//!
//! Handles reading and validating `cryptctl.toml`. Every section is
//! optional; a missing file means defaults.
//!
//! ```toml
//! [provider]
//! unknown = "error"        # or "ignore"
//!
//! [kdf]
//! algorithm = "argon2id"   # or "legacy-md5"
//! memory_kib = 19456
//! iterations = 2
//! parallelism = 1
//!
//! [cluster_key]
//! secret = "cryptctl-key"
//! field = "tls.crt"
//!
//! [kms]
//! aws_key = "alias/cryptctl-key"
//! gcp_key = "projects/p/locations/global/keyRings/r/cryptoKeys/k"
//! gcp_account = "deployer@p.iam.gserviceaccount.com"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::cipher::{Kdf, KmsProvider};
use crate::core::constants;
use crate::core::domain::validate_name;
use crate::core::provider::UnknownProviderPolicy;
use crate::error::{ConfigError, Result};

/// Contents of `cryptctl.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub provider: ProviderConfig,
    pub kdf: Kdf,
    pub cluster_key: ClusterKeyConfig,
    pub kms: KmsConfig,
}

/// Provider selection settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    /// What to do with records whose provider annotation is missing or
    /// unrecognized.
    pub unknown: UnknownProviderPolicy,
}

/// Location of the key secret read by the `k8s` provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClusterKeyConfig {
    pub secret: String,
    pub field: String,
}

impl Default for ClusterKeyConfig {
    fn default() -> Self {
        Self {
            secret: constants::CLUSTER_KEY_SECRET.to_string(),
            field: constants::CLUSTER_KEY_FIELD.to_string(),
        }
    }
}

/// Remote key defaults, used when a record has no key annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KmsConfig {
    /// AWS key id, alias or ARN.
    pub aws_key: Option<String>,
    /// GCP key resource name.
    pub gcp_key: Option<String>,
    /// Account passed to gcloud instead of the active one.
    pub gcp_account: Option<String>,
}

impl Default for KmsConfig {
    fn default() -> Self {
        Self {
            aws_key: Some(constants::DEFAULT_AWS_KMS_KEY.to_string()),
            gcp_key: None,
            gcp_account: None,
        }
    }
}

impl Config {
    /// Candidate config paths, most specific first.
    pub fn search_paths(explicit: Option<&Path>, cwd: &Path) -> Vec<PathBuf> {
        if let Some(path) = explicit {
            return vec![path.to_path_buf()];
        }
        let mut paths = vec![cwd.join(constants::CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("cryptctl").join("config.toml"));
        }
        paths
    }

    /// Load the first config file found, or defaults.
    ///
    /// An explicit path must exist; the implicit locations are optional.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadFile` if an explicit path cannot be read,
    /// `ConfigError::Parse` for malformed TOML, or `ConfigError::Invalid`
    /// if validation fails.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        let cwd = std::env::current_dir()?;
        match Self::search_paths(None, &cwd)
            .into_iter()
            .find(|path| path.is_file())
        {
            Some(path) => Self::load_from(&path),
            None => {
                debug!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load and validate a specific file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read, parsed or validated.
    pub fn load_from(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading config");
        let contents = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse(&contents)
    }

    /// Parse and validate TOML text.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` or `ConfigError::Invalid`.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).map_err(ConfigError::Parse)?;
        config.validate()?;
        debug!(
            unknown = ?config.provider.unknown,
            kdf = config.kdf.name(),
            "config loaded"
        );
        Ok(config)
    }

    /// Validate the configuration contents.
    ///
    /// Checks:
    /// - KDF cost parameters are in range
    /// - The cluster key secret name is a valid resource name
    /// - KMS key defaults match the backend they configure
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` on validation failure.
    pub fn validate(&self) -> Result<()> {
        self.kdf
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("kdf: {}", e)))?;

        validate_name(&self.cluster_key.secret)
            .map_err(|e| ConfigError::Invalid(format!("cluster_key.secret: {}", e)))?;
        if self.cluster_key.field.trim().is_empty() {
            return Err(ConfigError::Invalid("cluster_key.field is empty".to_string()).into());
        }

        if let Some(key) = &self.kms.aws_key {
            if KmsProvider::detect(key) != Some(KmsProvider::Aws) {
                return Err(ConfigError::Invalid(format!(
                    "kms.aws_key {:?} is not an AWS key id, alias or ARN",
                    key
                ))
                .into());
            }
        }
        if let Some(key) = &self.kms.gcp_key {
            if KmsProvider::detect(key) != Some(KmsProvider::Gcp) {
                return Err(ConfigError::Invalid(format!(
                    "kms.gcp_key {:?} is not a GCP key resource name",
                    key
                ))
                .into());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.provider.unknown, UnknownProviderPolicy::Error);
        assert_eq!(config.kdf.name(), "argon2id");
        assert_eq!(config.cluster_key.secret, "cryptctl-key");
        assert_eq!(config.cluster_key.field, "tls.crt");
        assert_eq!(config.kms.aws_key.as_deref(), Some("alias/cryptctl-key"));
    }

    #[test]
    fn test_full_config() {
        let config = Config::parse(
            r#"
[provider]
unknown = "ignore"

[kdf]
algorithm = "legacy-md5"

[cluster_key]
secret = "app-key"
field = "key"

[kms]
aws_key = "arn:aws:kms:us-east-1:123456789012:key/abc"
gcp_key = "projects/p/locations/global/keyRings/r/cryptoKeys/k"
"#,
        )
        .unwrap();

        assert_eq!(config.provider.unknown, UnknownProviderPolicy::Ignore);
        assert_eq!(config.kdf, Kdf::LegacyMd5);
        assert_eq!(config.cluster_key.secret, "app-key");
        assert!(config.kms.gcp_key.is_some());
    }

    #[test]
    fn test_malformed_toml() {
        let err = Config::parse("this is not valid toml { [ }").unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Parse(_))));
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(Config::parse("[provider]\nfallback = \"static\"\n").is_err());
    }

    #[test]
    fn test_invalid_values() {
        assert!(Config::parse("[provider]\nunknown = \"maybe\"\n").is_err());
        assert!(Config::parse("[kdf]\nalgorithm = \"argon2id\"\nmemory_kib = 1\n").is_err());
        assert!(Config::parse("[cluster_key]\nsecret = \"Bad_Name\"\n").is_err());
        assert!(Config::parse("[kms]\naws_key = \"projects/p/locations/l/keyRings/r/cryptoKeys/k\"\n").is_err());
        assert!(Config::parse("[kms]\ngcp_key = \"alias/foo\"\n").is_err());
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let tmp = TempDir::new().unwrap();
        let err = Config::load(Some(&tmp.path().join("missing.toml"))).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::ReadFile(_))));
    }

    #[test]
    fn test_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cryptctl.toml");
        std::fs::write(&path, "[provider]\nunknown = \"ignore\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.provider.unknown, UnknownProviderPolicy::Ignore);
    }

    #[test]
    fn test_search_paths() {
        let cwd = Path::new("/work");
        let paths = Config::search_paths(None, cwd);
        assert_eq!(paths[0], cwd.join("cryptctl.toml"));

        let explicit = Path::new("/etc/cryptctl.toml");
        assert_eq!(
            Config::search_paths(Some(explicit), cwd),
            vec![explicit.to_path_buf()]
        );
    }
}
