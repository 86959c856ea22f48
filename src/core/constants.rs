//! Constants used throughout cryptctl.
//!
//! Centralizes annotation keys, well-known resource names and environment
//! variables.

/// API group/version of the encrypted and decrypted secret kinds.
pub const API_VERSION: &str = "secrets.opensecrecy.org/v1alpha1";

/// Kind name of the source resource.
pub const ENCRYPTED_SECRET_KIND: &str = "EncryptedSecret";

/// Kind name of the transient plaintext projection.
pub const DECRYPTED_SECRET_KIND: &str = "DecryptedSecret";

/// Kind and API version of the derived plaintext resource.
pub const SECRET_KIND: &str = "Secret";
pub const SECRET_API_VERSION: &str = "v1";

/// Annotation selecting the provider for a record.
pub const PROVIDER_ANNOTATION: &str = "secrets.opensecrecy.org/provider";

/// Annotation marking a record whose plaintext is injected by another actor.
pub const INJECT_ANNOTATION: &str = "secrets.opensecrecy.org/inject-encrypted-secrets";

/// Annotation overriding the remote KMS key for a single record.
pub const KMS_KEY_ANNOTATION: &str = "secrets.opensecrecy.org/kms-key";

/// Stored secret holding the cluster key, looked up in the record's namespace.
pub const CLUSTER_KEY_SECRET: &str = "cryptctl-key";

/// Field of [`CLUSTER_KEY_SECRET`] whose bytes are the key material.
pub const CLUSTER_KEY_FIELD: &str = "tls.crt";

/// Default AWS KMS key reference.
pub const DEFAULT_AWS_KMS_KEY: &str = "alias/cryptctl-key";

/// Environment variable holding the static passphrase.
pub const PASSPHRASE_ENV: &str = "CRYPTCTL_PASSPHRASE";

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "CRYPTCTL_LOG";

/// Configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "cryptctl.toml";

/// Default state file used by the file-backed store.
pub const STATE_FILE: &str = "cryptctl-state.json";

/// Namespace used when a resource id omits one.
pub const DEFAULT_NAMESPACE: &str = "default";
