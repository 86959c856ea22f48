//! Error types.
//!
//! Errors are layered: each subsystem has its own enum and the top-level
//! [`Error`] wraps them so `?` works across module boundaries.
//!
//! - [`CipherError`]: sealing, opening and remote key-service calls
//! - [`KeyError`]: key material could not be obtained
//! - [`ProviderError`]: a provider failed to decrypt or encrypt a record
//! - [`StoreError`]: resource store reads and writes
//! - [`ConfigError`]: loading and validating `cryptctl.toml`

use thiserror::Error;

/// Top-level error.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),
}

/// Errors from the crypto primitive and remote key services.
#[derive(Error, Debug)]
pub enum CipherError {
    /// Ciphertext failed the integrity check or is malformed.
    ///
    /// Covers bad base64, truncated blobs, tag mismatch (wrong key or
    /// tampering) and plaintext that is not valid UTF-8.
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// The remote key-management service returned an error.
    #[error("{service} error: {message}")]
    Remote {
        service: &'static str,
        message: String,
    },
}

/// Key material could not be resolved.
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("key unavailable: {0}")]
    Unavailable(String),

    #[error("key unavailable: {context}: {source}")]
    Store {
        context: String,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Derivation(#[from] CipherError),
}

/// Provider failures, wrapping key and cipher errors.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error(transparent)]
    Key(#[from] KeyError),

    #[error("field {field}: {source}")]
    Field {
        field: String,
        #[source]
        source: CipherError,
    },

    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error("unknown provider: {0:?}")]
    UnknownProvider(String),

    #[error("no provider annotation on {0}")]
    MissingProvider(String),

    #[error("{0} support not compiled. Rebuild with: cargo install cryptctl --features {1}")]
    NotCompiled(&'static str, &'static str),

    #[error("no decrypted snapshot for {0}; decrypt it before re-encrypting")]
    MissingSnapshot(String),
}

/// Resource store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("write rejected for {kind} {id}: {reason}")]
    WriteRejected {
        kind: &'static str,
        id: String,
        reason: String,
    },

    #[error("failed to read state file: {0}")]
    Read(#[source] std::io::Error),

    #[error("failed to write state file: {0}")]
    Write(#[source] std::io::Error),

    #[error("corrupt state file: {0}")]
    Corrupt(#[source] serde_json::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("passphrase not set: export {0} or run interactively")]
    MissingPassphrase(&'static str),
}

/// Input validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("invalid resource id {0:?}: expected <namespace>/<name> or <name>")]
    InvalidResourceId(String),

    #[error("invalid name {0:?}: {1}")]
    InvalidName(String, &'static str),

    #[error("unexpected manifest kind {found:?}, expected {expected}")]
    UnexpectedKind {
        expected: &'static str,
        found: String,
    },

    #[error("owner reference rejected: {0}")]
    OwnerReference(String),
}

pub type Result<T> = std::result::Result<T, Error>;
