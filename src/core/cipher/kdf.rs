//! Key derivation.
//!
//! Maps key material of any length (a passphrase, the bytes of a stored
//! key) to a fixed-length [`SymmetricKey`]. Derivation is deterministic: the
//! same material always yields the same key, so values sealed in one pass
//! open in the next.

use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::aead::{SymmetricKey, KEY_SIZE};
use crate::error::CipherError;

/// Fixed salt for passphrase derivation.
///
/// Key material is shared out of band and has no place to carry a per-value
/// salt, so the salt is a domain separator rather than a secret.
const ARGON2_SALT: &[u8] = b"cryptctl/v1/aes-256-gcm";

/// Key derivation function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "kebab-case")]
pub enum Kdf {
    /// Argon2id with the given cost parameters.
    Argon2id {
        #[serde(default = "default_memory_kib")]
        memory_kib: u32,
        #[serde(default = "default_iterations")]
        iterations: u32,
        #[serde(default = "default_parallelism")]
        parallelism: u32,
    },
    /// Lowercase hex MD5 of the material used directly as the 32-byte key.
    ///
    /// Weak: unsalted, fast, 128 bits of entropy at most. Only for opening
    /// values sealed by older tooling.
    LegacyMd5,
}

fn default_memory_kib() -> u32 {
    Params::DEFAULT_M_COST
}

fn default_iterations() -> u32 {
    Params::DEFAULT_T_COST
}

fn default_parallelism() -> u32 {
    Params::DEFAULT_P_COST
}

impl Default for Kdf {
    fn default() -> Self {
        Self::Argon2id {
            memory_kib: default_memory_kib(),
            iterations: default_iterations(),
            parallelism: default_parallelism(),
        }
    }
}

impl Kdf {
    /// Display name, matching the `algorithm` config value.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Argon2id { .. } => "argon2id",
            Self::LegacyMd5 => "legacy-md5",
        }
    }

    /// Check the cost parameters without deriving anything.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::KeyDerivation` if the Argon2 parameters are
    /// out of range.
    pub fn validate(&self) -> Result<(), CipherError> {
        if let Self::Argon2id {
            memory_kib,
            iterations,
            parallelism,
        } = *self
        {
            Params::new(memory_kib, iterations, parallelism, Some(KEY_SIZE))
                .map_err(|e| CipherError::KeyDerivation(format!("argon2 params: {}", e)))?;
        }
        Ok(())
    }

    /// Derive a symmetric key from raw key material.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::KeyDerivation` if the Argon2 parameters are
    /// out of range.
    pub fn derive(&self, material: &[u8]) -> Result<SymmetricKey, CipherError> {
        debug!(kdf = self.name(), material_len = material.len(), "deriving key");

        let mut out = [0u8; KEY_SIZE];
        match *self {
            Self::Argon2id {
                memory_kib,
                iterations,
                parallelism,
            } => {
                let params = Params::new(memory_kib, iterations, parallelism, Some(KEY_SIZE))
                    .map_err(|e| CipherError::KeyDerivation(format!("argon2 params: {}", e)))?;
                Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
                    .hash_password_into(material, ARGON2_SALT, &mut out)
                    .map_err(|e| CipherError::KeyDerivation(format!("argon2: {}", e)))?;
            }
            Self::LegacyMd5 => {
                warn!("using legacy MD5 key derivation");
                let hex = format!("{:x}", md5::compute(material));
                out.copy_from_slice(hex.as_bytes());
            }
        }

        Ok(SymmetricKey::from_bytes(out))
    }
}

/// Cheap Argon2 parameters for unit tests.
#[cfg(test)]
pub(crate) fn test_kdf() -> Kdf {
    Kdf::Argon2id {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    }
}
