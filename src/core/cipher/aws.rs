//! AWS KMS backend.
//!
//! Enable with `--features aws`. Credentials come from an explicit
//! `aws_config::SdkConfig` handed to [`AwsKms::new`]; [`AwsKms::from_env`]
//! builds one from the default provider chain (environment, shared
//! credentials file, instance/pod identity) once at startup.
//!
//! KMS embeds the key id in the ciphertext blob, so decryption does not
//! need the handle.

use aws_sdk_kms::primitives::Blob;
use tracing::trace;

use super::kms::KmsClient;
use crate::error::CipherError;

const SERVICE: &str = "aws-kms";

/// AWS KMS client.
pub struct AwsKms {
    client: aws_sdk_kms::Client,
    runtime: tokio::runtime::Runtime,
}

impl std::fmt::Debug for AwsKms {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsKms").finish_non_exhaustive()
    }
}

fn remote(message: String) -> CipherError {
    CipherError::Remote {
        service: SERVICE,
        message,
    }
}

fn runtime() -> Result<tokio::runtime::Runtime, CipherError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| remote(format!("failed to create runtime: {}", e)))
}

impl AwsKms {
    /// Create a client from an explicit SDK configuration.
    pub fn new(config: &aws_config::SdkConfig) -> Result<Self, CipherError> {
        Ok(Self {
            client: aws_sdk_kms::Client::new(config),
            runtime: runtime()?,
        })
    }

    /// Load the default credential chain and create a client.
    pub fn from_env() -> Result<Self, CipherError> {
        let runtime = runtime()?;
        let config =
            runtime.block_on(aws_config::load_defaults(aws_config::BehaviorVersion::latest()));
        Ok(Self {
            client: aws_sdk_kms::Client::new(&config),
            runtime,
        })
    }
}

impl KmsClient for AwsKms {
    fn name(&self) -> &'static str {
        SERVICE
    }

    fn encrypt(&self, key: &str, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        trace!(key_id = %key, plaintext_len = plaintext.len(), "encrypting with AWS KMS");

        self.runtime.block_on(async {
            let result = self
                .client
                .encrypt()
                .key_id(key)
                .plaintext(Blob::new(plaintext))
                .send()
                .await
                .map_err(|e| remote(format!("KMS encrypt failed: {}", e)))?;

            let blob = result
                .ciphertext_blob()
                .ok_or_else(|| remote("no ciphertext returned".to_string()))?;

            trace!(ciphertext_len = blob.as_ref().len(), "encrypted with AWS KMS");
            Ok(blob.as_ref().to_vec())
        })
    }

    fn decrypt(&self, _key: &str, ciphertext: &[u8]) -> Result<Vec<u8>, CipherError> {
        trace!(ciphertext_len = ciphertext.len(), "decrypting with AWS KMS");

        self.runtime.block_on(async {
            let result = self
                .client
                .decrypt()
                .ciphertext_blob(Blob::new(ciphertext))
                .send()
                .await
                .map_err(|e| remote(format!("KMS decrypt failed: {}", e)))?;

            let plaintext = result
                .plaintext()
                .ok_or_else(|| remote("no plaintext returned".to_string()))?;

            Ok(plaintext.as_ref().to_vec())
        })
    }
}
