//! Type aliases for domain concepts.
//!
//! Provides semantic type aliases to make function signatures more descriptive.

/// A field name inside a record's data map (e.g., `password`, `tls.key`).
pub type FieldName = String;

/// A sealed field value: `base64(nonce ++ ciphertext ++ tag)` for local
/// providers, a base64 KMS blob for remote ones.
pub type EncryptedValue = String;

/// A decrypted field value.
pub type PlaintextValue = String;

/// A remote key reference (AWS key id/alias/ARN, GCP resource name).
pub type KeyHandle = String;
