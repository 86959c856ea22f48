//! Domain types.

mod meta;
mod record;
mod secret;
mod status;

pub use meta::{validate_name, ObjectMeta, OwnerReference, ResourceId};
pub use record::{DecryptedRecord, EncryptedRecord};
pub use secret::Secret;
pub use status::{ReconciliationStatus, StatusState};
