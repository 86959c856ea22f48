//! cryptctl - Converge encrypted secret records into plaintext secrets.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── cli/              # Command-line interface
//! │   ├── seal          # seal/open single values
//! │   ├── manifest      # decrypt/encrypt manifests
//! │   ├── apply         # store manifests
//! │   ├── reconcile     # run convergence passes
//! │   ├── inspect       # status and derived secrets
//! │   └── completions   # Shell completions
//! └── core/             # Core library components
//!     ├── config        # cryptctl.toml management
//!     ├── cipher/       # AES-256-GCM, key derivation, remote KMS
//!     ├── resolver      # Key material resolvers
//!     ├── provider      # Provider selection, decrypt_all/encrypt_all
//!     ├── cache         # Re-encryption cache
//!     ├── store/        # Resource store trait and implementations
//!     ├── reconcile     # Convergence loop
//!     └── domain/       # Records, secrets, metadata, status
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use cryptctl::core::cipher::Kdf;
//! use cryptctl::core::domain::ResourceId;
//! use cryptctl::core::provider::Providers;
//! use cryptctl::core::reconcile::Reconciler;
//! use cryptctl::core::resolver::{ClusterSecretKey, StaticPassphrase};
//! use cryptctl::core::store::{MemoryStore, ResourceStore};
//!
//! # fn main() -> cryptctl::error::Result<()> {
//! let store: Arc<dyn ResourceStore> = Arc::new(MemoryStore::new());
//! let providers = Providers::new(
//!     StaticPassphrase::from_env(Kdf::default()),
//!     ClusterSecretKey::new(store.clone(), Kdf::default()),
//! );
//! let reconciler = Reconciler::new(store, providers);
//! let id: ResourceId = "default/db-creds".parse()?;
//! let outcome = reconciler.reconcile(&id)?;
//! println!("{} (requeue: {})", outcome.state, outcome.requeue);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod core;
pub mod error;
