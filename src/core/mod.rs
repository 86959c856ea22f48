//! Core library components.
//!
//! This module contains the reusable convergence logic: the crypto
//! primitive, key resolvers, providers, the re-encryption cache, the
//! resource store seam and the reconciliation loop.

pub mod cache;
pub mod cipher;
pub mod config;
pub mod constants;
pub mod domain;
pub mod provider;
pub mod reconcile;
pub mod resolver;
pub mod store;
pub mod types;
