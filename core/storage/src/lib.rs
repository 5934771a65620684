//! Vault file persistence for envsecrets.
//!
//! This module provides a trait-based interface for where serialized vaults
//! live, keyed by environment name, plus two implementations: the local
//! filesystem and an in-memory provider for tests.
//!
//! # Design Principles
//! - Providers move opaque bytes; they never parse or decrypt vault content
//! - Replacing an existing vault is atomic
//! - Creating a vault never clobbers an existing one

pub mod local;
pub mod memory;
pub mod provider;

pub use local::{LocalProvider, DEFAULT_VAULT_DIR, VAULT_EXTENSION};
pub use memory::MemoryProvider;
pub use provider::StorageProvider;
