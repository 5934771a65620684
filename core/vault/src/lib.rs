//! Vault engine for envsecrets.
//!
//! This module provides:
//! - The in-memory vault aggregate and its persisted form
//! - Passphrase resolution (override, keyring cache, prompt)
//! - Vault lifecycle against a storage provider
//! - Passphrase rotation
//!
//! # Architecture
//! The vault module sits between the command line and the storage and
//! credential providers. Entry values are only ever handled as envelopes
//! here; plaintext exists transiently in callers.

pub mod config;
pub mod manager;
pub mod resolver;
pub mod rotation;
pub mod vault;

pub use config::{StoreConfig, VaultMeta, VaultVersion, DEFAULT_PASSPHRASE_ENV};
pub use manager::{DestroyOutcome, VaultStore};
pub use resolver::{PassphraseResolver, Prompter, ScriptedPrompter};
pub use rotation::RotationReport;
pub use vault::{Entry, Vault, VaultFile};

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use envsecrets_credentials::MemoryCredentialStore;
    use envsecrets_crypto::KdfParams;
    use envsecrets_storage::MemoryProvider;

    use crate::{PassphraseResolver, ScriptedPrompter, VaultStore};

    /// KDF parameters small enough to keep tests fast.
    pub fn cheap_kdf() -> KdfParams {
        KdfParams {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
        }
    }

    /// A store wired to in-memory fakes, with handles to each of them.
    pub struct Harness {
        pub store: VaultStore,
        pub provider: MemoryProvider,
        pub credentials: MemoryCredentialStore,
        pub prompter: ScriptedPrompter,
    }

    pub fn harness() -> Harness {
        harness_with(MemoryCredentialStore::new(), None)
    }

    pub fn harness_with(credentials: MemoryCredentialStore, override_passphrase: Option<&str>) -> Harness {
        let provider = MemoryProvider::new();
        let prompter = ScriptedPrompter::default();
        let resolver = PassphraseResolver::new(
            override_passphrase.map(|p| envsecrets_common::Passphrase::new(p).unwrap()),
            Arc::new(credentials.clone()),
            Arc::new(prompter.clone()),
        );
        let store = VaultStore::new(Arc::new(provider.clone()), resolver, cheap_kdf());
        Harness {
            store,
            provider,
            credentials,
            prompter,
        }
    }
}
