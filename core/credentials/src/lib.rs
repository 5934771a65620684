//! Passphrase caching in an OS credential store.
//!
//! The vault layer talks to a [`CredentialStore`] capability rather than to
//! the OS keyring directly, so tests can swap in [`MemoryCredentialStore`].
//! Entries are keyed by service name plus `env:<environment>`.

pub mod keyring_store;
pub mod memory;
pub mod store;

pub use keyring_store::{KeyringStore, DEFAULT_SERVICE};
pub use memory::MemoryCredentialStore;
pub use store::{credential_key, CredentialStore};
