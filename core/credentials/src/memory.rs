//! In-memory credential store for testing.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::store::{credential_key, CredentialStore};
use envsecrets_common::{EnvName, Error, Passphrase, Result};

/// In-memory credential store.
///
/// Clones share the same entries. Writes can be made to fail so callers'
/// handling of an unavailable keyring can be exercised.
#[derive(Clone, Default)]
pub struct MemoryCredentialStore {
    entries: Arc<RwLock<HashMap<String, Passphrase>>>,
    fail_writes: bool,
}

impl MemoryCredentialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store whose `set` and `delete` calls always fail.
    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    /// Peek at the cached passphrase text for `env`.
    pub fn cached(&self, env: &EnvName) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .get(&credential_key(env))
            .map(|p| p.expose().to_string())
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, env: &EnvName) -> Result<Option<Passphrase>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(&credential_key(env)).cloned())
    }

    fn set(&self, env: &EnvName, passphrase: &Passphrase) -> Result<()> {
        if self.fail_writes {
            return Err(Error::CredentialStore("keyring is locked".to_string()));
        }
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(credential_key(env), passphrase.clone());
        Ok(())
    }

    fn delete(&self, env: &EnvName) -> Result<()> {
        if self.fail_writes {
            return Err(Error::CredentialStore("keyring is locked".to_string()));
        }
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(&credential_key(env));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(name: &str) -> EnvName {
        EnvName::new(name).unwrap()
    }

    #[test]
    fn test_set_get_delete() {
        let store = MemoryCredentialStore::new();
        let pass = Passphrase::new("correct-horse").unwrap();

        assert!(store.get(&env("prod")).unwrap().is_none());
        store.set(&env("prod"), &pass).unwrap();
        assert_eq!(store.get(&env("prod")).unwrap(), Some(pass));

        store.delete(&env("prod")).unwrap();
        assert!(store.get(&env("prod")).unwrap().is_none());
    }

    #[test]
    fn test_delete_missing_is_ok() {
        let store = MemoryCredentialStore::new();
        assert!(store.delete(&env("prod")).is_ok());
    }

    #[test]
    fn test_entries_are_per_environment() {
        let store = MemoryCredentialStore::new();
        store
            .set(&env("prod"), &Passphrase::new("a").unwrap())
            .unwrap();

        assert!(store.get(&env("dev")).unwrap().is_none());
        assert_eq!(store.cached(&env("prod")).as_deref(), Some("a"));
    }

    #[test]
    fn test_failing_writes() {
        let store = MemoryCredentialStore::failing_writes();
        let result = store.set(&env("prod"), &Passphrase::new("a").unwrap());

        assert!(matches!(result, Err(Error::CredentialStore(_))));
        assert!(matches!(store.delete(&env("prod")), Err(Error::CredentialStore(_))));
        assert!(store.get(&env("prod")).unwrap().is_none());
    }
}
