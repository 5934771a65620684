//! Vault lifecycle against a storage provider.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{StoreConfig, VaultMeta};
use crate::resolver::{PassphraseResolver, Prompter};
use crate::vault::{Vault, VaultFile};
use envsecrets_common::{EnvName, Error, Passphrase, Result};
use envsecrets_credentials::KeyringStore;
use envsecrets_crypto::KdfParams;
use envsecrets_storage::{LocalProvider, StorageProvider};

/// Result of a destroy request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyOutcome {
    /// The vault file was removed.
    Destroyed,
    /// The operator declined the confirmation. Nothing was removed.
    Cancelled,
}

/// Creates, opens, saves and destroys vaults.
pub struct VaultStore {
    provider: Arc<dyn StorageProvider>,
    resolver: PassphraseResolver,
    kdf: KdfParams,
}

impl VaultStore {
    /// Create a store over `provider`.
    ///
    /// `kdf` applies to vaults created or rotated through this store.
    /// Existing vaults keep the parameters recorded in their metadata.
    pub fn new(provider: Arc<dyn StorageProvider>, resolver: PassphraseResolver, kdf: KdfParams) -> Self {
        Self {
            provider,
            resolver,
            kdf,
        }
    }

    /// Create a store over the local filesystem and the OS keyring.
    pub fn local(config: &StoreConfig, prompter: Arc<dyn Prompter>) -> Self {
        let provider = Arc::new(LocalProvider::new(&config.root));
        let credentials = Arc::new(KeyringStore::new(config.keyring_service.clone()));
        let resolver = PassphraseResolver::from_env_var(&config.passphrase_env, credentials, prompter);
        Self::new(provider, resolver, config.kdf)
    }

    /// The passphrase resolver in use.
    pub fn resolver(&self) -> &PassphraseResolver {
        &self.resolver
    }

    /// KDF parameters for new vaults.
    pub fn kdf(&self) -> &KdfParams {
        &self.kdf
    }

    /// Where the vault for `env` lives.
    pub fn location(&self, env: &EnvName) -> String {
        self.provider.location(env)
    }

    /// Check whether a vault exists for `env`. Never reads its content.
    pub fn exists(&self, env: &EnvName) -> Result<bool> {
        self.provider.exists(env)
    }

    /// Create an empty vault for `env` and return it open.
    ///
    /// The passphrase is chosen at a confirmed prompt unless an override
    /// is configured, in which case the override is used. A prompted
    /// passphrase replaces whatever was cached for `env`.
    ///
    /// # Errors
    /// - `AlreadyExists` if a vault for `env` exists
    /// - `InvalidInput` if the passphrase is empty or not confirmed
    pub fn create(&self, env: &EnvName) -> Result<Vault> {
        if self.provider.exists(env)? {
            return Err(Error::AlreadyExists(format!(
                "vault for environment {:?} already exists at {}",
                env.as_str(),
                self.provider.location(env)
            )));
        }

        let passphrase = match self.resolver.override_passphrase() {
            Some(passphrase) => passphrase.clone(),
            None => self.resolver.prompt_new(env)?,
        };

        let meta = VaultMeta::new(env.clone(), &passphrase, self.kdf)?;
        let file = VaultFile::new(meta);
        self.provider.create(env, &file.to_bytes()?)?;
        self.remember(env, &passphrase);

        info!("Created vault for environment {}", env);
        Ok(Vault::from_parts(file, self.provider.location(env), passphrase))
    }

    /// Open the vault for `env` with a resolved and verified passphrase.
    ///
    /// On a wrong passphrase the cached credential for `env` is evicted
    /// so the next attempt prompts again.
    ///
    /// # Errors
    /// - `NotFound` if no vault exists for `env`
    /// - `Corrupt` if the file does not parse or belongs to another environment
    /// - `AuthenticationFailed` if the passphrase does not match
    pub fn open(&self, env: &EnvName) -> Result<Vault> {
        if !self.provider.exists(env)? {
            return Err(Error::NotFound(format!(
                "no vault for environment {:?}; run init first",
                env.as_str()
            )));
        }

        let passphrase = self.resolver.resolve(env)?;
        let file = self.load(env)?;

        if !file.meta.verify_passphrase(&passphrase)? {
            if let Err(e) = self.resolver.forget(env) {
                warn!("Failed to evict cached passphrase for {}: {}", env, e);
            }
            return Err(Error::AuthenticationFailed(format!(
                "invalid passphrase for environment {:?}",
                env.as_str()
            )));
        }

        debug!("Opened vault for environment {} with {} entries", env, file.entries.len());
        Ok(Vault::from_parts(file, self.provider.location(env), passphrase))
    }

    /// Persist the whole vault, replacing its stored content.
    pub fn save(&self, vault: &Vault) -> Result<()> {
        self.provider.upload(vault.environment(), &vault.file.to_bytes()?)?;
        debug!("Saved vault for environment {}", vault.environment());
        Ok(())
    }

    /// Permanently remove the vault for `env`.
    ///
    /// The cached passphrase is cleared first and a fresh passphrase is
    /// prompted for and verified, then the operator must confirm.
    ///
    /// # Errors
    /// - `NotFound` if no vault exists for `env`
    /// - `AuthenticationFailed` if the fresh passphrase does not match
    pub fn destroy(&self, env: &EnvName) -> Result<DestroyOutcome> {
        if !self.provider.exists(env)? {
            return Err(Error::NotFound(format!(
                "no vault for environment {:?}",
                env.as_str()
            )));
        }

        if let Err(e) = self.resolver.forget(env) {
            warn!("Failed to evict cached passphrase for {}: {}", env, e);
        }
        let file = self.load(env)?;

        let passphrase = self.resolver.prompt_fresh(&format!(
            "Enter passphrase for environment {:?} to confirm destruction:",
            env.as_str()
        ))?;
        if !file.meta.verify_passphrase(&passphrase)? {
            return Err(Error::AuthenticationFailed(format!(
                "invalid passphrase for environment {:?}",
                env.as_str()
            )));
        }

        let question = format!(
            "Permanently delete the vault for {:?} at {}?",
            env.as_str(),
            self.provider.location(env)
        );
        if !self.resolver.confirm(&question)? {
            debug!("Destroy of {} declined", env);
            return Ok(DestroyOutcome::Cancelled);
        }

        self.provider.delete(env)?;
        info!("Destroyed vault for environment {}", env);
        Ok(DestroyOutcome::Destroyed)
    }

    /// Remove the cached passphrase for `env`. A missing entry is not an error.
    pub fn clear_cache(&self, env: &EnvName) -> Result<()> {
        self.resolver.forget(env)?;
        debug!("Cleared cached passphrase for {}", env);
        Ok(())
    }

    /// Cache `passphrase` for `env` unless an override is configured.
    pub(crate) fn remember(&self, env: &EnvName, passphrase: &Passphrase) {
        if self.resolver.override_passphrase().is_none() {
            self.resolver.remember(env, passphrase);
        }
    }

    pub(crate) fn provider(&self) -> &Arc<dyn StorageProvider> {
        &self.provider
    }

    fn load(&self, env: &EnvName) -> Result<VaultFile> {
        let bytes = self.provider.download(env)?;
        let file = VaultFile::from_bytes(&bytes)?;
        if &file.meta.environment != env {
            return Err(Error::Corrupt(format!(
                "vault at {} belongs to environment {:?}, not {:?}",
                self.provider.location(env),
                file.meta.environment.as_str(),
                env.as_str()
            )));
        }
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{cheap_kdf, harness, harness_with};
    use envsecrets_credentials::{CredentialStore, MemoryCredentialStore};
    use tempfile::TempDir;

    fn env(name: &str) -> EnvName {
        EnvName::new(name).unwrap()
    }

    fn create_prod(h: &crate::testing::Harness) -> Vault {
        h.prompter.push_passphrase("correct-horse");
        h.prompter.push_passphrase("correct-horse");
        h.store.create(&env("prod")).unwrap()
    }

    #[test]
    fn test_create_save_reload_round_trip() {
        let h = harness();
        let mut vault = create_prod(&h);

        let ct = vault.encrypt_value(b"abc123").unwrap();
        vault.set_entry("API_KEY", ct).unwrap();
        h.store.save(&vault).unwrap();

        h.prompter.push_passphrase("correct-horse");
        let reopened = h.store.open(&env("prod")).unwrap();

        let plain = reopened.decrypt_entry("API_KEY").unwrap();
        assert_eq!(plain.as_bytes(), b"abc123");
        assert_eq!(reopened.meta().salt, vault.meta().salt);
    }

    #[test]
    fn test_create_replaces_stale_cache() {
        let creds = MemoryCredentialStore::new();
        creds
            .set(&env("prod"), &Passphrase::new("old-pass").unwrap())
            .unwrap();
        let h = harness_with(creds.clone(), None);
        create_prod(&h);

        assert_eq!(creds.cached(&env("prod")).as_deref(), Some("correct-horse"));

        h.store.open(&env("prod")).unwrap();
        assert_eq!(h.prompter.asked().len(), 2);
    }

    #[test]
    fn test_create_with_override_does_not_cache() {
        let h = harness_with(MemoryCredentialStore::new(), Some("from-env"));
        h.store.create(&env("prod")).unwrap();

        assert!(h.credentials.cached(&env("prod")).is_none());
    }

    #[test]
    fn test_create_twice_fails() {
        let h = harness();
        create_prod(&h);

        let result = h.store.create(&env("prod"));
        assert!(matches!(result, Err(Error::AlreadyExists(_))));
    }

    #[test]
    fn test_create_with_mismatched_confirmation_writes_nothing() {
        let h = harness();
        h.prompter.push_passphrase("one");
        h.prompter.push_passphrase("two");

        let result = h.store.create(&env("prod"));

        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert!(!h.store.exists(&env("prod")).unwrap());
    }

    #[test]
    fn test_create_uses_override() {
        let h = harness_with(MemoryCredentialStore::new(), Some("from-env"));

        let vault = h.store.create(&env("prod")).unwrap();

        assert!(h.prompter.asked().is_empty());
        assert!(vault.meta().verify_passphrase(vault.passphrase()).unwrap());
        assert_eq!(vault.passphrase().expose(), "from-env");
    }

    #[test]
    fn test_open_missing_vault() {
        let h = harness();

        let result = h.store.open(&env("prod"));
        assert!(matches!(result, Err(Error::NotFound(_))));
        assert!(h.prompter.asked().is_empty());
    }

    #[test]
    fn test_open_caches_prompted_passphrase() {
        let h = harness();
        create_prod(&h);
        h.store.clear_cache(&env("prod")).unwrap();

        h.prompter.push_passphrase("correct-horse");
        h.store.open(&env("prod")).unwrap();

        assert_eq!(h.credentials.cached(&env("prod")).as_deref(), Some("correct-horse"));

        // Second open is served from the cache.
        h.store.open(&env("prod")).unwrap();
        assert_eq!(h.prompter.asked().len(), 3);
    }

    #[test]
    fn test_wrong_passphrase_then_correct() {
        let h = harness();
        create_prod(&h);
        h.store.clear_cache(&env("prod")).unwrap();

        h.prompter.push_passphrase("wrong");
        let result = h.store.open(&env("prod"));
        assert!(matches!(result, Err(Error::AuthenticationFailed(_))));
        assert!(h.credentials.cached(&env("prod")).is_none());

        h.prompter.push_passphrase("correct-horse");
        assert!(h.store.open(&env("prod")).is_ok());
    }

    #[test]
    fn test_stale_cache_is_evicted() {
        let creds = MemoryCredentialStore::new();
        let h = harness_with(creds.clone(), None);
        create_prod(&h);
        creds
            .set(&env("prod"), &Passphrase::new("stale").unwrap())
            .unwrap();

        let result = h.store.open(&env("prod"));

        assert!(matches!(result, Err(Error::AuthenticationFailed(_))));
        assert!(creds.cached(&env("prod")).is_none());
    }

    #[test]
    fn test_open_rejects_renamed_vault() {
        let h = harness();
        let vault = create_prod(&h);

        h.provider
            .insert_raw(&env("staging"), vault.file.to_bytes().unwrap());

        h.prompter.push_passphrase("correct-horse");
        let result = h.store.open(&env("staging"));
        assert!(matches!(result, Err(Error::Corrupt(_))));
    }

    #[test]
    fn test_open_rejects_garbage() {
        let h = harness();
        h.provider.insert_raw(&env("prod"), b"not json".to_vec());

        h.prompter.push_passphrase("correct-horse");
        let result = h.store.open(&env("prod"));
        assert!(matches!(result, Err(Error::Corrupt(_))));
    }

    #[test]
    fn test_destroy_confirmed() {
        let h = harness();
        create_prod(&h);
        h.credentials
            .set(&env("prod"), &Passphrase::new("correct-horse").unwrap())
            .unwrap();

        h.prompter.push_passphrase("correct-horse");
        h.prompter.push_confirmation(true);
        let outcome = h.store.destroy(&env("prod")).unwrap();

        assert_eq!(outcome, DestroyOutcome::Destroyed);
        assert!(!h.store.exists(&env("prod")).unwrap());
        assert!(h.credentials.cached(&env("prod")).is_none());
    }

    #[test]
    fn test_destroy_declined_keeps_vault() {
        let h = harness();
        create_prod(&h);

        h.prompter.push_passphrase("correct-horse");
        h.prompter.push_confirmation(false);
        let outcome = h.store.destroy(&env("prod")).unwrap();

        assert_eq!(outcome, DestroyOutcome::Cancelled);
        assert!(h.store.exists(&env("prod")).unwrap());
    }

    #[test]
    fn test_destroy_requires_correct_passphrase() {
        let h = harness();
        create_prod(&h);

        h.prompter.push_passphrase("wrong");
        let result = h.store.destroy(&env("prod"));

        assert!(matches!(result, Err(Error::AuthenticationFailed(_))));
        assert!(h.store.exists(&env("prod")).unwrap());
    }

    #[test]
    fn test_destroy_ignores_override() {
        let h = harness_with(MemoryCredentialStore::new(), Some("correct-horse"));
        h.store.create(&env("prod")).unwrap();

        let result = h.store.destroy(&env("prod"));

        assert!(matches!(result, Err(Error::Cancelled(_))));
        assert!(h.store.exists(&env("prod")).unwrap());
    }

    #[test]
    fn test_destroy_survives_unreachable_keyring() {
        let h = harness_with(MemoryCredentialStore::failing_writes(), None);
        create_prod(&h);

        h.prompter.push_passphrase("correct-horse");
        h.prompter.push_confirmation(true);
        let outcome = h.store.destroy(&env("prod")).unwrap();

        assert_eq!(outcome, DestroyOutcome::Destroyed);
        assert!(!h.store.exists(&env("prod")).unwrap());
    }

    #[test]
    fn test_clear_cache() {
        let h = harness();
        h.credentials
            .set(&env("prod"), &Passphrase::new("cached").unwrap())
            .unwrap();

        h.store.clear_cache(&env("prod")).unwrap();
        h.store.clear_cache(&env("prod")).unwrap();

        assert!(h.credentials.cached(&env("prod")).is_none());
    }

    #[test]
    fn test_local_store_round_trip() {
        let temp = TempDir::new().unwrap();
        let provider = Arc::new(LocalProvider::new(temp.path().join(".envsecrets")));
        let prompter = crate::ScriptedPrompter::new(["correct-horse", "correct-horse", "correct-horse"]);
        let resolver = PassphraseResolver::new(
            None,
            Arc::new(MemoryCredentialStore::new()),
            Arc::new(prompter),
        );
        let store = VaultStore::new(provider, resolver, cheap_kdf());

        let mut vault = store.create(&env("prod")).unwrap();
        let ct = vault.encrypt_value(b"abc123").unwrap();
        vault.set_entry("API_KEY", ct).unwrap();
        store.save(&vault).unwrap();

        assert!(temp.path().join(".envsecrets/prod.vault").exists());

        let reopened = store.open(&env("prod")).unwrap();
        assert_eq!(reopened.decrypt_entry("API_KEY").unwrap().as_bytes(), b"abc123");
    }
}
