//! Credential store trait definition.

use envsecrets_common::{EnvName, Passphrase, Result};

/// Account name under which the passphrase for `env` is cached.
pub fn credential_key(env: &EnvName) -> String {
    format!("env:{}", env)
}

/// Get/set/delete access to cached vault passphrases.
///
/// The store is an externally synchronized resource: no transactional
/// guarantees hold across calls.
pub trait CredentialStore: Send + Sync {
    /// Get the cached passphrase for `env`.
    ///
    /// # Returns
    /// - `Ok(None)` if nothing (or only an empty string) is cached
    ///
    /// # Errors
    /// - `CredentialStore` if the backing store cannot be reached
    fn get(&self, env: &EnvName) -> Result<Option<Passphrase>>;

    /// Cache `passphrase` for `env`, replacing any previous value.
    fn set(&self, env: &EnvName, passphrase: &Passphrase) -> Result<()>;

    /// Remove the cached passphrase for `env`.
    ///
    /// Removing an entry that does not exist succeeds.
    fn delete(&self, env: &EnvName) -> Result<()>;
}
