//! OS keyring backed credential store.

use keyring::Entry;
use tracing::debug;

use crate::store::{credential_key, CredentialStore};
use envsecrets_common::{EnvName, Error, Passphrase, Result};

/// Default keyring service name.
pub const DEFAULT_SERVICE: &str = "envsecrets";

/// Credential store backed by the platform keyring (macOS Keychain,
/// Windows Credential Manager, Linux kernel keyutils).
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    /// Create a store using the given keyring service name.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, env: &EnvName) -> Result<Entry> {
        Entry::new(&self.service, &credential_key(env)).map_err(keyring_error)
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE)
    }
}

fn keyring_error(err: keyring::Error) -> Error {
    Error::CredentialStore(err.to_string())
}

impl CredentialStore for KeyringStore {
    fn get(&self, env: &EnvName) -> Result<Option<Passphrase>> {
        match self.entry(env)?.get_password() {
            Ok(secret) if secret.is_empty() => Ok(None),
            Ok(secret) => Passphrase::new(secret).map(Some),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(keyring_error(e)),
        }
    }

    fn set(&self, env: &EnvName, passphrase: &Passphrase) -> Result<()> {
        self.entry(env)?
            .set_password(passphrase.expose())
            .map_err(keyring_error)?;
        debug!("Cached passphrase for environment {}", env);
        Ok(())
    }

    fn delete(&self, env: &EnvName) -> Result<()> {
        match self.entry(env)?.delete_credential() {
            Ok(()) => {
                debug!("Removed cached passphrase for environment {}", env);
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(keyring_error(e)),
        }
    }
}
