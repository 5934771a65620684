//! Storage provider trait definition.

use envsecrets_common::{EnvName, Result};

/// Storage provider trait for vault files.
///
/// One serialized vault is stored per environment. Implementations must be
/// safe to share between threads, though envsecrets itself runs one command
/// at a time.
pub trait StorageProvider: Send + Sync {
    /// Human-readable location of the vault for `env` (a path for local storage).
    fn location(&self, env: &EnvName) -> String;

    /// Check whether a vault exists for `env`. Never reads content.
    fn exists(&self, env: &EnvName) -> Result<bool>;

    /// Store a brand-new vault.
    ///
    /// # Errors
    /// - `AlreadyExists` if a vault for `env` is already stored
    fn create(&self, env: &EnvName, data: &[u8]) -> Result<()>;

    /// Replace the stored vault for `env`.
    ///
    /// # Postconditions
    /// - Readers observe either the previous content or `data`, never a mix
    fn upload(&self, env: &EnvName, data: &[u8]) -> Result<()>;

    /// Read the stored vault for `env`.
    ///
    /// # Errors
    /// - `NotFound` if no vault is stored for `env`
    fn download(&self, env: &EnvName) -> Result<Vec<u8>>;

    /// Remove the stored vault for `env`.
    ///
    /// # Errors
    /// - `NotFound` if no vault is stored for `env`
    fn delete(&self, env: &EnvName) -> Result<()>;
}
