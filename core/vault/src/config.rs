//! Vault metadata and store configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use envsecrets_common::{EnvName, Passphrase, Result};
use envsecrets_credentials::DEFAULT_SERVICE;
use envsecrets_crypto::{fingerprint, verify_fingerprint, KdfParams, Salt};
use envsecrets_storage::DEFAULT_VAULT_DIR;

/// Environment variable consulted for a passphrase override.
pub const DEFAULT_PASSPHRASE_ENV: &str = "ENVSECRET_PASSPHRASE";

/// Vault format version for migration support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultVersion {
    pub major: u32,
    pub minor: u32,
}

impl VaultVersion {
    /// Current vault format version.
    pub const CURRENT: Self = Self { major: 1, minor: 0 };

    /// Check if this version is compatible with the current version.
    pub fn is_compatible(&self) -> bool {
        self.major == Self::CURRENT.major
    }
}

impl Default for VaultVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

/// Vault metadata, stored in the clear at the top of the vault file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultMeta {
    /// Environment the vault belongs to. Immutable after creation.
    pub environment: EnvName,
    /// Salt for entry key derivation. Regenerated on every rotation.
    pub salt: Salt,
    /// Argon2id PHC string of the passphrase, independently salted.
    pub fingerprint: String,
    /// Vault format version.
    #[serde(default)]
    pub version: VaultVersion,
    /// KDF parameters used for entry keys under `salt`.
    #[serde(default)]
    pub kdf: KdfParams,
}

impl VaultMeta {
    /// Create metadata for a vault protected by `passphrase`.
    ///
    /// # Postconditions
    /// - Salt is freshly generated
    /// - Fingerprint verifies against `passphrase`
    ///
    /// # Errors
    /// - KDF parameters invalid
    pub fn new(environment: EnvName, passphrase: &Passphrase, kdf: KdfParams) -> Result<Self> {
        Ok(Self {
            environment,
            salt: Salt::generate(),
            fingerprint: fingerprint(passphrase, &kdf)?,
            version: VaultVersion::CURRENT,
            kdf,
        })
    }

    /// Verify a passphrase against the stored fingerprint.
    ///
    /// # Returns
    /// - `Ok(true)` if passphrase is correct
    /// - `Ok(false)` if passphrase is incorrect
    /// - `Err(_)` if the fingerprint itself is malformed
    pub fn verify_passphrase(&self, passphrase: &Passphrase) -> Result<bool> {
        verify_fingerprint(passphrase, &self.fingerprint)
    }
}

/// Configuration for a [`VaultStore`](crate::VaultStore) on the local machine.
///
/// Defaults:
/// - `root`: `.envsecrets` in the working directory
/// - `kdf`: [`KdfParams::interactive`]
/// - `passphrase_env`: `ENVSECRET_PASSPHRASE`
/// - `keyring_service`: `envsecrets`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Directory holding `<env>.vault` files.
    pub root: PathBuf,
    /// KDF parameters for newly created and rotated vaults.
    pub kdf: KdfParams,
    /// Environment variable holding a passphrase override.
    pub passphrase_env: String,
    /// Keyring service name for cached passphrases.
    pub keyring_service: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_VAULT_DIR),
            kdf: KdfParams::interactive(),
            passphrase_env: DEFAULT_PASSPHRASE_ENV.to_string(),
            keyring_service: DEFAULT_SERVICE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::cheap_kdf;

    #[test]
    fn test_vault_version_compatibility() {
        let current = VaultVersion::CURRENT;
        assert!(current.is_compatible());

        let incompatible = VaultVersion { major: 2, minor: 0 };
        assert!(!incompatible.is_compatible());
    }

    #[test]
    fn test_meta_creation_and_verification() {
        let env = EnvName::new("prod").unwrap();
        let pass = Passphrase::new("correct-horse").unwrap();

        let meta = VaultMeta::new(env, &pass, cheap_kdf()).unwrap();

        assert!(meta.verify_passphrase(&pass).unwrap());
        assert!(!meta
            .verify_passphrase(&Passphrase::new("wrong").unwrap())
            .unwrap());
    }

    #[test]
    fn test_meta_salts_are_fresh() {
        let env = EnvName::new("prod").unwrap();
        let pass = Passphrase::new("pw").unwrap();

        let a = VaultMeta::new(env.clone(), &pass, cheap_kdf()).unwrap();
        let b = VaultMeta::new(env, &pass, cheap_kdf()).unwrap();

        assert_ne!(a.salt, b.salt);
        assert_ne!(a.fingerprint, b.fingerprint);
    }

    #[test]
    fn test_meta_defaults_for_missing_fields() {
        let json = r#"{"environment":"prod","salt":"AAAAAAAAAAAAAAAAAAAAAA==","fingerprint":"x"}"#;
        let meta: VaultMeta = serde_json::from_str(json).unwrap();

        assert_eq!(meta.version, VaultVersion::CURRENT);
        assert_eq!(meta.kdf, KdfParams::interactive());
    }

    #[test]
    fn test_store_config_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.root, PathBuf::from(".envsecrets"));
        assert_eq!(config.passphrase_env, "ENVSECRET_PASSPHRASE");
        assert_eq!(config.keyring_service, "envsecrets");
    }
}
