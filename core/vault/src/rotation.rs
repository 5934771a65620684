//! Passphrase rotation.
//!
//! Every entry is re-encrypted under a fresh salt and the new passphrase.
//! The candidate vault is built beside the open one and only swapped in
//! after it has been persisted, so a failure at any step leaves both the
//! stored file and the in-memory vault as they were.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::config::VaultMeta;
use crate::manager::VaultStore;
use crate::vault::{now, Entry, Vault, VaultFile};
use envsecrets_common::{Passphrase, Result};
use envsecrets_crypto::EnvelopeCipher;

/// Summary of a completed rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationReport {
    /// Number of entries re-encrypted.
    pub rotated: usize,
}

impl VaultStore {
    /// Replace the passphrase of an open vault.
    ///
    /// # Preconditions
    /// - `vault` was opened or created through this store
    /// - `new_passphrase` has been confirmed by the operator
    ///
    /// # Postconditions
    /// - Salt and fingerprint are new; the old passphrase no longer opens the vault
    /// - Entry `created_at` is preserved and `updated_at` is refreshed
    /// - The cached credential holds the new passphrase, unless an override is in use
    ///
    /// # Errors
    /// - Any entry that does not decrypt under the current passphrase aborts the
    ///   rotation; nothing is written
    /// - Storage failure while persisting; the in-memory vault is unchanged
    pub fn rotate(&self, vault: &mut Vault, new_passphrase: Passphrase) -> Result<RotationReport> {
        let env = vault.environment().clone();
        let old_cipher = vault.cipher()?;

        let meta = VaultMeta::new(env.clone(), &new_passphrase, *self.kdf())?;
        let new_cipher = EnvelopeCipher::new(&meta.salt, &new_passphrase, &meta.kdf)?;

        let updated_at = now();
        let mut entries = BTreeMap::new();
        for (key, entry) in vault.entries() {
            let plaintext = old_cipher.decrypt(&entry.ciphertext).map_err(|e| {
                warn!("Rotation of {} aborted: entry {:?} failed to decrypt", env, key);
                e
            })?;
            entries.insert(
                key.clone(),
                Entry {
                    ciphertext: new_cipher.encrypt(plaintext.as_bytes())?,
                    created_at: entry.created_at,
                    updated_at,
                },
            );
        }

        let candidate = VaultFile { meta, entries };
        self.provider().upload(&env, &candidate.to_bytes()?)?;

        let rotated = candidate.entries.len();
        vault.file = candidate;
        vault.passphrase = new_passphrase;
        self.remember(&env, &vault.passphrase);

        info!("Rotated passphrase for environment {} ({} entries)", env, rotated);
        Ok(RotationReport { rotated })
    }
}
