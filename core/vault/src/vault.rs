//! The in-memory vault aggregate.

use std::collections::BTreeMap;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::config::VaultMeta;
use envsecrets_common::{EnvName, Error, Passphrase, Result, SensitiveBytes};
use envsecrets_crypto::EnvelopeCipher;

/// One stored secret: an envelope plus timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Envelope produced under the vault's salt and passphrase.
    pub ciphertext: String,
    /// Set once, at first write.
    pub created_at: DateTime<Utc>,
    /// Refreshed on every overwrite.
    pub updated_at: DateTime<Utc>,
}

/// The persisted shape of a vault: metadata in the clear, values as envelopes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultFile {
    pub meta: VaultMeta,
    #[serde(default)]
    pub entries: BTreeMap<String, Entry>,
}

impl VaultFile {
    /// An empty vault with the given metadata.
    pub fn new(meta: VaultMeta) -> Self {
        Self {
            meta,
            entries: BTreeMap::new(),
        }
    }

    /// Serialize to pretty JSON bytes for storage.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| Error::Corrupt(format!("failed to encode vault: {}", e)))
    }

    /// Parse stored bytes and check structural invariants.
    ///
    /// # Errors
    /// - `Corrupt` on malformed JSON, an incompatible format version, or an
    ///   entry with an empty key or empty ciphertext
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let file: VaultFile = serde_json::from_slice(bytes)
            .map_err(|e| Error::Corrupt(format!("failed to parse vault: {}", e)))?;

        if !file.meta.version.is_compatible() {
            return Err(Error::Corrupt(format!(
                "incompatible vault version {}.{}",
                file.meta.version.major, file.meta.version.minor
            )));
        }
        if file.entries.keys().any(|k| k.is_empty()) {
            return Err(Error::Corrupt("vault contains an empty entry key".to_string()));
        }
        if let Some((key, _)) = file.entries.iter().find(|(_, e)| e.ciphertext.is_empty()) {
            return Err(Error::Corrupt(format!("entry {:?} has no ciphertext", key)));
        }

        Ok(file)
    }
}

/// Current time at the second precision entries are stored with.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// An open vault.
///
/// Holds the persisted data plus the session-only storage location and the
/// passphrase it was opened with. The passphrase is zeroized on drop and
/// never written to storage. Mutations stay in memory until the vault is
/// passed to [`VaultStore::save`](crate::VaultStore::save).
pub struct Vault {
    pub(crate) file: VaultFile,
    pub(crate) location: String,
    pub(crate) passphrase: Passphrase,
}

impl Vault {
    pub(crate) fn from_parts(file: VaultFile, location: String, passphrase: Passphrase) -> Self {
        Self {
            file,
            location,
            passphrase,
        }
    }

    /// Environment this vault belongs to.
    pub fn environment(&self) -> &EnvName {
        &self.file.meta.environment
    }

    /// Vault metadata.
    pub fn meta(&self) -> &VaultMeta {
        &self.file.meta
    }

    /// Where the vault is stored.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Passphrase bound to this session.
    pub fn passphrase(&self) -> &Passphrase {
        &self.passphrase
    }

    /// All entries, ordered by key.
    pub fn entries(&self) -> &BTreeMap<String, Entry> {
        &self.file.entries
    }

    /// Entry keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.file.entries.keys().map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.file.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.file.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.file.entries.is_empty()
    }

    /// Insert or overwrite an entry.
    ///
    /// # Postconditions
    /// - A new key gets `created_at == updated_at == now`
    /// - An existing key keeps `created_at` and gets `updated_at = now`
    ///
    /// # Errors
    /// - `InvalidInput` if `key` or `ciphertext` is empty
    pub fn set_entry(&mut self, key: &str, ciphertext: impl Into<String>) -> Result<()> {
        self.set_entry_at(key, ciphertext, now())
    }

    /// [`set_entry`](Self::set_entry) with an explicit timestamp.
    pub fn set_entry_at(
        &mut self,
        key: &str,
        ciphertext: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let ciphertext = ciphertext.into();
        if key.is_empty() {
            return Err(Error::InvalidInput("key cannot be empty".to_string()));
        }
        if ciphertext.is_empty() {
            return Err(Error::InvalidInput(
                "encrypted value cannot be empty".to_string(),
            ));
        }

        match self.file.entries.get_mut(key) {
            Some(entry) => {
                entry.ciphertext = ciphertext;
                entry.updated_at = at;
            }
            None => {
                self.file.entries.insert(
                    key.to_string(),
                    Entry {
                        ciphertext,
                        created_at: at,
                        updated_at: at,
                    },
                );
            }
        }
        Ok(())
    }

    /// Get an entry.
    ///
    /// # Errors
    /// - `NotFound` if `key` is absent
    pub fn get_entry(&self, key: &str) -> Result<&Entry> {
        self.file
            .entries
            .get(key)
            .ok_or_else(|| Error::NotFound(format!("entry {:?} not found", key)))
    }

    /// Remove an entry, returning it.
    ///
    /// # Errors
    /// - `NotFound` if `key` is absent
    pub fn delete_entry(&mut self, key: &str) -> Result<Entry> {
        self.file
            .entries
            .remove(key)
            .ok_or_else(|| Error::NotFound(format!("entry {:?} not found", key)))
    }

    /// Derive the entry cipher for this vault's salt and session passphrase.
    pub fn cipher(&self) -> Result<EnvelopeCipher> {
        EnvelopeCipher::new(&self.file.meta.salt, &self.passphrase, &self.file.meta.kdf)
    }

    /// Encrypt a plaintext value for storage in this vault.
    pub fn encrypt_value(&self, plaintext: &[u8]) -> Result<String> {
        self.cipher()?.encrypt(plaintext)
    }

    /// Decrypt the value stored under `key`.
    pub fn decrypt_entry(&self, key: &str) -> Result<SensitiveBytes> {
        let entry = self.get_entry(key)?;
        self.cipher()?.decrypt(&entry.ciphertext)
    }

    /// Decrypt every entry, ordered by key.
    ///
    /// Fails on the first entry that does not decrypt.
    pub fn decrypt_all(&self) -> Result<BTreeMap<String, SensitiveBytes>> {
        let cipher = self.cipher()?;
        self.file
            .entries
            .iter()
            .map(|(key, entry)| Ok((key.clone(), cipher.decrypt(&entry.ciphertext)?)))
            .collect()
    }
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("environment", self.environment())
            .field("location", &self.location)
            .field("entries", &self.file.entries.len())
            .finish()
    }
}
