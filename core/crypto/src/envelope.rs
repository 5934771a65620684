//! Text envelope for entry values.
//!
//! An envelope is `base64(nonce || ciphertext || tag)` produced under a key
//! derived from the vault passphrase and the vault salt. [`EnvelopeCipher`]
//! derives the key once so a batch of entries (import, export, rotation)
//! pays the KDF cost a single time; [`encrypt`] and [`decrypt`] are the
//! one-shot forms.

use base64::{engine::general_purpose::STANDARD, Engine};
use zeroize::Zeroize;

use crate::aead;
use crate::kdf::{derive_key, KdfParams};
use crate::keys::{Salt, VaultKey};
use envsecrets_common::{Error, Passphrase, Result, SensitiveBytes};

/// Encrypts and decrypts envelopes under one derived key.
///
/// The key is zeroized when the cipher is dropped.
pub struct EnvelopeCipher {
    key: VaultKey,
}

impl EnvelopeCipher {
    /// Derive the key for `(salt, passphrase)`.
    ///
    /// # Errors
    /// - `InvalidInput` if the passphrase is empty
    /// - `Crypto` if `params` are invalid
    pub fn new(salt: &Salt, passphrase: &Passphrase, params: &KdfParams) -> Result<Self> {
        let key = derive_key(passphrase.as_bytes(), salt, params)?;
        Ok(Self { key })
    }

    /// Seal `plaintext` into a new envelope with a fresh random nonce.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String> {
        let mut sealed = aead::encrypt(&self.key, plaintext)?;
        let encoded = STANDARD.encode(&sealed);
        sealed.zeroize();
        Ok(encoded)
    }

    /// Open an envelope.
    ///
    /// # Errors
    /// - `InvalidInput` if `envelope` is empty
    /// - `Corrupt` if it is not base64 or is truncated
    /// - `AuthenticationFailed` if the tag does not verify
    pub fn decrypt(&self, envelope: &str) -> Result<SensitiveBytes> {
        if envelope.is_empty() {
            return Err(Error::InvalidInput("ciphertext cannot be empty".to_string()));
        }
        let mut raw = STANDARD
            .decode(envelope)
            .map_err(|e| Error::Corrupt(format!("invalid ciphertext encoding: {}", e)))?;
        let opened = aead::decrypt(&self.key, &raw);
        raw.zeroize();
        opened
    }
}

/// Encrypt `plaintext` under `(salt, passphrase)`.
pub fn encrypt(
    plaintext: &[u8],
    salt: &Salt,
    passphrase: &Passphrase,
    params: &KdfParams,
) -> Result<String> {
    EnvelopeCipher::new(salt, passphrase, params)?.encrypt(plaintext)
}

/// Decrypt an envelope produced by [`encrypt`] under the same `(salt, passphrase)`.
pub fn decrypt(
    envelope: &str,
    salt: &Salt,
    passphrase: &Passphrase,
    params: &KdfParams,
) -> Result<SensitiveBytes> {
    EnvelopeCipher::new(salt, passphrase, params)?.decrypt(envelope)
}
