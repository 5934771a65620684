//! Passphrase fingerprints.
//!
//! A fingerprint is an Argon2id PHC string carrying its own random salt,
//! independent of the vault salt. It lets a vault reject a wrong
//! passphrase without touching any entry ciphertext.

use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chacha20poly1305::aead::OsRng;

use crate::kdf::KdfParams;
use envsecrets_common::{Error, Passphrase, Result};

/// Compute a fingerprint of `passphrase`.
///
/// Two calls with the same passphrase produce different strings, because
/// each call draws a fresh internal salt.
///
/// # Errors
/// - `Crypto` if `params` are invalid or hashing fails
pub fn fingerprint(passphrase: &Passphrase, params: &KdfParams) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = params
        .argon2(None)?
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| Error::Crypto(format!("Fingerprint failed: {}", e)))?;
    Ok(hash.to_string())
}

/// Check `passphrase` against a stored fingerprint.
///
/// Cost parameters are read from the fingerprint itself; comparison of the
/// recomputed hash is constant-time.
///
/// # Returns
/// - `Ok(true)` if the passphrase matches
/// - `Ok(false)` if it does not
///
/// # Errors
/// - `Corrupt` if `fingerprint` is not a valid PHC string
pub fn verify_fingerprint(passphrase: &Passphrase, fingerprint: &str) -> Result<bool> {
    if fingerprint.is_empty() {
        return Err(Error::Corrupt("fingerprint is empty".to_string()));
    }
    let parsed = PasswordHash::new(fingerprint)
        .map_err(|e| Error::Corrupt(format!("invalid fingerprint: {}", e)))?;

    match Argon2::default().verify_password(passphrase.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(Error::Corrupt(format!("fingerprint check failed: {}", e))),
    }
}
