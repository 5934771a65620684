//! Authenticated encryption using XChaCha20-Poly1305.
//!
//! XChaCha20-Poly1305 provides both confidentiality and authenticity,
//! with a 24-byte nonce that is safe for random generation.

use chacha20poly1305::{
    aead::{generic_array::GenericArray, Aead, AeadCore, KeyInit, OsRng},
    XChaCha20Poly1305,
};
use zeroize::Zeroize;

use crate::keys::VaultKey;
use envsecrets_common::{Error, Result, SensitiveBytes};

/// Nonce size for XChaCha20-Poly1305 (24 bytes).
pub const NONCE_SIZE: usize = 24;

/// Authentication tag size (16 bytes).
pub const TAG_SIZE: usize = 16;

/// Encrypt plaintext using XChaCha20-Poly1305.
///
/// # Postconditions
/// - Returns nonce || ciphertext || tag
/// - The nonce is freshly generated from the OS CSPRNG on every call
/// - The output length is plaintext length + TAG_SIZE + NONCE_SIZE
///
/// # Errors
/// - `Crypto` if the cipher rejects the input
pub fn encrypt(key: &VaultKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new(GenericArray::from_slice(key.as_bytes()));
    let mut nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);

    let sealed = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| Error::Crypto(format!("Encryption failed: {}", e)));

    let result = sealed.map(|ciphertext| {
        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        out
    });
    nonce.as_mut_slice().zeroize();

    result
}

/// Decrypt ciphertext using XChaCha20-Poly1305.
///
/// # Preconditions
/// - Ciphertext format: nonce || encrypted_data || tag
///
/// # Errors
/// - `Corrupt` if ciphertext is shorter than NONCE_SIZE + TAG_SIZE
/// - `AuthenticationFailed` if the tag does not verify (wrong key or tampered data)
///
/// # Security
/// - Authenticates before returning any plaintext
/// - The plaintext is returned in a buffer that zeroizes on drop
pub fn decrypt(key: &VaultKey, ciphertext: &[u8]) -> Result<SensitiveBytes> {
    if ciphertext.len() < NONCE_SIZE + TAG_SIZE {
        return Err(Error::Corrupt(format!(
            "ciphertext too short: expected at least {} bytes, got {}",
            NONCE_SIZE + TAG_SIZE,
            ciphertext.len()
        )));
    }

    let (nonce_bytes, encrypted) = ciphertext.split_at(NONCE_SIZE);
    let nonce = GenericArray::from_slice(nonce_bytes);

    let cipher = XChaCha20Poly1305::new(GenericArray::from_slice(key.as_bytes()));

    cipher
        .decrypt(nonce, encrypted)
        .map(SensitiveBytes::new)
        .map_err(|_| Error::AuthenticationFailed("ciphertext failed authentication".to_string()))
}
