//! Cryptographic primitives for envsecrets.
//!
//! This module provides:
//! - Key derivation using Argon2id
//! - Authenticated encryption using XChaCha20-Poly1305
//! - Passphrase fingerprints (salted Argon2id PHC strings)
//! - The text envelope used for entry values: base64(nonce || ciphertext || tag)
//!
//! # Security Guarantees
//! - All key material is automatically zeroized on drop
//! - No plaintext or key material is ever logged
//! - Fingerprints are verified in constant time
//! - A fresh random nonce is generated for every encryption

pub mod aead;
pub mod envelope;
pub mod fingerprint;
pub mod kdf;
pub mod keys;

pub use aead::{NONCE_SIZE, TAG_SIZE};
pub use envelope::{decrypt, encrypt, EnvelopeCipher};
pub use fingerprint::{fingerprint, verify_fingerprint};
pub use kdf::{derive_key, KdfParams};
pub use keys::{Salt, VaultKey, KEY_LENGTH, SALT_LENGTH};
