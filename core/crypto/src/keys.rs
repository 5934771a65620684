//! Key types with secure memory handling.
//!
//! All key types automatically zeroize their memory on drop to prevent
//! sensitive data from persisting in memory.

use base64::{engine::general_purpose::STANDARD, Engine};
use chacha20poly1305::aead::{rand_core::RngCore, OsRng};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use envsecrets_common::{Error, Result};

/// Length of encryption keys in bytes (256-bit).
pub const KEY_LENGTH: usize = 32;

/// Length of a vault salt in bytes.
pub const SALT_LENGTH: usize = 16;

/// Symmetric key derived from a vault passphrase and salt.
///
/// Exists only for the duration of an encrypt/decrypt batch.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct VaultKey {
    key: [u8; KEY_LENGTH],
}

impl VaultKey {
    /// Create a key from raw bytes.
    pub fn from_bytes(key: [u8; KEY_LENGTH]) -> Self {
        Self { key }
    }

    /// Get the key bytes.
    ///
    /// # Security
    /// The returned slice should be used immediately and not stored.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }
}

impl fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VaultKey([REDACTED])")
    }
}

/// Per-vault salt for key derivation.
///
/// Stored in the clear as standard base64 inside the vault metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Salt([u8; SALT_LENGTH]);

impl Salt {
    /// Generate a random salt from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut salt = [0u8; SALT_LENGTH];
        OsRng.fill_bytes(&mut salt);
        Self(salt)
    }

    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; SALT_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Get the salt bytes.
    pub fn as_bytes(&self) -> &[u8; SALT_LENGTH] {
        &self.0
    }

    /// Encode as standard base64.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// Decode from standard base64.
    ///
    /// # Errors
    /// - `InvalidInput` if `encoded` is empty
    /// - `Corrupt` if it is not base64 or does not decode to [`SALT_LENGTH`] bytes
    pub fn from_base64(encoded: &str) -> Result<Self> {
        if encoded.is_empty() {
            return Err(Error::InvalidInput("salt cannot be empty".to_string()));
        }
        let raw = STANDARD
            .decode(encoded)
            .map_err(|e| Error::Corrupt(format!("invalid salt encoding: {}", e)))?;
        let bytes: [u8; SALT_LENGTH] = raw.as_slice().try_into().map_err(|_| {
            Error::Corrupt(format!(
                "invalid salt length: expected {}, got {}",
                SALT_LENGTH,
                raw.len()
            ))
        })?;
        Ok(Self(bytes))
    }
}

impl Serialize for Salt {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for Salt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Salt::from_base64(&encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_salt_generate() {
        let salt1 = Salt::generate();
        let salt2 = Salt::generate();

        // Random salts should be different
        assert_ne!(salt1.as_bytes(), salt2.as_bytes());
    }

    #[test]
    fn test_salt_base64_roundtrip() {
        let salt = Salt::from_bytes([7u8; SALT_LENGTH]);
        let encoded = salt.to_base64();
        assert_eq!(Salt::from_base64(&encoded).unwrap(), salt);
    }

    #[test]
    fn test_salt_rejects_bad_encoding() {
        assert!(matches!(Salt::from_base64(""), Err(Error::InvalidInput(_))));
        assert!(matches!(Salt::from_base64("not base64!"), Err(Error::Corrupt(_))));
        // Valid base64, wrong length
        assert!(matches!(Salt::from_base64("AAAA"), Err(Error::Corrupt(_))));
    }

    #[test]
    fn test_salt_serializes_as_string() {
        let salt = Salt::from_bytes([0u8; SALT_LENGTH]);
        let json = serde_json::to_string(&salt).unwrap();
        assert_eq!(json, "\"AAAAAAAAAAAAAAAAAAAAAA==\"");
        let back: Salt = serde_json::from_str(&json).unwrap();
        assert_eq!(back, salt);
    }

    #[test]
    fn test_vault_key_debug_redacted() {
        let key = VaultKey::from_bytes([1u8; KEY_LENGTH]);
        assert_eq!(format!("{:?}", key), "VaultKey([REDACTED])");
    }
}
