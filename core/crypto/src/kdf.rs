//! Key derivation using Argon2id.
//!
//! Argon2id is a memory-hard password hashing function that provides
//! resistance to both GPU and time-memory trade-off attacks.

use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::keys::{Salt, VaultKey, KEY_LENGTH};
use envsecrets_common::{Error, Result};

/// Parameters for Argon2id key derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB (e.g., 65536 = 64 MiB).
    pub memory_cost: u32,
    /// Number of iterations.
    pub time_cost: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
}

impl KdfParams {
    /// Create parameters suitable for interactive use.
    ///
    /// These parameters provide a balance between security and usability,
    /// targeting approximately 0.5-1 second of derivation time.
    pub fn interactive() -> Self {
        Self {
            memory_cost: 65536, // 64 MiB
            time_cost: 3,
            parallelism: 4,
        }
    }

    /// Create parameters suitable for sensitive data.
    ///
    /// Higher security parameters that may take several seconds.
    pub fn sensitive() -> Self {
        Self {
            memory_cost: 262144, // 256 MiB
            time_cost: 4,
            parallelism: 4,
        }
    }

    /// Create moderate parameters for constrained machines.
    pub fn moderate() -> Self {
        Self {
            memory_cost: 32768, // 32 MiB
            time_cost: 3,
            parallelism: 2,
        }
    }

    /// Look up a preset by name.
    pub fn from_preset(name: &str) -> Result<Self> {
        match name {
            "interactive" => Ok(Self::interactive()),
            "moderate" => Ok(Self::moderate()),
            "sensitive" => Ok(Self::sensitive()),
            other => Err(Error::InvalidInput(format!(
                "unknown KDF preset {:?}, use interactive, moderate or sensitive",
                other
            ))),
        }
    }

    /// Build an Argon2id context from these parameters.
    pub(crate) fn argon2(&self, output_len: Option<usize>) -> Result<Argon2<'static>> {
        let params = Params::new(self.memory_cost, self.time_cost, self.parallelism, output_len)
            .map_err(|e| Error::Crypto(format!("Invalid KDF parameters: {}", e)))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::interactive()
    }
}

/// Derive a vault key from a passphrase and salt using Argon2id.
///
/// # Preconditions
/// - `password` must not be empty
/// - `params` must have valid Argon2id parameters
///
/// # Postconditions
/// - The derived key is deterministic given the same inputs
///
/// # Errors
/// - `InvalidInput` if password is empty
/// - `Crypto` if Argon2id parameters are invalid
///
/// # Security
/// - Password is not stored or logged
/// - The intermediate buffer is zeroized after derivation
pub fn derive_key(password: &[u8], salt: &Salt, params: &KdfParams) -> Result<VaultKey> {
    if password.is_empty() {
        return Err(Error::InvalidInput("passphrase cannot be empty".to_string()));
    }

    let argon2 = params.argon2(Some(KEY_LENGTH))?;

    let mut key_bytes = [0u8; KEY_LENGTH];
    let derived = argon2
        .hash_password_into(password, salt.as_bytes(), &mut key_bytes)
        .map_err(|e| Error::Crypto(format!("Key derivation failed: {}", e)))
        .map(|_| VaultKey::from_bytes(key_bytes));
    key_bytes.zeroize();

    derived
}
