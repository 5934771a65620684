//! Common types used throughout envsecrets.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Maximum length of an environment name.
pub const MAX_ENV_NAME_LEN: usize = 64;

/// Name of a vault environment (e.g. `prod`, `staging`).
///
/// The name doubles as the vault's file stem, so it is restricted to
/// characters that cannot escape the vault directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EnvName(String);

impl EnvName {
    /// Create a new EnvName from a string.
    ///
    /// # Preconditions
    /// - `name` must be non-empty and at most [`MAX_ENV_NAME_LEN`] bytes
    /// - `name` may only contain ASCII alphanumerics, `-`, `_` and `.`
    /// - `name` must not start with `.`
    ///
    /// # Errors
    /// - Returns `InvalidInput` if any precondition is violated
    pub fn new(name: impl Into<String>) -> crate::Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(crate::Error::InvalidInput(
                "environment cannot be empty".to_string(),
            ));
        }
        if name.len() > MAX_ENV_NAME_LEN {
            return Err(crate::Error::InvalidInput(format!(
                "environment name longer than {} bytes",
                MAX_ENV_NAME_LEN
            )));
        }
        if name.starts_with('.') {
            return Err(crate::Error::InvalidInput(format!(
                "environment {:?} cannot start with '.'",
                name
            )));
        }
        if let Some(bad) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(crate::Error::InvalidInput(format!(
                "environment {:?} contains invalid character {:?}",
                name, bad
            )));
        }
        Ok(Self(name))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EnvName {
    type Error = crate::Error;

    fn try_from(value: String) -> crate::Result<Self> {
        Self::new(value)
    }
}

impl From<EnvName> for String {
    fn from(name: EnvName) -> Self {
        name.0
    }
}

impl fmt::Display for EnvName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A vault passphrase held only in process memory.
///
/// Zeroized on drop and redacted from debug output. Never serialized.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Passphrase(String);

impl Passphrase {
    /// Wrap a passphrase.
    ///
    /// # Errors
    /// - Returns `InvalidInput` if `value` is empty
    pub fn new(value: impl Into<String>) -> crate::Result<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(crate::Error::InvalidInput(
                "passphrase cannot be empty".to_string(),
            ));
        }
        Ok(Self(value))
    }

    /// Get the passphrase text.
    ///
    /// # Security
    /// The returned slice should be used immediately and not stored.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Get the passphrase bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Passphrase([REDACTED])")
    }
}

/// Sensitive data wrapper that zeroizes on drop.
#[derive(Clone, PartialEq, Eq, Zeroize)]
#[zeroize(drop)]
pub struct SensitiveBytes(Vec<u8>);

impl SensitiveBytes {
    /// Create new sensitive bytes.
    pub fn new(data: Vec<u8>) -> Self {
        Self(data)
    }

    /// Get a reference to the inner bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Interpret the bytes as UTF-8 text.
    ///
    /// # Errors
    /// - Returns `Corrupt` if the bytes are not valid UTF-8
    pub fn as_str(&self) -> crate::Result<&str> {
        std::str::from_utf8(&self.0)
            .map_err(|_| crate::Error::Corrupt("decrypted value is not valid UTF-8".to_string()))
    }

    /// Get the length.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SensitiveBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SensitiveBytes([REDACTED; {} bytes])", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_env_name_creation() {
        let env = EnvName::new("prod").unwrap();
        assert_eq!(env.as_str(), "prod");
        assert!(EnvName::new("staging-eu_1.blue").is_ok());
    }

    #[test]
    fn test_env_name_empty_fails() {
        assert!(EnvName::new("").is_err());
    }

    #[test]
    fn test_env_name_rejects_traversal() {
        assert!(EnvName::new("../prod").is_err());
        assert!(EnvName::new("a/b").is_err());
        assert!(EnvName::new("a\\b").is_err());
        assert!(EnvName::new(".hidden").is_err());
        assert!(EnvName::new("..").is_err());
    }

    #[test]
    fn test_env_name_serde_validates() {
        let ok: EnvName = serde_json::from_str("\"prod\"").unwrap();
        assert_eq!(ok.as_str(), "prod");
        assert!(serde_json::from_str::<EnvName>("\"../etc\"").is_err());
    }

    #[test]
    fn test_passphrase_empty_fails() {
        assert!(Passphrase::new("").is_err());
        assert_eq!(Passphrase::new("pw").unwrap().expose(), "pw");
    }

    #[test]
    fn test_sensitive_values_are_redacted() {
        let pass = Passphrase::new("correct-horse").unwrap();
        assert!(!format!("{:?}", pass).contains("correct-horse"));

        let bytes = SensitiveBytes::new(b"abc123".to_vec());
        assert_eq!(format!("{:?}", bytes), "SensitiveBytes([REDACTED; 6 bytes])");
        assert_eq!(bytes.as_str().unwrap(), "abc123");
    }

    proptest! {
        #[test]
        fn prop_valid_env_names_never_contain_separators(name in "\\PC{1,40}") {
            if let Ok(env) = EnvName::new(name) {
                prop_assert!(!env.as_str().contains('/'));
                prop_assert!(!env.as_str().contains('\\'));
                prop_assert!(!env.as_str().starts_with('.'));
            }
        }
    }
}
