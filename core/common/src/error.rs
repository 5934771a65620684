//! Common error types for envsecrets.

use std::fmt;

use thiserror::Error;

/// Top-level error type for envsecrets operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid input provided (empty key, value, passphrase or environment).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Vault or entry not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Passphrase did not match the fingerprint, or an AEAD tag did not verify.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Persisted data could not be decoded or is inconsistent.
    #[error("Corrupt data: {0}")]
    Corrupt(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The OS credential store could not be reached.
    #[error("Credential store error: {0}")]
    CredentialStore(String),

    /// A cryptographic primitive rejected its configuration.
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// The operator aborted an interactive prompt.
    #[error("Cancelled: {0}")]
    Cancelled(String),
}

/// Coarse classification of [`Error`] for callers that map failures to
/// messages or exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    AlreadyExists,
    AuthenticationFailed,
    Corrupt,
    IoFailure,
}

impl Error {
    /// Get the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput(_) | Error::Crypto(_) => ErrorKind::InvalidInput,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Error::AuthenticationFailed(_) => ErrorKind::AuthenticationFailed,
            Error::Corrupt(_) => ErrorKind::Corrupt,
            Error::Io(_) | Error::CredentialStore(_) | Error::Cancelled(_) => {
                ErrorKind::IoFailure
            }
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidInput => "invalid input",
            ErrorKind::NotFound => "not found",
            ErrorKind::AlreadyExists => "already exists",
            ErrorKind::AuthenticationFailed => "authentication failed",
            ErrorKind::Corrupt => "corrupt",
            ErrorKind::IoFailure => "I/O failure",
        };
        f.write_str(name)
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
