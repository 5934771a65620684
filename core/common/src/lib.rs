//! Common types shared across envsecrets crates.
//!
//! This module provides the error taxonomy used by every core operation and
//! the small value types (environment names, passphrases, sensitive buffers)
//! that carry invariants across crate boundaries.

pub mod error;
pub mod types;

pub use error::{Error, ErrorKind, Result};
pub use types::{EnvName, Passphrase, SensitiveBytes};
