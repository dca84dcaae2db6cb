//! Encryption key storage, addressed by key identifier.
//!
//! # Security invariants
//!
//! - Key material is **never** logged or included in traces; [`KeyBytes`]
//!   redacts itself in `Debug` output.
//! - Every copy of a key is zeroed when dropped.
//! - Keys are exactly [`KEY_LEN`] bytes; the store refuses anything else.

pub mod store;

pub use store::{KeyBytes, MemoryKeyStore};

use thiserror::Error;

use crate::crypto::KEY_LEN;

/// Longest accepted key identifier, in bytes.
pub const MAX_KEY_ID_LEN: usize = 128;

/// Errors produced by the key layer.
#[derive(Debug, Error)]
pub enum KeyStoreError {
    /// No key is stored under the identifier.
    #[error("key not found: {0}")]
    NotFound(String),

    /// The key material has an unexpected length.
    #[error("key has invalid length: expected {KEY_LEN} bytes, got {0}")]
    InvalidLength(usize),

    /// The identifier is empty, too long, or contains whitespace/control characters.
    #[error("invalid key identifier")]
    InvalidIdentifier,
}

/// Storage for symmetric keys.
///
/// Implementations must be safe to share between threads; the service holds
/// one instance for its whole lifetime.
#[cfg_attr(test, mockall::automock)]
pub trait KeyStore: Send + Sync {
    /// Store (or replace) the key under `id`.
    fn store(&self, id: &str, key: &[u8]) -> Result<(), KeyStoreError>;

    /// Fetch a copy of the key stored under `id`.
    fn retrieve(&self, id: &str) -> Result<KeyBytes, KeyStoreError>;

    /// Remove the key stored under `id`.
    fn delete(&self, id: &str) -> Result<(), KeyStoreError>;

    /// Returns `true` if a key is stored under `id`.
    fn contains(&self, id: &str) -> bool;
}

/// Check that `id` is usable as a key identifier.
///
/// # Errors
///
/// Returns [`KeyStoreError::InvalidIdentifier`] if `id` is empty, longer than
/// [`MAX_KEY_ID_LEN`] bytes, or contains whitespace or control characters.
pub fn validate_key_id(id: &str) -> Result<(), KeyStoreError> {
    if id.is_empty()
        || id.len() > MAX_KEY_ID_LEN
        || id.chars().any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(KeyStoreError::InvalidIdentifier);
    }
    Ok(())
}
