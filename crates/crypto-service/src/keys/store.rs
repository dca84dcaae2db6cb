//! [`MemoryKeyStore`]: thread-safe in-memory key store.

use std::{collections::HashMap, sync::Arc};

use arc_swap::ArcSwap;

use super::{validate_key_id, KeyStore, KeyStoreError};
use crate::crypto::{self, KEY_LEN};

/// Fixed-size key buffer that holds exactly [`KEY_LEN`] bytes.
///
/// Cloned out of the store into call stacks when needed. When this type is
/// dropped, the memory is overwritten with zeroes to minimise the window
/// during which plaintext key material lives in RAM.
#[derive(Clone)]
pub struct KeyBytes(Box<[u8; KEY_LEN]>);

impl KeyBytes {
    /// Copy `key` into a new buffer.
    ///
    /// # Errors
    ///
    /// Returns [`KeyStoreError::InvalidLength`] if `key` is not [`KEY_LEN`] bytes.
    pub fn from_slice(key: &[u8]) -> Result<Self, KeyStoreError> {
        if key.len() != KEY_LEN {
            return Err(KeyStoreError::InvalidLength(key.len()));
        }
        let mut buf = Box::new([0u8; KEY_LEN]);
        buf.copy_from_slice(key);
        Ok(Self(buf))
    }

    /// A fresh random key from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut key = crypto::generate_key();
        let bytes = Self(Box::new(key));
        key.iter_mut().for_each(|b| *b = 0);
        bytes
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..]
    }
}

impl Drop for KeyBytes {
    fn drop(&mut self) {
        // Zero the key material on drop.
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for KeyBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material — not even in debug builds.
        f.write_str("KeyBytes([REDACTED])")
    }
}

/// Thread-safe in-memory store of keys by identifier.
///
/// Wraps an `Arc<ArcSwap<HashMap<..>>>` so that:
/// - Readers (encrypt/decrypt calls) never block and never contend.
/// - Writers build a new map and swap it in atomically; concurrent writers
///   retry via read-copy-update so no update is lost.
#[derive(Clone, Debug)]
pub struct MemoryKeyStore {
    inner: Arc<ArcSwap<HashMap<String, KeyBytes>>>,
}

impl MemoryKeyStore {
    /// Create a new, empty [`MemoryKeyStore`].
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ArcSwap::new(Arc::new(HashMap::new()))),
        }
    }

    /// Return the number of keys currently stored.
    pub fn len(&self) -> usize {
        self.inner.load().len()
    }

    /// Return `true` if no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.inner.load().is_empty()
    }
}

impl Default for MemoryKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyStore for MemoryKeyStore {
    fn store(&self, id: &str, key: &[u8]) -> Result<(), KeyStoreError> {
        validate_key_id(id)?;
        let key = KeyBytes::from_slice(key)?;
        self.inner.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.insert(id.to_owned(), key.clone());
            next
        });
        Ok(())
    }

    fn retrieve(&self, id: &str) -> Result<KeyBytes, KeyStoreError> {
        self.inner
            .load()
            .get(id)
            .cloned()
            .ok_or_else(|| KeyStoreError::NotFound(id.to_owned()))
    }

    fn delete(&self, id: &str) -> Result<(), KeyStoreError> {
        let mut removed = false;
        self.inner.rcu(|current| {
            let mut next = HashMap::clone(current);
            removed = next.remove(id).is_some();
            next
        });
        if removed {
            Ok(())
        } else {
            Err(KeyStoreError::NotFound(id.to_owned()))
        }
    }

    fn contains(&self, id: &str) -> bool {
        self.inner.load().contains_key(id)
    }
}
