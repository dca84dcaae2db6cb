//! The [`CryptoService`] trait and its implementations.
//!
//! [`DefaultCryptoService`] is the single real implementation. Cross-cutting
//! behaviour is layered on by wrapping it, e.g. [`LoggingCryptoService`]:
//!
//! ```text
//! LoggingCryptoService<DefaultCryptoService<MemoryKeyStore>>
//! ```
//!
//! Dependencies are injected through generics at construction time.

pub mod logging;

pub use logging::LoggingCryptoService;

use thiserror::Error;
use uuid::Uuid;

use crate::crypto::{self, Algorithm, CipherError};
use crate::hash::{self, HashAlgorithm, HashError};
use crate::keys::{KeyBytes, KeyStore, KeyStoreError};

/// Errors surfaced by a [`CryptoService`].
#[derive(Debug, Error)]
pub enum CryptoServiceError {
    #[error(transparent)]
    Key(#[from] KeyStoreError),

    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error(transparent)]
    Hash(#[from] HashError),
}

/// Coarse error categories reported to callers and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller supplied something unusable (bad key length, bad identifier, unknown algorithm).
    InvalidInput,
    /// The envelope is malformed, tampered with, or was sealed under another key.
    DecryptionFailed,
    /// The named key is not in the store.
    KeyNotFound,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::DecryptionFailed => "decryption_failed",
            ErrorKind::KeyNotFound => "key_not_found",
        }
    }
}

impl CryptoServiceError {
    /// The category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CryptoServiceError::Key(KeyStoreError::NotFound(_)) => ErrorKind::KeyNotFound,
            CryptoServiceError::Key(_) => ErrorKind::InvalidInput,
            CryptoServiceError::Cipher(
                CipherError::Envelope(_) | CipherError::MissingTag | CipherError::AeadFailure,
            ) => ErrorKind::DecryptionFailed,
            CryptoServiceError::Cipher(_) => ErrorKind::InvalidInput,
            CryptoServiceError::Hash(_) => ErrorKind::InvalidInput,
        }
    }
}

/// Encryption, hashing and key management behind one interface.
pub trait CryptoService: Send + Sync {
    /// Encrypt `plaintext` under the key `key_id`, returning an envelope.
    fn encrypt(&self, key_id: &str, plaintext: &[u8]) -> Result<Vec<u8>, CryptoServiceError>;

    /// Decrypt an envelope produced by [`CryptoService::encrypt`] with the same key.
    fn decrypt(&self, key_id: &str, envelope: &[u8]) -> Result<Vec<u8>, CryptoServiceError>;

    /// Digest `data`.
    fn hash(&self, algorithm: HashAlgorithm, data: &[u8]) -> Vec<u8>;

    /// Check `data` against a previously computed digest in constant time.
    fn verify_hash(&self, algorithm: HashAlgorithm, data: &[u8], expected: &[u8]) -> bool;

    /// HMAC-SHA-256 of `data` under the key `key_id`.
    fn mac(&self, key_id: &str, data: &[u8]) -> Result<Vec<u8>, CryptoServiceError>;

    /// Generate a random key and store it under `key_id`, or under a fresh
    /// UUID when `key_id` is `None`. Returns the identifier used.
    fn generate_key(&self, key_id: Option<&str>) -> Result<String, CryptoServiceError>;
}

/// The real [`CryptoService`], sealing with a fixed [`Algorithm`] and
/// optional associated data.
#[derive(Debug, Clone)]
pub struct DefaultCryptoService<K> {
    keys: K,
    algorithm: Algorithm,
    associated_data: Vec<u8>,
}

impl<K: KeyStore> DefaultCryptoService<K> {
    /// Create a service over `keys` using `algorithm` and no associated data.
    pub fn new(keys: K, algorithm: Algorithm) -> Self {
        Self {
            keys,
            algorithm,
            associated_data: Vec::new(),
        }
    }

    /// Authenticate every envelope against `aad` (e.g. a repository or file identifier).
    pub fn with_associated_data(mut self, aad: impl Into<Vec<u8>>) -> Self {
        self.associated_data = aad.into();
        self
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// The key store backing this service.
    pub fn keys(&self) -> &K {
        &self.keys
    }
}

impl<K: KeyStore> CryptoService for DefaultCryptoService<K> {
    fn encrypt(&self, key_id: &str, plaintext: &[u8]) -> Result<Vec<u8>, CryptoServiceError> {
        let key = self.keys.retrieve(key_id)?;
        Ok(crypto::seal(
            self.algorithm,
            key.as_bytes(),
            plaintext,
            &self.associated_data,
        )?)
    }

    fn decrypt(&self, key_id: &str, envelope: &[u8]) -> Result<Vec<u8>, CryptoServiceError> {
        let key = self.keys.retrieve(key_id)?;
        Ok(crypto::open(
            self.algorithm,
            key.as_bytes(),
            envelope,
            &self.associated_data,
        )?)
    }

    fn hash(&self, algorithm: HashAlgorithm, data: &[u8]) -> Vec<u8> {
        hash::digest(algorithm, data)
    }

    fn verify_hash(&self, algorithm: HashAlgorithm, data: &[u8], expected: &[u8]) -> bool {
        hash::verify_digest(algorithm, data, expected)
    }

    fn mac(&self, key_id: &str, data: &[u8]) -> Result<Vec<u8>, CryptoServiceError> {
        let key = self.keys.retrieve(key_id)?;
        Ok(hash::hmac_sha256(key.as_bytes(), data)?)
    }

    fn generate_key(&self, key_id: Option<&str>) -> Result<String, CryptoServiceError> {
        let id = match key_id {
            Some(id) => id.to_owned(),
            None => Uuid::new_v4().to_string(),
        };
        let key = KeyBytes::generate();
        self.keys.store(&id, key.as_bytes())?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KEY_LEN;
    use crate::keys::{MemoryKeyStore, MockKeyStore};
    use envelope::EnvelopeError;
    use mockall::predicate::eq;

    fn service_with_key(id: &str) -> DefaultCryptoService<MemoryKeyStore> {
        let keys = MemoryKeyStore::new();
        keys.store(id, &[0x5Au8; KEY_LEN]).unwrap();
        DefaultCryptoService::new(keys, Algorithm::Aes256Gcm)
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let svc = service_with_key("default");
        let sealed = svc.encrypt("default", b"backup manifest").unwrap();
        assert_eq!(svc.decrypt("default", &sealed).unwrap(), b"backup manifest");
    }

    #[test]
    fn unknown_key_maps_to_key_not_found() {
        let svc = service_with_key("default");
        let err = svc.encrypt("missing", b"x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeyNotFound);
    }

    #[test]
    fn tampered_envelope_maps_to_decryption_failed() {
        let svc = service_with_key("default");
        let mut sealed = svc.encrypt("default", b"payload").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        let err = svc.decrypt("default", &sealed).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecryptionFailed);

        let err = svc.decrypt("default", b"not an envelope").unwrap_err();
        assert!(matches!(
            err,
            CryptoServiceError::Cipher(CipherError::Envelope(EnvelopeError::TooShort(15)))
        ));
    }

    #[test]
    fn associated_data_binds_envelopes() {
        let keys = MemoryKeyStore::new();
        keys.store("k", &[0x11u8; KEY_LEN]).unwrap();
        let repo_a = DefaultCryptoService::new(keys.clone(), Algorithm::Aes256GcmSiv)
            .with_associated_data("repo-a");
        let repo_b =
            DefaultCryptoService::new(keys, Algorithm::Aes256GcmSiv).with_associated_data("repo-b");
        let sealed = repo_a.encrypt("k", b"chunk").unwrap();
        assert!(repo_b.decrypt("k", &sealed).is_err());
        assert_eq!(repo_a.decrypt("k", &sealed).unwrap(), b"chunk");
    }

    #[test]
    fn hash_and_verify() {
        let svc = service_with_key("default");
        let d = svc.hash(HashAlgorithm::Sha256, b"data");
        assert_eq!(d.len(), 32);
        assert!(svc.verify_hash(HashAlgorithm::Sha256, b"data", &d));
        assert!(!svc.verify_hash(HashAlgorithm::Sha512, b"data", &d));
    }

    #[test]
    fn mac_uses_named_key() {
        let svc = service_with_key("default");
        svc.generate_key(Some("other")).unwrap();
        let a = svc.mac("default", b"data").unwrap();
        let b = svc.mac("other", b"data").unwrap();
        assert_ne!(a, b);
        assert_eq!(a, svc.mac("default", b"data").unwrap());
    }

    #[test]
    fn generate_key_assigns_uuid_when_unnamed() {
        let svc = service_with_key("default");
        let id = svc.generate_key(None).unwrap();
        assert!(Uuid::parse_str(&id).is_ok());
        assert!(svc.keys().contains(&id));
        let sealed = svc.encrypt(&id, b"x").unwrap();
        assert_eq!(svc.decrypt(&id, &sealed).unwrap(), b"x");
    }

    #[test]
    fn generate_key_rejects_bad_identifier() {
        let svc = service_with_key("default");
        let err = svc.generate_key(Some("bad id")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn retrieves_key_from_injected_store() {
        let mut keys = MockKeyStore::new();
        keys.expect_retrieve()
            .with(eq("vault"))
            .times(2)
            .returning(|_| KeyBytes::from_slice(&[0x33u8; KEY_LEN]));
        let svc = DefaultCryptoService::new(keys, Algorithm::Aes256Gcm);
        let sealed = svc.encrypt("vault", b"secret").unwrap();
        assert_eq!(svc.decrypt("vault", &sealed).unwrap(), b"secret");
    }

    #[test]
    fn store_failure_propagates() {
        let mut keys = MockKeyStore::new();
        keys.expect_retrieve()
            .returning(|id| Err(KeyStoreError::NotFound(id.to_owned())));
        let svc = DefaultCryptoService::new(keys, Algorithm::Aes256Gcm);
        assert!(matches!(
            svc.decrypt("gone", b"irrelevant"),
            Err(CryptoServiceError::Key(KeyStoreError::NotFound(_)))
        ));
    }
}
