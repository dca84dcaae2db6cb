//! [`LoggingCryptoService`]: wraps any [`CryptoService`] and records each
//! operation as a structured `tracing` event.
//!
//! Only identifiers, sizes, algorithms and outcomes are recorded. Plaintext,
//! ciphertext, digests and key material never reach the log.

use tracing::{debug, info, warn};

use super::{CryptoService, CryptoServiceError};
use crate::hash::HashAlgorithm;

/// Decorator that logs every call before delegating to the inner service.
#[derive(Debug, Clone)]
pub struct LoggingCryptoService<S> {
    inner: S,
}

impl<S: CryptoService> LoggingCryptoService<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

fn log_failure(operation: &'static str, key_id: &str, err: &CryptoServiceError) {
    warn!(
        operation,
        key_id,
        kind = err.kind().as_str(),
        error = %err,
        "crypto operation failed"
    );
}

impl<S: CryptoService> CryptoService for LoggingCryptoService<S> {
    fn encrypt(&self, key_id: &str, plaintext: &[u8]) -> Result<Vec<u8>, CryptoServiceError> {
        debug!(operation = "encrypt", key_id, input_len = plaintext.len(), "starting");
        let result = self.inner.encrypt(key_id, plaintext);
        match &result {
            Ok(envelope) => info!(
                operation = "encrypt",
                key_id,
                input_len = plaintext.len(),
                output_len = envelope.len(),
                "encrypted"
            ),
            Err(e) => log_failure("encrypt", key_id, e),
        }
        result
    }

    fn decrypt(&self, key_id: &str, envelope: &[u8]) -> Result<Vec<u8>, CryptoServiceError> {
        debug!(operation = "decrypt", key_id, input_len = envelope.len(), "starting");
        let result = self.inner.decrypt(key_id, envelope);
        match &result {
            Ok(plaintext) => info!(
                operation = "decrypt",
                key_id,
                input_len = envelope.len(),
                output_len = plaintext.len(),
                "decrypted"
            ),
            Err(e) => log_failure("decrypt", key_id, e),
        }
        result
    }

    fn hash(&self, algorithm: HashAlgorithm, data: &[u8]) -> Vec<u8> {
        debug!(operation = "hash", algorithm = %algorithm, input_len = data.len(), "hashing");
        self.inner.hash(algorithm, data)
    }

    fn verify_hash(&self, algorithm: HashAlgorithm, data: &[u8], expected: &[u8]) -> bool {
        let matched = self.inner.verify_hash(algorithm, data, expected);
        if matched {
            debug!(operation = "verify_hash", algorithm = %algorithm, "digest matched");
        } else {
            warn!(operation = "verify_hash", algorithm = %algorithm, "digest mismatch");
        }
        matched
    }

    fn mac(&self, key_id: &str, data: &[u8]) -> Result<Vec<u8>, CryptoServiceError> {
        let result = self.inner.mac(key_id, data);
        match &result {
            Ok(_) => debug!(operation = "mac", key_id, input_len = data.len(), "computed"),
            Err(e) => log_failure("mac", key_id, e),
        }
        result
    }

    fn generate_key(&self, key_id: Option<&str>) -> Result<String, CryptoServiceError> {
        let result = self.inner.generate_key(key_id);
        match &result {
            Ok(id) => info!(operation = "generate_key", key_id = %id, "key generated"),
            Err(e) => log_failure("generate_key", key_id.unwrap_or("<generated>"), e),
        }
        result
    }
}
