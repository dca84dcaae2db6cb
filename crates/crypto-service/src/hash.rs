//! Message digests and keyed MACs.

use std::fmt;
use std::str::FromStr;

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Byte length of an HMAC-SHA-256 output.
pub const MAC_LEN: usize = 32;

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha512,
}

impl HashAlgorithm {
    /// Digest length in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha512 => 64,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha512 => "sha512",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(HashAlgorithm::Sha256),
            "sha512" | "sha-512" => Ok(HashAlgorithm::Sha512),
            other => Err(HashError::UnknownAlgorithm(other.to_owned())),
        }
    }
}

/// Errors produced by the hashing layer.
#[derive(Debug, Error)]
pub enum HashError {
    #[error("unknown hash algorithm: {0}")]
    UnknownAlgorithm(String),

    /// The MAC key was rejected by the HMAC implementation.
    #[error("invalid MAC key")]
    InvalidMacKey,
}

/// Compute the digest of `data`.
pub fn digest(algorithm: HashAlgorithm, data: &[u8]) -> Vec<u8> {
    match algorithm {
        HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
        HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
    }
}

/// Compare the digest of `data` against `expected` in constant time.
pub fn verify_digest(algorithm: HashAlgorithm, data: &[u8], expected: &[u8]) -> bool {
    digest(algorithm, data).as_slice().ct_eq(expected).into()
}

/// HMAC-SHA-256 of `data` under `key`.
///
/// # Errors
///
/// Returns [`HashError::InvalidMacKey`] if the key is rejected.
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, HashError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key).map_err(|_| HashError::InvalidMacKey)?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Verify an HMAC-SHA-256 tag in constant time.
///
/// # Errors
///
/// Returns [`HashError::InvalidMacKey`] if the key is rejected.
pub fn verify_hmac_sha256(key: &[u8], data: &[u8], expected: &[u8]) -> Result<bool, HashError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key).map_err(|_| HashError::InvalidMacKey)?;
    mac.update(data);
    Ok(mac.verify_slice(expected).is_ok())
}
