//! AEAD encryption and decryption of payloads into `UMBR` envelopes.
//!
//! Both supported ciphers take a 256-bit key and a 96-bit nonce and produce a
//! detached 128-bit tag, which is exactly the shape the envelope carries.
//!
//! **Nonces are random per call.** Never reuse a nonce with AES-256-GCM under
//! the same key; it breaks both confidentiality and authentication.

use std::fmt;
use std::str::FromStr;

use aes_gcm::{
    aead::{
        consts::{U12, U16},
        generic_array::GenericArray,
        rand_core::RngCore,
        AeadInPlace, KeyInit, OsRng,
    },
    Aes256Gcm,
};
use aes_gcm_siv::Aes256GcmSiv;
use envelope::{EnvelopeError, IV_LEN};
use thiserror::Error;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of the AEAD nonce; identical to the envelope IV.
pub const NONCE_LEN: usize = IV_LEN;

/// Symmetric AEAD algorithm used to seal envelopes.
///
/// The envelope does not record the algorithm, so both ends must agree on it
/// out of band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Algorithm {
    /// AES-256-GCM (NIST SP 800-38D).
    #[default]
    Aes256Gcm,
    /// AES-256-GCM-SIV (RFC 8452), nonce-misuse-resistant.
    Aes256GcmSiv,
}

impl Algorithm {
    /// Canonical lowercase name, as accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Aes256Gcm => "aes-256-gcm",
            Algorithm::Aes256GcmSiv => "aes-256-gcm-siv",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = CipherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aes-256-gcm" | "aes256gcm" => Ok(Algorithm::Aes256Gcm),
            "aes-256-gcm-siv" | "aes256gcmsiv" => Ok(Algorithm::Aes256GcmSiv),
            other => Err(CipherError::UnknownAlgorithm(other.to_owned())),
        }
    }
}

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The key is the wrong length (must be [`KEY_LEN`] bytes).
    #[error("invalid key length: expected {KEY_LEN} bytes, got {0}")]
    InvalidKeyLength(usize),

    /// The algorithm name is not recognised.
    #[error("unknown cipher algorithm: {0}")]
    UnknownAlgorithm(String),

    /// The input is not a well-formed envelope.
    #[error("malformed envelope: {0}")]
    Envelope(#[from] EnvelopeError),

    /// The envelope carries no authentication tag, so it cannot be opened by an AEAD.
    #[error("envelope has no authentication tag")]
    MissingTag,

    /// AEAD encryption failed, or decryption failed authentication
    /// (wrong key, wrong associated data, or tampered data).
    #[error("aead operation failed")]
    AeadFailure,
}

/// Encrypt `plaintext` and package the result as an envelope.
///
/// A fresh random nonce is drawn from the OS CSPRNG for every call. `aad` is
/// authenticated but not encrypted and must be supplied again to [`open`].
///
/// # Errors
///
/// Returns [`CipherError::InvalidKeyLength`] if `key` is not [`KEY_LEN`] bytes,
/// or [`CipherError::AeadFailure`] on an internal AEAD error.
pub fn seal(
    algorithm: Algorithm,
    key: &[u8],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, CipherError> {
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    seal_with_nonce(algorithm, key, &nonce, plaintext, aad)
}

/// Decrypt an envelope produced by [`seal`].
///
/// Envelopes from producers that never set the tag flag are accepted too: an
/// AEAD envelope always ends in a tag, so a flag-less one is re-split with
/// [`envelope::parse_legacy`].
///
/// # Errors
///
/// - [`CipherError::Envelope`] if `data` is not a valid envelope.
/// - [`CipherError::MissingTag`] if the envelope is too short to carry a tag.
/// - [`CipherError::InvalidKeyLength`] if `key` is not [`KEY_LEN`] bytes.
/// - [`CipherError::AeadFailure`] if authentication fails.
pub fn open(
    algorithm: Algorithm,
    key: &[u8],
    data: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, CipherError> {
    let view = match envelope::parse(data)? {
        view if view.tag.is_none() => envelope::parse_legacy(data)?,
        view => view,
    };
    let tag = view.tag.ok_or(CipherError::MissingTag)?;
    let mut buffer = view.ciphertext.to_vec();
    match algorithm {
        Algorithm::Aes256Gcm => {
            decrypt_detached(&build::<Aes256Gcm>(key)?, view.iv, aad, &mut buffer, tag)?
        }
        Algorithm::Aes256GcmSiv => {
            decrypt_detached(&build::<Aes256GcmSiv>(key)?, view.iv, aad, &mut buffer, tag)?
        }
    }
    Ok(buffer)
}

/// [`seal`] with a caller-chosen nonce. Only for deterministic test vectors.
pub(crate) fn seal_with_nonce(
    algorithm: Algorithm,
    key: &[u8],
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, CipherError> {
    let mut buffer = plaintext.to_vec();
    let tag = match algorithm {
        Algorithm::Aes256Gcm => {
            encrypt_detached(&build::<Aes256Gcm>(key)?, nonce, aad, &mut buffer)?
        }
        Algorithm::Aes256GcmSiv => {
            encrypt_detached(&build::<Aes256GcmSiv>(key)?, nonce, aad, &mut buffer)?
        }
    };
    Ok(envelope::pack(nonce, &buffer, Some(tag.as_slice()))?)
}

/// Generate a fresh random key of [`KEY_LEN`] bytes.
pub fn generate_key() -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    OsRng.fill_bytes(&mut key);
    key
}

fn build<C: KeyInit>(key: &[u8]) -> Result<C, CipherError> {
    if key.len() != KEY_LEN {
        return Err(CipherError::InvalidKeyLength(key.len()));
    }
    C::new_from_slice(key).map_err(|_| CipherError::InvalidKeyLength(key.len()))
}

fn encrypt_detached<C>(
    cipher: &C,
    nonce: &[u8; NONCE_LEN],
    aad: &[u8],
    buffer: &mut [u8],
) -> Result<[u8; envelope::TAG_LEN], CipherError>
where
    C: AeadInPlace<NonceSize = U12, TagSize = U16>,
{
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(nonce.as_slice()), aad, buffer)
        .map_err(|_| CipherError::AeadFailure)?;
    let mut out = [0u8; envelope::TAG_LEN];
    out.copy_from_slice(tag.as_slice());
    Ok(out)
}

fn decrypt_detached<C>(
    cipher: &C,
    nonce: &[u8; NONCE_LEN],
    aad: &[u8],
    buffer: &mut [u8],
    tag: &[u8; envelope::TAG_LEN],
) -> Result<(), CipherError>
where
    C: AeadInPlace<NonceSize = U12, TagSize = U16>,
{
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(nonce.as_slice()),
            aad,
            buffer,
            GenericArray::from_slice(tag.as_slice()),
        )
        .map_err(|_| CipherError::AeadFailure)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALGORITHMS: [Algorithm; 2] = [Algorithm::Aes256Gcm, Algorithm::Aes256GcmSiv];

    #[test]
    fn seal_open_round_trip() {
        let key = generate_key();
        for alg in ALGORITHMS {
            let sealed = seal(alg, &key, b"123-45-6789", b"").unwrap();
            assert_eq!(&sealed[..4], b"UMBR");
            assert_eq!(open(alg, &key, &sealed, b"").unwrap(), b"123-45-6789");
        }
    }

    #[test]
    fn sealed_envelope_has_tag_and_plaintext_sized_ciphertext() {
        let key = generate_key();
        let sealed = seal(Algorithm::Aes256Gcm, &key, b"hello", b"").unwrap();
        let env = envelope::unpack(&sealed).unwrap();
        assert_eq!(env.ciphertext.len(), 5);
        assert!(env.tag.is_some());
    }

    #[test]
    fn empty_plaintext_round_trips() {
        let key = generate_key();
        let sealed = seal(Algorithm::Aes256Gcm, &key, b"", b"").unwrap();
        assert_eq!(sealed.len(), 8 + 12 + 16);
        assert!(open(Algorithm::Aes256Gcm, &key, &sealed, b"").unwrap().is_empty());
    }

    #[test]
    fn wrong_key_fails_decryption() {
        let sealed = seal(Algorithm::Aes256Gcm, &generate_key(), b"secret", b"").unwrap();
        let result = open(Algorithm::Aes256Gcm, &generate_key(), &sealed, b"");
        assert!(matches!(result, Err(CipherError::AeadFailure)));
    }

    #[test]
    fn wrong_associated_data_fails() {
        let key = generate_key();
        let sealed = seal(Algorithm::Aes256GcmSiv, &key, b"secret", b"ctx-a").unwrap();
        assert!(open(Algorithm::Aes256GcmSiv, &key, &sealed, b"ctx-b").is_err());
        assert!(open(Algorithm::Aes256GcmSiv, &key, &sealed, b"ctx-a").is_ok());
    }

    #[test]
    fn algorithm_mismatch_fails() {
        let key = generate_key();
        let sealed = seal(Algorithm::Aes256Gcm, &key, b"secret", b"").unwrap();
        assert!(open(Algorithm::Aes256GcmSiv, &key, &sealed, b"").is_err());
    }

    #[test]
    fn invalid_key_length_rejected() {
        let short_key = vec![0u8; 16];
        assert!(matches!(
            seal(Algorithm::Aes256Gcm, &short_key, b"x", b""),
            Err(CipherError::InvalidKeyLength(16))
        ));
    }

    #[test]
    fn tampered_ciphertext_fails_auth() {
        let key = generate_key();
        let mut sealed = seal(Algorithm::Aes256Gcm, &key, b"tamper me", b"").unwrap();
        // Flip a ciphertext byte just past the header and IV.
        sealed[20] ^= 0xFF;
        assert!(matches!(
            open(Algorithm::Aes256Gcm, &key, &sealed, b""),
            Err(CipherError::AeadFailure)
        ));
    }

    #[test]
    fn malformed_envelope_reported_as_format_error() {
        let key = generate_key();
        let mut sealed = seal(Algorithm::Aes256Gcm, &key, b"data", b"").unwrap();
        sealed[0] = b'X';
        assert!(matches!(
            open(Algorithm::Aes256Gcm, &key, &sealed, b""),
            Err(CipherError::Envelope(EnvelopeError::BadMagic))
        ));
    }

    #[test]
    fn tagless_envelope_rejected() {
        let key = generate_key();
        let data = envelope::pack(&[0u8; NONCE_LEN], b"no tag here", None).unwrap();
        assert!(matches!(
            open(Algorithm::Aes256Gcm, &key, &data, b""),
            Err(CipherError::MissingTag)
        ));
    }

    #[test]
    fn opens_envelope_without_tag_flag() {
        let key = generate_key();
        for alg in ALGORITHMS {
            let mut sealed = seal(alg, &key, b"legacy payload", b"ctx").unwrap();
            sealed[5] = 0;
            assert_eq!(open(alg, &key, &sealed, b"ctx").unwrap(), b"legacy payload");
        }

        // Sixteen plaintext bytes put exactly one tag's worth after the ciphertext.
        let mut sealed = seal(Algorithm::Aes256Gcm, &key, &[0x33u8; 16], b"").unwrap();
        sealed[5] = 0;
        assert_eq!(
            open(Algorithm::Aes256Gcm, &key, &sealed, b"").unwrap(),
            vec![0x33u8; 16]
        );
    }

    #[test]
    fn unflagged_tamper_still_fails_auth() {
        let key = generate_key();
        let mut sealed = seal(Algorithm::Aes256Gcm, &key, b"legacy payload", b"").unwrap();
        sealed[5] = 0;
        sealed[21] ^= 0x01;
        assert!(matches!(
            open(Algorithm::Aes256Gcm, &key, &sealed, b""),
            Err(CipherError::AeadFailure)
        ));
    }

    #[test]
    fn fixed_nonce_is_deterministic_and_lands_in_iv() {
        let key = [0x42u8; KEY_LEN];
        let nonce = [0x11u8; NONCE_LEN];
        let a = seal_with_nonce(Algorithm::Aes256GcmSiv, &key, &nonce, b"abc", b"").unwrap();
        let b = seal_with_nonce(Algorithm::Aes256GcmSiv, &key, &nonce, b"abc", b"").unwrap();
        assert_eq!(a, b);
        assert_eq!(&a[8..20], &nonce);
    }

    #[test]
    fn algorithm_names_parse() {
        assert_eq!("aes-256-gcm".parse::<Algorithm>().unwrap(), Algorithm::Aes256Gcm);
        assert_eq!(
            "AES-256-GCM-SIV".parse::<Algorithm>().unwrap(),
            Algorithm::Aes256GcmSiv
        );
        assert!("aes-128-cbc".parse::<Algorithm>().is_err());
        assert_eq!(Algorithm::default().to_string(), "aes-256-gcm");
    }
}
