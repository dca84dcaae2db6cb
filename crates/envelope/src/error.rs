//! Envelope format errors.

use thiserror::Error;

use crate::codec::{IV_LEN, MIN_ENVELOPE_LEN, TAG_LEN};

/// Errors produced while packing or unpacking an envelope.
///
/// Decode variants describe malformed or tampered input and are recoverable:
/// callers map them to a decryption/parsing failure of their own domain.
/// Encode variants describe violated size preconditions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// The IV passed to the encoder is not [`IV_LEN`] bytes.
    #[error("invalid IV length: expected {IV_LEN} bytes, got {0}")]
    InvalidIvLength(usize),

    /// The tag passed to the encoder is not [`TAG_LEN`] bytes.
    #[error("invalid tag length: expected {TAG_LEN} bytes, got {0}")]
    InvalidTagLength(usize),

    /// An envelope with no ciphertext and no tag cannot be decoded again.
    #[error("envelope must carry ciphertext or a tag")]
    EmptyPayload,

    /// The buffer is shorter than the smallest decodable envelope.
    #[error("envelope too short: need at least {MIN_ENVELOPE_LEN} bytes, got {0}")]
    TooShort(usize),

    /// The leading bytes are not the `UMBR` magic.
    #[error("bad envelope magic")]
    BadMagic,

    /// The version byte names a format this crate does not understand.
    #[error("unsupported envelope version: {0}")]
    UnsupportedVersion(u8),

    /// The flags byte has bits set that this version does not define.
    #[error("unknown envelope flags: {0:#04x}")]
    UnknownFlags(u8),

    /// The reserved header bytes are not zero.
    #[error("reserved envelope header bytes are not zero")]
    ReservedNotZero,

    /// The tag flag is set but fewer than [`TAG_LEN`] bytes follow the IV.
    #[error("envelope tag flag set but tag is truncated")]
    TruncatedTag,
}

impl EnvelopeError {
    /// Returns `true` for errors raised while decoding untrusted input.
    ///
    /// Encoder precondition failures return `false`; they indicate a caller bug
    /// rather than bad data.
    pub fn is_format_error(&self) -> bool {
        !matches!(
            self,
            EnvelopeError::InvalidIvLength(_)
                | EnvelopeError::InvalidTagLength(_)
                | EnvelopeError::EmptyPayload
        )
    }
}
