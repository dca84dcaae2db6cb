//! Packing and unpacking of `UMBR` envelopes.
//!
//! The encoder validates IV and tag sizes up front so that every envelope it
//! emits can be decoded unambiguously. Tag presence is carried explicitly in
//! the flags byte; [`unpack_legacy`] keeps the older length-based inference
//! for blobs written before the flag existed.

use std::ops::Range;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::EnvelopeError;
use crate::protocol::EnvelopeInfo;

/// Leading magic bytes of every envelope (`"UMBR"`).
pub const MAGIC: [u8; 4] = *b"UMBR";

/// Current (and only) format version.
pub const VERSION: u8 = 1;

/// Length of magic + version + flags + reserved.
pub const HEADER_LEN: usize = 8;

/// Length of the cipher IV / nonce.
pub const IV_LEN: usize = 12;

/// Length of the AEAD authentication tag.
pub const TAG_LEN: usize = 16;

/// Smallest buffer [`unpack`] accepts. A bare header + IV is rejected.
pub const MIN_ENVELOPE_LEN: usize = HEADER_LEN + IV_LEN + 1;

/// Flags bit: the final [`TAG_LEN`] bytes are an authentication tag.
pub const FLAG_HAS_TAG: u8 = 0x01;

const PAYLOAD_OFFSET: usize = HEADER_LEN + IV_LEN;

/// An owned, decoded envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Cipher IV / nonce.
    pub iv: [u8; IV_LEN],
    /// Encrypted payload. May be empty only when a tag is present.
    pub ciphertext: Vec<u8>,
    /// AEAD tag, if the cipher produced one.
    pub tag: Option<[u8; TAG_LEN]>,
}

impl Envelope {
    /// Build an envelope from loosely-sized parts, enforcing the encoder
    /// preconditions.
    ///
    /// # Errors
    ///
    /// Same as [`pack`].
    pub fn new(
        iv: &[u8],
        ciphertext: impl Into<Vec<u8>>,
        tag: Option<&[u8]>,
    ) -> Result<Self, EnvelopeError> {
        let ciphertext = ciphertext.into();
        let (iv, tag) = check_parts(iv, &ciphertext, tag)?;
        Ok(Self {
            iv: *iv,
            ciphertext,
            tag: tag.copied(),
        })
    }

    /// The flags byte this envelope encodes with.
    pub fn flags(&self) -> u8 {
        flags_for(self.tag.is_some())
    }

    /// Total encoded size in bytes.
    pub fn encoded_len(&self) -> usize {
        encoded_len(self.ciphertext.len(), self.tag.is_some())
    }

    /// Serialise to the wire format.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::EmptyPayload`] if the envelope has neither
    /// ciphertext nor tag.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EnvelopeError> {
        if self.ciphertext.is_empty() && self.tag.is_none() {
            return Err(EnvelopeError::EmptyPayload);
        }
        let mut out = Vec::with_capacity(self.encoded_len());
        write_parts(&mut out, &self.iv, &self.ciphertext, self.tag.as_ref());
        Ok(out)
    }

    /// Parse from the wire format. Alias for [`unpack`].
    pub fn from_bytes(data: &[u8]) -> Result<Self, EnvelopeError> {
        unpack(data)
    }
}

/// A decoded envelope borrowing from the input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeView<'a> {
    pub iv: &'a [u8; IV_LEN],
    pub ciphertext: &'a [u8],
    pub tag: Option<&'a [u8; TAG_LEN]>,
}

impl EnvelopeView<'_> {
    /// Copy the borrowed parts into an owned [`Envelope`].
    pub fn into_owned(self) -> Envelope {
        Envelope {
            iv: *self.iv,
            ciphertext: self.ciphertext.to_vec(),
            tag: self.tag.copied(),
        }
    }
}

/// A decoded envelope whose parts are slices of one shared [`Bytes`] buffer.
///
/// Only [`unpack_bytes`] builds one, so the IV is always [`IV_LEN`] bytes and
/// the tag, when present, [`TAG_LEN`] bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedEnvelope {
    iv: Bytes,
    ciphertext: Bytes,
    tag: Option<Bytes>,
}

impl SharedEnvelope {
    pub fn iv(&self) -> &Bytes {
        &self.iv
    }

    pub fn ciphertext(&self) -> &Bytes {
        &self.ciphertext
    }

    pub fn tag(&self) -> Option<&Bytes> {
        self.tag.as_ref()
    }

    /// Copy the parts into an owned [`Envelope`].
    pub fn to_envelope(&self) -> Envelope {
        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&self.iv);
        let tag = self.tag.as_ref().map(|t| {
            let mut tag = [0u8; TAG_LEN];
            tag.copy_from_slice(t);
            tag
        });
        Envelope {
            iv,
            ciphertext: self.ciphertext.to_vec(),
            tag,
        }
    }
}

/// Serialise `iv`, `ciphertext` and an optional `tag` into one envelope.
///
/// # Errors
///
/// - [`EnvelopeError::InvalidIvLength`] if `iv` is not [`IV_LEN`] bytes.
/// - [`EnvelopeError::InvalidTagLength`] if `tag` is not [`TAG_LEN`] bytes.
/// - [`EnvelopeError::EmptyPayload`] if `ciphertext` is empty and there is no tag.
pub fn pack(iv: &[u8], ciphertext: &[u8], tag: Option<&[u8]>) -> Result<Vec<u8>, EnvelopeError> {
    let (iv, tag) = check_parts(iv, ciphertext, tag)?;
    let mut out = Vec::with_capacity(encoded_len(ciphertext.len(), tag.is_some()));
    write_parts(&mut out, iv, ciphertext, tag);
    Ok(out)
}

/// [`pack`] into a frozen [`Bytes`] buffer.
pub fn pack_bytes(
    iv: &[u8],
    ciphertext: &[u8],
    tag: Option<&[u8]>,
) -> Result<Bytes, EnvelopeError> {
    let (iv, tag) = check_parts(iv, ciphertext, tag)?;
    let mut out = BytesMut::with_capacity(encoded_len(ciphertext.len(), tag.is_some()));
    write_parts(&mut out, iv, ciphertext, tag);
    Ok(out.freeze())
}

/// Decode an envelope without copying.
///
/// # Errors
///
/// Returns a format error if `data` is too short, carries the wrong magic or
/// version, has unknown flags or non-zero reserved bytes, or claims a tag it
/// does not contain.
pub fn parse(data: &[u8]) -> Result<EnvelopeView<'_>, EnvelopeError> {
    let layout = layout(data, TagRule::Flagged)?;
    view(data, &layout)
}

/// Decode an envelope into owned parts.
///
/// # Errors
///
/// Same as [`parse`].
pub fn unpack(data: &[u8]) -> Result<Envelope, EnvelopeError> {
    parse(data).map(EnvelopeView::into_owned)
}

/// Decode an envelope held in a [`Bytes`] buffer; the returned parts share it.
///
/// # Errors
///
/// Same as [`parse`].
pub fn unpack_bytes(data: Bytes) -> Result<SharedEnvelope, EnvelopeError> {
    let layout = layout(&data, TagRule::Flagged)?;
    Ok(SharedEnvelope {
        iv: data.slice(HEADER_LEN..PAYLOAD_OFFSET),
        ciphertext: data.slice(layout.ciphertext.clone()),
        tag: layout.tag.map(|range| data.slice(range)),
    })
}

/// Decode an envelope written by a producer that never set the tag flag.
///
/// The flags and reserved bytes are ignored and a tag is assumed whenever at
/// least [`TAG_LEN`] bytes follow the IV. A tag-less ciphertext of 16 bytes or
/// more is therefore split wrongly; prefer [`unpack`] for anything this crate
/// produced.
///
/// # Errors
///
/// Returns [`EnvelopeError::TooShort`], [`EnvelopeError::BadMagic`] or
/// [`EnvelopeError::UnsupportedVersion`].
pub fn unpack_legacy(data: &[u8]) -> Result<Envelope, EnvelopeError> {
    parse_legacy(data).map(EnvelopeView::into_owned)
}

/// Zero-copy form of [`unpack_legacy`].
///
/// # Errors
///
/// Same as [`unpack_legacy`].
pub fn parse_legacy(data: &[u8]) -> Result<EnvelopeView<'_>, EnvelopeError> {
    let layout = layout(data, TagRule::TrailingLength)?;
    view(data, &layout)
}

/// Describe an envelope's header and part sizes without copying its payload.
///
/// # Errors
///
/// Same as [`parse`].
pub fn inspect(data: &[u8]) -> Result<EnvelopeInfo, EnvelopeError> {
    let layout = layout(data, TagRule::Flagged)?;
    Ok(EnvelopeInfo {
        version: data[4],
        flags: layout.flags,
        has_tag: layout.tag.is_some(),
        iv_len: IV_LEN,
        ciphertext_len: layout.ciphertext.len(),
        tag_len: layout.tag.map_or(0, |range| range.len()),
        total_len: data.len(),
    })
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

/// How the decoder decides whether a tag trails the ciphertext.
#[derive(Debug, Clone, Copy)]
enum TagRule {
    /// Trust the flags byte.
    Flagged,
    /// Infer from the number of bytes after the IV.
    TrailingLength,
}

/// Byte ranges of a validated envelope.
struct Layout {
    flags: u8,
    ciphertext: Range<usize>,
    tag: Option<Range<usize>>,
}

fn layout(data: &[u8], rule: TagRule) -> Result<Layout, EnvelopeError> {
    if data.len() < MIN_ENVELOPE_LEN {
        return Err(EnvelopeError::TooShort(data.len()));
    }
    if data[..4] != MAGIC {
        return Err(EnvelopeError::BadMagic);
    }
    if data[4] != VERSION {
        return Err(EnvelopeError::UnsupportedVersion(data[4]));
    }

    let flags = data[5];
    let remaining = data.len() - PAYLOAD_OFFSET;
    let has_tag = match rule {
        TagRule::Flagged => {
            if flags & !FLAG_HAS_TAG != 0 {
                return Err(EnvelopeError::UnknownFlags(flags));
            }
            if data[6..HEADER_LEN] != [0, 0] {
                return Err(EnvelopeError::ReservedNotZero);
            }
            let has_tag = flags & FLAG_HAS_TAG != 0;
            if has_tag && remaining < TAG_LEN {
                return Err(EnvelopeError::TruncatedTag);
            }
            has_tag
        }
        TagRule::TrailingLength => remaining >= TAG_LEN,
    };

    let end = if has_tag {
        data.len() - TAG_LEN
    } else {
        data.len()
    };
    Ok(Layout {
        flags,
        ciphertext: PAYLOAD_OFFSET..end,
        tag: has_tag.then(|| end..data.len()),
    })
}

fn view<'a>(data: &'a [u8], layout: &Layout) -> Result<EnvelopeView<'a>, EnvelopeError> {
    let iv: &[u8; IV_LEN] = data[HEADER_LEN..PAYLOAD_OFFSET]
        .try_into()
        .map_err(|_| EnvelopeError::TooShort(data.len()))?;
    let tag: Option<&[u8; TAG_LEN]> = match &layout.tag {
        Some(range) => Some(
            data[range.clone()]
                .try_into()
                .map_err(|_| EnvelopeError::TruncatedTag)?,
        ),
        None => None,
    };
    Ok(EnvelopeView {
        iv,
        ciphertext: &data[layout.ciphertext.clone()],
        tag,
    })
}

type CheckedParts<'a> = (&'a [u8; IV_LEN], Option<&'a [u8; TAG_LEN]>);

fn check_parts<'a>(
    iv: &'a [u8],
    ciphertext: &[u8],
    tag: Option<&'a [u8]>,
) -> Result<CheckedParts<'a>, EnvelopeError> {
    let iv: &[u8; IV_LEN] = iv
        .try_into()
        .map_err(|_| EnvelopeError::InvalidIvLength(iv.len()))?;
    let tag: Option<&[u8; TAG_LEN]> = match tag {
        Some(t) => Some(
            t.try_into()
                .map_err(|_| EnvelopeError::InvalidTagLength(t.len()))?,
        ),
        None => None,
    };
    if ciphertext.is_empty() && tag.is_none() {
        return Err(EnvelopeError::EmptyPayload);
    }
    Ok((iv, tag))
}

fn write_parts<B: BufMut>(
    out: &mut B,
    iv: &[u8; IV_LEN],
    ciphertext: &[u8],
    tag: Option<&[u8; TAG_LEN]>,
) {
    out.put_slice(&MAGIC);
    out.put_u8(VERSION);
    out.put_u8(flags_for(tag.is_some()));
    // reserved
    out.put_u16(0);
    out.put_slice(iv);
    out.put_slice(ciphertext);
    if let Some(tag) = tag {
        out.put_slice(tag);
    }
}

fn flags_for(has_tag: bool) -> u8 {
    if has_tag {
        FLAG_HAS_TAG
    } else {
        0
    }
}

fn encoded_len(ciphertext_len: usize, has_tag: bool) -> usize {
    PAYLOAD_OFFSET + ciphertext_len + if has_tag { TAG_LEN } else { 0 }
}
