//! The `UMBR` encrypted envelope format.
//!
//! An envelope packages the output of a symmetric cipher (IV, ciphertext and
//! an optional AEAD tag) into one self-describing byte sequence that can cross
//! process boundaries or be persisted.
//!
//! # Wire format
//!
//! ```text
//! offset  len  field
//!      0    4  magic       55 4D 42 52 ("UMBR")
//!      4    1  version     01
//!      5    1  flags       bit 0 = tag present
//!      6    2  reserved    00 00
//!      8   12  iv
//!     20    N  ciphertext
//!   20+N   16  tag         (only when the tag flag is set)
//! ```
//!
//! A tag-less envelope is byte-identical to the earlier three-zero-byte
//! reserved layout.

pub mod codec;
pub mod error;
pub mod protocol;

#[cfg(test)]
mod proptests;

pub use codec::{
    inspect, pack, pack_bytes, parse, parse_legacy, unpack, unpack_bytes, unpack_legacy,
    Envelope, EnvelopeView, SharedEnvelope, FLAG_HAS_TAG, HEADER_LEN, IV_LEN, MAGIC,
    MIN_ENVELOPE_LEN, TAG_LEN, VERSION,
};
pub use error::EnvelopeError;
pub use protocol::EnvelopeInfo;
