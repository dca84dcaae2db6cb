//! Property-based tests for the envelope codec.
//!
//! - Packed envelopes decode to the parts they were built from
//! - Any corruption of the magic bytes is rejected
//! - Any version other than 1 is rejected
//! - Buffers no longer than header + IV are rejected

use proptest::prelude::*;

use crate::codec::{pack, unpack, HEADER_LEN, IV_LEN, TAG_LEN, VERSION};
use crate::error::EnvelopeError;

fn iv_strategy() -> impl Strategy<Value = [u8; IV_LEN]> {
    prop::array::uniform12(any::<u8>())
}

fn tag_strategy() -> impl Strategy<Value = Option<[u8; TAG_LEN]>> {
    prop::option::of(prop::array::uniform16(any::<u8>()))
}

proptest! {
    /// Every valid set of parts survives pack then unpack unchanged.
    #[test]
    fn round_trip(
        iv in iv_strategy(),
        ciphertext in prop::collection::vec(any::<u8>(), 1..256),
        tag in tag_strategy(),
    ) {
        let packed = pack(&iv, &ciphertext, tag.as_ref().map(|t| &t[..])).unwrap();
        let env = unpack(&packed).unwrap();
        prop_assert_eq!(env.iv, iv);
        prop_assert_eq!(env.ciphertext, ciphertext);
        prop_assert_eq!(env.tag, tag);
    }

    /// Changing any magic byte makes the envelope unreadable.
    #[test]
    fn magic_corruption_rejected(
        iv in iv_strategy(),
        ciphertext in prop::collection::vec(any::<u8>(), 1..64),
        index in 0usize..4,
        flip in 1u8..=255,
    ) {
        let mut packed = pack(&iv, &ciphertext, None).unwrap();
        packed[index] ^= flip;
        prop_assert_eq!(unpack(&packed), Err(EnvelopeError::BadMagic));
    }

    /// Only version 1 decodes.
    #[test]
    fn foreign_version_rejected(
        iv in iv_strategy(),
        version in any::<u8>().prop_filter("not the current version", |v| *v != VERSION),
    ) {
        let mut packed = pack(&iv, b"ciphertext", None).unwrap();
        packed[4] = version;
        prop_assert_eq!(unpack(&packed), Err(EnvelopeError::UnsupportedVersion(version)));
    }

    /// Nothing of length 20 or less is ever accepted, whatever its contents.
    #[test]
    fn short_buffers_rejected(data in prop::collection::vec(any::<u8>(), 0..=HEADER_LEN + IV_LEN)) {
        prop_assert_eq!(unpack(&data), Err(EnvelopeError::TooShort(data.len())));
    }
}
