//! Serialisable descriptions of envelopes.
//!
//! These types are emitted as JSON by tooling that needs to report on an
//! envelope without exposing its payload.

use serde::{Deserialize, Serialize};

/// Header fields and part sizes of a decoded envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeInfo {
    /// Format version byte.
    pub version: u8,
    /// Raw flags byte.
    pub flags: u8,
    /// Whether an authentication tag trails the ciphertext.
    pub has_tag: bool,
    pub iv_len: usize,
    pub ciphertext_len: usize,
    /// `0` when there is no tag.
    pub tag_len: usize,
    /// Size of the whole envelope in bytes.
    pub total_len: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_info_serde() {
        let info = EnvelopeInfo {
            version: 1,
            flags: 1,
            has_tag: true,
            iv_len: 12,
            ciphertext_len: 4,
            tag_len: 16,
            total_len: 40,
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["has_tag"], true);
        assert_eq!(json["total_len"], 40);
        let decoded: EnvelopeInfo = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, info);
    }
}
