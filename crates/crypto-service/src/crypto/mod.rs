//! Symmetric AEAD primitives that read and write `UMBR` envelopes.
//!
//! This module is free of key-store and logging concerns. It provides the
//! low-level seal/open operations used by the service layer.
//!
//! # Ciphertext format
//!
//! ```text
//! "UMBR" | 0x01 | flags=0x01 | 00 00 | nonce(12) | ciphertext | tag(16)
//! ```
//!
//! The version byte in the envelope header enables future algorithm or
//! layout migration without breaking existing ciphertext.

pub mod cipher;

pub use cipher::{generate_key, open, seal, Algorithm, CipherError, KEY_LEN};
