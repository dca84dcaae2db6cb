//! Symmetric encryption into `UMBR` envelopes, hashing, and key storage.
//!
//! The [`service::CryptoService`] trait is the entry point for callers; the
//! lower layers ([`crypto`], [`hash`], [`keys`]) are usable on their own.

pub mod config;
pub mod crypto;
pub mod hash;
pub mod keys;
pub mod service;
pub mod telemetry;

pub use service::{CryptoService, CryptoServiceError, DefaultCryptoService, LoggingCryptoService};
