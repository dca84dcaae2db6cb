//! Structured logging setup.
//!
//! JSON-formatted `tracing` events are written to **stderr**; stdout is
//! reserved for command output (envelopes, plaintext, digests).
//!
//! # Telemetry invariants
//!
//! - **No plaintext or key material** may appear in any log field.
//! - Log level is configurable via `UMBRA_LOG_LEVEL` (default: `warn`);
//!   `RUST_LOG` takes precedence when set.

pub mod init;

pub use init::init_telemetry;
