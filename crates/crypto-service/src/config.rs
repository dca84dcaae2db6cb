//! Configuration loading and validation for `umbra-crypt`.
//!
//! All values are read from `UMBRA_*` environment variables at startup. The
//! process exits with a clear error message if any variable is invalid.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;

use crate::crypto::{Algorithm, KEY_LEN};
use crate::keys::{validate_key_id, KeyBytes};

/// Environment variable prefix for every setting.
pub const ENV_PREFIX: &str = "UMBRA";

/// Validated service configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Identifier the master key is stored under.
    #[serde(default = "default_key_id")]
    pub key_id: String,

    /// Base64 (standard alphabet) encoding of the 32-byte master key.
    /// Required by `encrypt`, `decrypt` and `mac`.
    #[serde(default)]
    pub master_key: Option<String>,

    /// AEAD algorithm name (`aes-256-gcm` or `aes-256-gcm-siv`).
    #[serde(default = "default_algorithm")]
    pub algorithm: String,

    /// Associated data bound into every envelope.
    #[serde(default)]
    pub associated_data: String,

    /// Tracing log level (e.g. `"warn"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_key_id() -> String {
    "default".into()
}
fn default_algorithm() -> String {
    Algorithm::default().as_str().into()
}
fn default_log_level() -> String {
    "warn".into()
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("key_id", &self.key_id)
            .field("master_key", &self.master_key.as_ref().map(|_| "[REDACTED]"))
            .field("algorithm", &self.algorithm)
            .field("associated_data", &self.associated_data)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable cannot be parsed or fails validation.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// The configured AEAD algorithm.
    ///
    /// # Errors
    ///
    /// Returns an error if `UMBRA_ALGORITHM` names an unknown algorithm.
    pub fn algorithm(&self) -> Result<Algorithm> {
        self.algorithm
            .parse::<Algorithm>()
            .with_context(|| format!("UMBRA_ALGORITHM is invalid: {:?}", self.algorithm))
    }

    /// Decode the configured master key.
    ///
    /// # Errors
    ///
    /// Returns an error if `UMBRA_MASTER_KEY` is unset, not valid base64, or
    /// does not decode to exactly [`KEY_LEN`] bytes.
    pub fn master_key(&self) -> Result<KeyBytes> {
        let encoded = self
            .master_key
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .context("UMBRA_MASTER_KEY is required for this command")?;
        let mut raw = STANDARD
            .decode(encoded.trim())
            .context("UMBRA_MASTER_KEY must be standard base64")?;
        let key = KeyBytes::from_slice(&raw)
            .with_context(|| format!("UMBRA_MASTER_KEY must decode to {KEY_LEN} bytes"));
        raw.iter_mut().for_each(|b| *b = 0);
        key
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        validate_key_id(&self.key_id).context("UMBRA_KEY_ID is not a valid key identifier")?;
        self.algorithm()?;
        if self.master_key.is_some() {
            self.master_key()?;
        }
        Ok(())
    }
}
