//! Command-line interface: argument parsing and command execution.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

use crypto_service::config::Config;
use crypto_service::hash::HashAlgorithm;
use crypto_service::keys::{KeyBytes, KeyStore, MemoryKeyStore};
use crypto_service::{CryptoService, DefaultCryptoService, LoggingCryptoService};

type Service = LoggingCryptoService<DefaultCryptoService<MemoryKeyStore>>;

#[derive(Parser)]
#[command(
    name = "umbra-crypt",
    version,
    about = "Encrypt, decrypt and inspect UMBR envelopes",
    after_help = "\
Environment variables:
  UMBRA_MASTER_KEY        Base64 32-byte key (required by encrypt, decrypt, mac)
  UMBRA_KEY_ID            Identifier of the master key (default: default)
  UMBRA_ALGORITHM         aes-256-gcm | aes-256-gcm-siv (default: aes-256-gcm)
  UMBRA_ASSOCIATED_DATA   Associated data bound into every envelope
  UMBRA_LOG_LEVEL         Log level for stderr JSON logs (default: warn)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Where to read input from and write output to.
#[derive(Args, Debug, Default)]
pub struct IoArgs {
    /// Read from this file instead of stdin
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encrypt input into an envelope
    Encrypt {
        #[command(flatten)]
        io: IoArgs,

        /// Write the envelope as base64 text
        #[arg(long)]
        base64: bool,
    },

    /// Decrypt an envelope
    Decrypt {
        #[command(flatten)]
        io: IoArgs,

        /// Input envelope is base64 text
        #[arg(long)]
        base64: bool,
    },

    /// Print the hex digest of the input
    Hash {
        #[command(flatten)]
        io: IoArgs,

        /// Digest algorithm (sha256, sha512)
        #[arg(short, long, default_value = "sha256")]
        algorithm: HashAlgorithm,
    },

    /// Print the hex HMAC-SHA-256 of the input under the master key
    Mac {
        #[command(flatten)]
        io: IoArgs,
    },

    /// Describe an envelope's header as JSON without decrypting it
    Inspect {
        #[command(flatten)]
        io: IoArgs,

        /// Input envelope is base64 text
        #[arg(long)]
        base64: bool,
    },

    /// Print a new random base64 key suitable for UMBRA_MASTER_KEY
    Keygen,
}

impl Command {
    /// Whether the command needs `UMBRA_MASTER_KEY`.
    fn needs_key(&self) -> bool {
        matches!(
            self,
            Command::Encrypt { .. } | Command::Decrypt { .. } | Command::Mac { .. }
        )
    }
}

/// Execute `command` against the service described by `cfg`.
///
/// # Errors
///
/// Returns an error on I/O failure, missing key material, or any crypto failure.
pub async fn run(command: Command, cfg: &Config) -> Result<()> {
    let svc = build_service(cfg, command.needs_key())?;

    match command {
        Command::Encrypt { io, base64 } => {
            let plaintext = read_input(io.input.as_deref(), false).await?;
            let sealed = svc
                .encrypt(&cfg.key_id, &plaintext)
                .context("encryption failed")?;
            let out = if base64 { encode_line(&sealed) } else { sealed };
            write_output(io.output.as_deref(), &out).await
        }
        Command::Decrypt { io, base64 } => {
            let sealed = read_input(io.input.as_deref(), base64).await?;
            let plaintext = svc
                .decrypt(&cfg.key_id, &sealed)
                .context("decryption failed")?;
            write_output(io.output.as_deref(), &plaintext).await
        }
        Command::Hash { io, algorithm } => {
            let data = read_input(io.input.as_deref(), false).await?;
            let digest = svc.hash(algorithm, &data);
            write_output(io.output.as_deref(), hex_line(&digest).as_bytes()).await
        }
        Command::Mac { io } => {
            let data = read_input(io.input.as_deref(), false).await?;
            let mac = svc.mac(&cfg.key_id, &data).context("MAC computation failed")?;
            write_output(io.output.as_deref(), hex_line(&mac).as_bytes()).await
        }
        Command::Inspect { io, base64 } => {
            let data = read_input(io.input.as_deref(), base64).await?;
            let info = envelope::inspect(&data).context("input is not a valid envelope")?;
            let mut json = serde_json::to_vec_pretty(&info)?;
            json.push(b'\n');
            write_output(io.output.as_deref(), &json).await
        }
        Command::Keygen => {
            let key = KeyBytes::generate();
            write_output(None, &encode_line(key.as_bytes())).await
        }
    }
}

/// Build the logging-wrapped service, loading the master key when required.
fn build_service(cfg: &Config, with_key: bool) -> Result<Service> {
    let keys = MemoryKeyStore::new();
    if with_key {
        let key = cfg.master_key()?;
        keys.store(&cfg.key_id, key.as_bytes())
            .context("failed to store master key")?;
        debug!(key_id = %cfg.key_id, "master key loaded");
    }
    let inner = DefaultCryptoService::new(keys, cfg.algorithm()?)
        .with_associated_data(cfg.associated_data.as_bytes());
    Ok(LoggingCryptoService::new(inner))
}

/// Read all of `path` (or stdin), optionally decoding base64 text.
async fn read_input(path: Option<&Path>, base64: bool) -> Result<Vec<u8>> {
    let raw = match path {
        Some(p) => tokio::fs::read(p)
            .await
            .with_context(|| format!("failed to read {}", p.display()))?,
        None => {
            let mut buf = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut buf)
                .await
                .context("failed to read stdin")?;
            buf
        }
    };
    if base64 {
        decode_text(&raw)
    } else {
        Ok(raw)
    }
}

/// Write `data` to `path` (or stdout).
async fn write_output(path: Option<&Path>, data: &[u8]) -> Result<()> {
    match path {
        Some(p) => tokio::fs::write(p, data)
            .await
            .with_context(|| format!("failed to write {}", p.display())),
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(data).await.context("failed to write stdout")?;
            stdout.flush().await.context("failed to flush stdout")
        }
    }
}

fn decode_text(raw: &[u8]) -> Result<Vec<u8>> {
    let text: Vec<u8> = raw
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    STANDARD
        .decode(text)
        .context("input is not valid base64")
}

fn encode_line(data: &[u8]) -> Vec<u8> {
    let mut out = STANDARD.encode(data).into_bytes();
    out.push(b'\n');
    out
}

fn hex_line(data: &[u8]) -> String {
    format!("{}\n", hex::encode(data))
}
