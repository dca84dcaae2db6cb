//! `umbra-crypt` — command-line entry point.
//!
//! Startup sequence:
//! 1. Parse command-line arguments.
//! 2. Load and validate [`Config`] from `UMBRA_*` environment variables.
//! 3. Initialise structured JSON logging on stderr.
//! 4. Run the selected command.

mod cli;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use crypto_service::config::Config;
use crypto_service::telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Arguments
    // -----------------------------------------------------------------------
    let args = cli::Cli::parse();

    // -----------------------------------------------------------------------
    // 2. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 3. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(&cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        algorithm = %cfg.algorithm,
        key_id = %cfg.key_id,
        "umbra-crypt starting"
    );

    // -----------------------------------------------------------------------
    // 4. Command
    // -----------------------------------------------------------------------
    cli::run(args.command, &cfg).await
}
