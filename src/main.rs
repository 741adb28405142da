//! workhorse
//!
//! Handles slow requests in front of an application backend and launches
//! Git subprocesses on its behalf.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────┐
//!                     │                    WORKHORSE                     │
//!                     │                                                  │
//!   Client Request    │  ┌─────────┐   ┌─────────┐   ┌──────────────┐    │
//!   ──────────────────┼─▶│   net   │──▶│  http   │──▶│ error_pages  │    │
//!                     │  │listener │   │ server  │   │  interceptor │    │
//!                     │  └─────────┘   └─────────┘   └──────┬───────┘    │
//!                     │                                     │            │
//!                     │                                     ▼            │
//!   Client Response   │                              ┌──────────────┐    │
//!   ◀─────────────────┼──────────────────────────────│   upstream   │◀───┼── Backend
//!                     │                              └──────────────┘    │
//!                     │                                                  │
//!                     │  ┌────────────────────────────────────────────┐  │
//!                     │  │ git: env whitelist + process group launch  │──┼─▶ git
//!                     │  └────────────────────────────────────────────┘  │
//!                     └──────────────────────────────────────────────────┘
//! ```

use clap::Parser;

use workhorse::cli::{version_string, Cli};
use workhorse::lifecycle::startup;
use workhorse::observability::logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let version = version_string();
    if cli.version {
        println!("{}", version);
        return Ok(());
    }

    let config = cli.resolve_config()?;

    logging::init_logging(&config.observability.log_level);

    tracing::info!(
        version = %version,
        network = %config.listener.network,
        address = %config.listener.address,
        auth_backend = %config.backend.auth_backend,
        "Starting"
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
