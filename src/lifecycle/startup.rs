//! Startup orchestration.
//!
//! # Responsibilities
//! - Start the metrics exporter when configured
//! - Probe the Git binary through the regular launcher
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast on listener, metrics and backend errors
//! - A failing Git probe is a warning, not fatal
//! - Listener binds last (traffic only when ready)

use std::time::Duration;

use metrics_exporter_prometheus::BuildError;
use thiserror::Error;

use crate::config::WorkhorseConfig;
use crate::git::{self, SystemCommandFactory};
use crate::http::{HttpServer, ServerError};
use crate::lifecycle::{signals, Shutdown};
use crate::net::{self, Listener, ListenerError};
use crate::observability::metrics;

/// Fatal startup or serve errors.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("metrics listener: {0}")]
    MetricsAddress(#[source] ListenerError),

    #[error("metrics exporter: {0}")]
    MetricsExporter(#[from] BuildError),
}

/// Run workhorse until a shutdown signal arrives.
pub async fn run(config: WorkhorseConfig) -> Result<(), StartupError> {
    if let Some(addr) = &config.observability.metrics_address {
        let addr = net::resolve_tcp(addr)
            .await
            .map_err(StartupError::MetricsAddress)?;
        metrics::init_metrics(addr)?;
    }

    if config.git.probe_on_startup {
        let timeout = Duration::from_secs(config.git.probe_timeout_secs);
        match git::probe_version(&SystemCommandFactory, &config.git.bin, timeout).await {
            Ok(version) => tracing::info!(git = %config.git.bin, version = %version, "Git available"),
            Err(e) => tracing::warn!(git = %config.git.bin, error = %e, "Git probe failed"),
        }
    }

    let server = HttpServer::new(config.clone())?;
    let listener = Listener::bind(&config.listener).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unresolvable_metrics_address_is_fatal() {
        let mut config = WorkhorseConfig::default();
        config.listener.address = "127.0.0.1:0".to_string();
        config.git.probe_on_startup = false;
        config.observability.metrics_address = Some("localhost:99999".to_string());

        let err = run(config).await.unwrap_err();
        assert!(matches!(err, StartupError::MetricsAddress(_)));
    }
}
