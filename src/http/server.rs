//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the upstream forwarder as fallback
//! - Wire up middleware (tracing, request ID, error pages)
//! - Serve on a TCP or unix listener until shutdown

use std::sync::Arc;

use axum::{routing::any, Router};
use thiserror::Error;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::WorkhorseConfig;
use crate::error_pages::ErrorPageLayer;
use crate::http::request::{request_id_header, MakeRequestUuidV4};
use crate::http::upstream::{proxy_handler, Upstream, UpstreamError};
use crate::net::Listener;

/// Errors raised by the HTTP server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP server for workhorse.
pub struct HttpServer {
    router: Router,
    config: WorkhorseConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: WorkhorseConfig) -> Result<Self, ServerError> {
        let upstream = Arc::new(Upstream::new(&config.backend)?);
        let router = Self::build_router(&config, upstream);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &WorkhorseConfig, upstream: Arc<Upstream>) -> Router {
        let error_pages = Arc::new(config.error_pages.clone());

        Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(upstream)
            .layer(ErrorPageLayer::new(error_pages))
            .layer(PropagateRequestIdLayer::new(request_id_header()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(request_id_header(), MakeRequestUuidV4))
    }

    /// The fully layered router, e.g. for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &WorkhorseConfig {
        &self.config
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        tracing::info!(
            address = %listener.describe(),
            error_pages_enabled = self.config.error_pages.is_enabled(),
            error_pages_dir = ?self.config.error_pages.dir,
            "HTTP server starting"
        );

        let signal = async move {
            let _ = shutdown.recv().await;
            tracing::info!("Shutdown signal received");
        };

        match listener {
            Listener::Tcp(tcp) => {
                axum::serve(tcp, self.router)
                    .with_graceful_shutdown(signal)
                    .await?
            }
            #[cfg(unix)]
            Listener::Unix { listener, .. } => {
                axum::serve(listener, self.router)
                    .with_graceful_shutdown(signal)
                    .await?
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
