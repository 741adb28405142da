//! Forwarding to the application backend.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the configured backend
//! - Forward method, headers and body unchanged
//! - Map connect failures to 502 and deadline expiry to 504
//!
//! # Design Decisions
//! - Single backend, no routing table
//! - With `auth_socket` set the backend is dialed over that unix socket;
//!   the URL still supplies scheme, host and path prefix
//! - The timeout bounds the wait for the response head, not body streaming
//! - Bodies are streamed in both directions, never buffered
//! - Error responses produced here still pass through the error page layer

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{uri::Scheme, HeaderMap, Request, StatusCode, Uri, Version},
    response::{IntoResponse, Response},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client, ResponseFuture},
    rt::TokioExecutor,
};
use thiserror::Error;

use crate::config::BackendConfig;
#[cfg(unix)]
use crate::http::connector::UnixConnector;
use crate::http::request::X_REQUEST_ID;
use crate::observability::metrics;

/// Errors building the upstream target.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("invalid backend URL: {0}")]
    InvalidBackend(#[from] axum::http::uri::InvalidUri),

    #[error("backend URL has no host")]
    MissingAuthority,

    #[error("cannot build backend URI: {0}")]
    Uri(#[from] axum::http::Error),

    #[error("unix socket backends are not supported on this platform")]
    UnixUnsupported,
}

/// Transport used to reach the backend.
#[derive(Clone)]
enum BackendClient {
    Tcp(Client<HttpConnector, Body>),
    #[cfg(unix)]
    Unix(Client<UnixConnector, Body>),
}

impl BackendClient {
    fn new(config: &BackendConfig) -> Result<Self, UpstreamError> {
        let builder = Client::builder(TokioExecutor::new());
        match &config.auth_socket {
            None => Ok(Self::Tcp(builder.build(HttpConnector::new()))),
            #[cfg(unix)]
            Some(path) => Ok(Self::Unix(builder.build(UnixConnector::new(path)))),
            #[cfg(not(unix))]
            Some(_) => Err(UpstreamError::UnixUnsupported),
        }
    }

    fn request(&self, request: Request<Body>) -> ResponseFuture {
        match self {
            Self::Tcp(client) => client.request(request),
            #[cfg(unix)]
            Self::Unix(client) => client.request(request),
        }
    }
}

/// HTTP client bound to one backend.
#[derive(Clone)]
pub struct Upstream {
    base: Uri,
    client: BackendClient,
    timeout: Duration,
}

impl Upstream {
    pub fn new(config: &BackendConfig) -> Result<Self, UpstreamError> {
        let base: Uri = config.auth_backend.parse()?;
        if base.authority().is_none() {
            return Err(UpstreamError::MissingAuthority);
        }

        let client = BackendClient::new(config)?;
        if let Some(path) = &config.auth_socket {
            tracing::info!(auth_backend = %base, auth_socket = %path.display(), "Dialing backend over unix socket");
        }

        Ok(Self {
            base,
            client,
            timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    pub fn base(&self) -> &Uri {
        &self.base
    }

    /// Send `request` to the backend and return its response.
    ///
    /// The timeout covers connecting and receiving the response head; the
    /// body is streamed to the client afterwards without a deadline.
    pub async fn forward(&self, request: Request<Body>) -> Response {
        let start = Instant::now();
        let request_id = request_id(request.headers());
        let method = request.method().to_string();

        let (mut parts, body) = request.into_parts();
        parts.uri = match backend_uri(&self.base, &parts.uri) {
            Ok(uri) => uri,
            Err(e) => {
                tracing::error!(request_id = %request_id, error = %e, "Cannot rewrite request URI");
                metrics::record_request(&method, 502, start);
                return (StatusCode::BAD_GATEWAY, "Bad backend URI").into_response();
            }
        };
        parts.version = Version::HTTP_11;

        tracing::debug!(request_id = %request_id, method = %method, uri = %parts.uri, "Forwarding request");

        let request = Request::from_parts(parts, body);
        match tokio::time::timeout(self.timeout, self.client.request(request)).await {
            Ok(Ok(response)) => {
                let status = response.status();
                metrics::record_request(&method, status.as_u16(), start);
                if status.is_server_error() {
                    tracing::warn!(request_id = %request_id, status = %status, "Backend returned server error");
                }

                let (parts, body) = response.into_parts();
                Response::from_parts(parts, Body::new(body))
            }
            Ok(Err(e)) => {
                tracing::error!(request_id = %request_id, error = %e, "Upstream error");
                metrics::record_request(&method, 502, start);
                (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
            }
            Err(_) => {
                tracing::error!(request_id = %request_id, timeout = ?self.timeout, "Upstream timed out");
                metrics::record_request(&method, 504, start);
                (StatusCode::GATEWAY_TIMEOUT, "Upstream request timed out").into_response()
            }
        }
    }
}

/// Axum handler forwarding every request to the backend.
pub async fn proxy_handler(State(upstream): State<Arc<Upstream>>, request: Request<Body>) -> Response {
    upstream.forward(request).await
}

fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Map `original` onto the backend, keeping path and query.
pub fn backend_uri(base: &Uri, original: &Uri) -> Result<Uri, UpstreamError> {
    let authority = base
        .authority()
        .cloned()
        .ok_or(UpstreamError::MissingAuthority)?;
    let scheme = base.scheme().cloned().unwrap_or(Scheme::HTTP);

    let prefix = base.path().trim_end_matches('/');
    let path_and_query = original
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    Ok(Uri::builder()
        .scheme(scheme)
        .authority(authority)
        .path_and_query(format!("{}{}", prefix, path_and_query))
        .build()?)
}
