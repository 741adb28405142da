//! Response interception for static error pages.
//!
//! # Per-request state
//! ```text
//! Idle
//!   → StatusObserved   (downstream returned its response head)
//!   → Passthrough      (no error, feature disabled, or no page)
//!   | Overridden       (error status + enabled + page found)
//!   → Flushed          (response handed back to hyper)
//! ```
//!
//! The downstream body is never polled before the decision is made, so a
//! body that has started streaming is never replaced.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, Request, StatusCode};
use axum::response::Response;
use tower::{Layer, Service};

use crate::config::ErrorPageConfig;
use crate::error_pages::resolver::read_error_page;
use crate::observability::metrics;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Outcome of inspecting a downstream status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interception {
    Passthrough,
    Overridden(Bytes),
}

/// Decide what to do with a response carrying `status`.
///
/// When the feature is disabled no lookup is attempted.
pub async fn decide(config: &ErrorPageConfig, status: StatusCode) -> Interception {
    if status.as_u16() < 400 || !config.is_enabled() {
        return Interception::Passthrough;
    }

    match read_error_page(config.dir.as_deref(), status).await {
        Some(page) => Interception::Overridden(page),
        None => Interception::Passthrough,
    }
}

/// Apply a decision to the downstream response.
pub fn apply(response: Response, interception: Interception) -> Response {
    let page = match interception {
        Interception::Passthrough => return response,
        Interception::Overridden(page) => page,
    };

    let (mut parts, _discarded) = response.into_parts();
    parts.headers.remove(header::CONTENT_ENCODING);
    parts.headers.remove(header::TRANSFER_ENCODING);
    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    parts
        .headers
        .insert(header::CONTENT_LENGTH, HeaderValue::from(page.len()));
    parts
        .headers
        .insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));

    Response::from_parts(parts, Body::from(page))
}

/// Layer that swaps backend error bodies for static pages.
#[derive(Debug, Clone)]
pub struct ErrorPageLayer {
    config: Arc<ErrorPageConfig>,
}

impl ErrorPageLayer {
    pub fn new(config: Arc<ErrorPageConfig>) -> Self {
        Self { config }
    }
}

impl<S> Layer<S> for ErrorPageLayer {
    type Service = ErrorPageService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ErrorPageService {
            inner,
            config: Arc::clone(&self.config),
        }
    }
}

/// Wrap `handler` with error page interception.
pub fn handle_error_pages<S>(config: Arc<ErrorPageConfig>, handler: S) -> ErrorPageService<S> {
    ErrorPageLayer::new(config).layer(handler)
}

/// Service produced by [`ErrorPageLayer`].
#[derive(Debug, Clone)]
pub struct ErrorPageService<S> {
    inner: S,
    config: Arc<ErrorPageConfig>,
}

impl<S, B> Service<Request<B>> for ErrorPageService<S>
where
    S: Service<Request<B>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<Result<Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        // The clone may not be ready; keep the one poll_ready was called on.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            let response = inner.call(request).await?;
            let status = response.status();

            let interception = decide(&config, status).await;
            if let Interception::Overridden(ref page) = interception {
                tracing::info!(status = status.as_u16(), bytes = page.len(), "Serving static error page");
                metrics::record_error_page_served(status.as_u16());
            }

            Ok(apply(response, interception))
        })
    }
}
