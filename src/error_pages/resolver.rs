//! Static error page lookup.
//!
//! Pages live directly inside the configured directory and are named after
//! the status code (`404.html`, `502.html`). Content is served verbatim.

use std::path::{Path, PathBuf};

use axum::body::Bytes;
use axum::http::StatusCode;

/// Path of the override page for `status` inside `dir`.
pub fn page_path(dir: &Path, status: StatusCode) -> PathBuf {
    dir.join(format!("{}.html", status.as_u16()))
}

/// Read the override page for `status`, if there is one.
///
/// Only client and server errors are looked up. An absent directory, a
/// missing file or a read failure all yield `None`.
pub async fn read_error_page(dir: Option<&Path>, status: StatusCode) -> Option<Bytes> {
    if !(status.is_client_error() || status.is_server_error()) {
        return None;
    }
    let dir = dir?;
    let path = page_path(dir, status);

    match tokio::fs::read(&path).await {
        Ok(data) => Some(Bytes::from(data)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "No static error page");
            None
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Unreadable static error page, passing through");
            None
        }
    }
}
