//! Shared utilities for integration tests.

use std::future::Future;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use workhorse::net::Listener;
use workhorse::{HttpServer, Shutdown, WorkhorseConfig};

/// Start a programmable mock backend on an ephemeral port.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(answer(socket, f.clone()));
        }
    });

    addr
}

/// Start a mock backend on a unix socket at `path`, answering with
/// `status` and a body echoing the request line.
#[cfg(unix)]
pub async fn start_unix_backend(path: &Path, status: u16) {
    let listener = tokio::net::UnixListener::bind(path).unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let head = String::from_utf8_lossy(&buf[..n]).into_owned();
                let request_line = head.lines().next().unwrap_or("").to_string();
                write_response(&mut socket, status, &request_line).await;
            });
        }
    });
}

async fn answer<S, F, Fut>(mut socket: S, f: Arc<F>)
where
    S: AsyncRead + AsyncWrite + Unpin,
    F: Fn() -> Fut,
    Fut: Future<Output = (u16, String)>,
{
    // Drain the request head; bodies are empty in these tests.
    let mut buf = [0u8; 4096];
    let _ = socket.read(&mut buf).await;

    let (status, body) = f().await;
    write_response(&mut socket, status, &body).await;
}

async fn write_response<S>(socket: &mut S, status: u16, body: &str)
where
    S: AsyncWrite + Unpin,
{
    let reason = StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown");

    let response_str = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        body.len(),
        body
    );
    let _ = socket.write_all(response_str.as_bytes()).await;
    let _ = socket.shutdown().await;
    tokio::time::sleep(Duration::from_millis(10)).await;
}

/// Start a backend that always answers with `status` and `body`.
pub async fn start_fixed_backend(status: u16, body: &'static str) -> SocketAddr {
    start_programmable_backend(move || async move { (status, body.to_string()) }).await
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Run workhorse on an ephemeral port in front of `backend`.
pub async fn start_workhorse(
    backend: SocketAddr,
    error_dir: Option<PathBuf>,
    enabled: Option<bool>,
) -> (SocketAddr, Shutdown) {
    let mut config = test_config();
    config.backend.auth_backend = format!("http://{}", backend);
    config.error_pages.dir = error_dir;
    config.error_pages.enabled = enabled;
    start_workhorse_with(config).await
}

/// Defaults suited to tests: ephemeral port, short timeout, no Git probe.
pub fn test_config() -> WorkhorseConfig {
    let mut config = WorkhorseConfig::default();
    config.listener.address = "127.0.0.1:0".to_string();
    config.backend.request_timeout_secs = 5;
    config.git.probe_on_startup = false;
    config
}

/// Run workhorse with `config`, which must listen on TCP.
pub async fn start_workhorse_with(config: WorkhorseConfig) -> (SocketAddr, Shutdown) {
    let listener = Listener::bind(&config.listener).await.unwrap();
    let addr = listener.tcp_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = HttpServer::new(config).unwrap();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
