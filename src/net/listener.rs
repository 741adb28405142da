//! Listener creation for TCP and unix sockets.
//!
//! # Responsibilities
//! - Bind to the configured network and address
//! - Remove a stale unix socket file before binding
//! - Apply the configured umask to the socket file

use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::net::TcpListener;
#[cfg(unix)]
use tokio::net::UnixListener;

use crate::config::{ListenNetwork, ListenerConfig};

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to resolve the address.
    #[error("Failed to resolve {address}: {source}")]
    Resolve {
        address: String,
        #[source]
        source: io::Error,
    },

    /// No resolved address matches the requested family.
    #[error("No {network} address found for {address}")]
    NoAddress { network: ListenNetwork, address: String },

    /// Failed to remove a stale socket file.
    #[error("Failed to remove stale socket {path}: {source}")]
    RemoveStale {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to bind to address.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    /// Unix sockets requested on a platform without them.
    #[error("unix sockets are not supported on this platform")]
    UnixUnsupported,
}

/// A bound listener, ready to be served.
#[derive(Debug)]
pub enum Listener {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix { listener: UnixListener, path: PathBuf },
}

impl Listener {
    /// Bind according to `config`.
    pub async fn bind(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let listener = match config.network {
            ListenNetwork::Tcp => Self::Tcp(bind_tcp(&config.address).await?),
            ListenNetwork::Tcp4 => {
                let addr = resolve(&config.address, config.network, |a| a.is_ipv4()).await?;
                Self::Tcp(bind_tcp(addr).await?)
            }
            ListenNetwork::Tcp6 => {
                let addr = resolve(&config.address, config.network, |a| a.is_ipv6()).await?;
                Self::Tcp(bind_tcp(addr).await?)
            }
            ListenNetwork::Unix => bind_unix(Path::new(&config.address), config.umask)?,
        };

        tracing::info!(
            network = %config.network,
            address = %listener.describe(),
            "Listener bound"
        );
        Ok(listener)
    }

    /// Human-readable local address.
    pub fn describe(&self) -> String {
        match self {
            Self::Tcp(l) => l
                .local_addr()
                .map(|a| a.to_string())
                .unwrap_or_else(|_| "tcp:unknown".to_string()),
            #[cfg(unix)]
            Self::Unix { path, .. } => format!("unix:{}", path.display()),
        }
    }

    /// Local TCP address, if this is a TCP listener.
    pub fn tcp_addr(&self) -> Option<SocketAddr> {
        match self {
            Self::Tcp(l) => l.local_addr().ok(),
            #[cfg(unix)]
            Self::Unix { .. } => None,
        }
    }
}

/// Resolve a `host:port` string to its first socket address.
pub async fn resolve_tcp(address: &str) -> Result<SocketAddr, ListenerError> {
    resolve(address, ListenNetwork::Tcp, |_| true).await
}

async fn bind_tcp<A>(address: A) -> Result<TcpListener, ListenerError>
where
    A: tokio::net::ToSocketAddrs + ToString,
{
    let display = address.to_string();
    TcpListener::bind(address)
        .await
        .map_err(|source| ListenerError::Bind {
            address: display,
            source,
        })
}

async fn resolve<F>(address: &str, network: ListenNetwork, family: F) -> Result<SocketAddr, ListenerError>
where
    F: Fn(&SocketAddr) -> bool,
{
    let mut addrs = tokio::net::lookup_host(address)
        .await
        .map_err(|source| ListenerError::Resolve {
            address: address.to_string(),
            source,
        })?;

    addrs.find(|a| family(a)).ok_or_else(|| ListenerError::NoAddress {
        network,
        address: address.to_string(),
    })
}

#[cfg(unix)]
fn bind_unix(path: &Path, umask: u32) -> Result<Listener, ListenerError> {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed stale socket"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(ListenerError::RemoveStale {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    // umask is process-wide; restore it right after the socket exists.
    let old = unsafe { libc::umask(umask as libc::mode_t) };
    let result = UnixListener::bind(path);
    unsafe { libc::umask(old) };

    let listener = result.map_err(|source| ListenerError::Bind {
        address: path.display().to_string(),
        source,
    })?;

    Ok(Listener::Unix {
        listener,
        path: path.to_path_buf(),
    })
}

#[cfg(not(unix))]
fn bind_unix(_path: &Path, _umask: u32) -> Result<Listener, ListenerError> {
    Err(ListenerError::UnixUnsupported)
}
