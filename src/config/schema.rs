//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for workhorse.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct WorkhorseConfig {
    /// Listener configuration (network, address, umask).
    pub listener: ListenerConfig,

    /// Application backend that requests are forwarded to.
    pub backend: BackendConfig,

    /// Static error page overrides.
    pub error_pages: ErrorPageConfig,

    /// Git subprocess settings.
    pub git: GitConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listen "network", mirroring the address families a listener can bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ListenNetwork {
    #[default]
    Tcp,
    Tcp4,
    Tcp6,
    Unix,
}

impl std::str::FromStr for ListenNetwork {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tcp" => Ok(Self::Tcp),
            "tcp4" => Ok(Self::Tcp4),
            "tcp6" => Ok(Self::Tcp6),
            "unix" => Ok(Self::Unix),
            other => Err(format!("unknown listen network '{}' (tcp, tcp4, tcp6, unix)", other)),
        }
    }
}

impl std::fmt::Display for ListenNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Tcp => "tcp",
            Self::Tcp4 => "tcp4",
            Self::Tcp6 => "tcp6",
            Self::Unix => "unix",
        };
        f.write_str(name)
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Address family to listen on.
    pub network: ListenNetwork,

    /// `host:port` for TCP, a socket path for unix.
    pub address: String,

    /// Umask applied while creating a unix socket.
    pub umask: u32,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            network: ListenNetwork::Tcp,
            address: "localhost:8181".to_string(),
            umask: 0o022,
        }
    }
}

/// Backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the authentication/authorization backend.
    pub auth_backend: String,

    /// Unix domain socket to dial the backend at instead of its TCP address.
    pub auth_socket: Option<PathBuf>,

    /// Time allowed for the backend to return its response head, in
    /// seconds. Body streaming is not bounded.
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            auth_backend: "http://localhost:8080".to_string(),
            auth_socket: None,
            request_timeout_secs: 600,
        }
    }
}

/// Static error page configuration.
///
/// Read-only after startup and shared by every request.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ErrorPageConfig {
    /// Directory holding `<status>.html` files.
    pub dir: Option<PathBuf>,

    /// Serve static pages instead of backend error bodies. Unset means off.
    pub enabled: Option<bool>,
}

impl ErrorPageConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(false)
    }
}

/// Git subprocess configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GitConfig {
    /// Git executable, resolved through `PATH` when not absolute.
    pub bin: String,

    /// Run `git --version` at startup.
    pub probe_on_startup: bool,

    /// Deadline for the startup probe, in seconds.
    pub probe_timeout_secs: u64,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            bin: "git".to_string(),
            probe_on_startup: true,
            probe_timeout_secs: 5,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Prometheus endpoint bind address. Disabled when unset.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_address: None,
        }
    }
}
