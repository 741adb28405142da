//! Command-line interface.
//!
//! Flags override values from the optional TOML config file.

use std::path::PathBuf;

use clap::Parser;

use crate::config::loader::{load_config, ConfigError};
use crate::config::validation::validate_config;
use crate::config::{ListenNetwork, WorkhorseConfig};

/// Version banner printed by `--version` and logged at startup.
pub fn version_string() -> String {
    format!("workhorse {}", env!("CARGO_PKG_VERSION"))
}

#[derive(Parser, Debug, Default)]
#[command(name = "workhorse")]
#[command(about = "Handles slow requests and Git subprocesses in front of an application backend", long_about = None)]
#[command(disable_version_flag = true)]
pub struct Cli {
    /// Print version and exit
    #[arg(long)]
    pub version: bool,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Listen address for HTTP server
    #[arg(long)]
    pub listen_addr: Option<String>,

    /// Listen 'network' (tcp, tcp4, tcp6, unix)
    #[arg(long)]
    pub listen_network: Option<ListenNetwork>,

    /// Umask for unix socket, in octal (default: 022)
    #[arg(long, value_parser = parse_umask)]
    pub listen_umask: Option<u32>,

    /// Authentication/authorization backend
    #[arg(long)]
    pub auth_backend: Option<String>,

    /// Optional: unix domain socket to dial the auth backend at
    #[arg(long)]
    pub auth_socket: Option<PathBuf>,

    /// Directory holding static <status>.html error pages
    #[arg(long)]
    pub document_root: Option<PathBuf>,

    /// Show raw backend errors instead of static error pages
    #[arg(long)]
    pub development_mode: bool,

    /// Prometheus metrics listening address, e.g. 'localhost:9229'
    #[arg(long)]
    pub metrics_listen_addr: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Cli {
    /// Load the config file (or defaults), apply flag overrides, then validate.
    pub fn resolve_config(&self) -> Result<WorkhorseConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => WorkhorseConfig::default(),
        };
        self.apply(&mut config);
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }

    /// Apply flag overrides onto `config`.
    pub fn apply(&self, config: &mut WorkhorseConfig) {
        if let Some(addr) = &self.listen_addr {
            config.listener.address = addr.clone();
        }
        if let Some(network) = self.listen_network {
            config.listener.network = network;
        }
        if let Some(umask) = self.listen_umask {
            config.listener.umask = umask;
        }
        if let Some(backend) = &self.auth_backend {
            config.backend.auth_backend = backend.clone();
        }
        if let Some(socket) = &self.auth_socket {
            config.backend.auth_socket = Some(socket.clone());
        }
        if let Some(dir) = &self.document_root {
            config.error_pages.dir = Some(dir.clone());
            if config.error_pages.enabled.is_none() {
                config.error_pages.enabled = Some(true);
            }
        }
        if self.development_mode {
            config.error_pages.enabled = Some(false);
        }
        if let Some(addr) = &self.metrics_listen_addr {
            config.observability.metrics_address = Some(addr.clone());
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
    }
}

fn parse_umask(s: &str) -> Result<u32, String> {
    let digits = s.trim_start_matches("0o");
    u32::from_str_radix(digits, 8).map_err(|e| format!("invalid octal umask '{}': {}", s, e))
}
