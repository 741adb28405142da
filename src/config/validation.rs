//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, umask fits in permission bits)
//! - Check the backend URL is an absolute http URL
//! - Check the metrics address is `host:port`
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: WorkhorseConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::{ListenNetwork, WorkhorseConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.address must not be empty")]
    EmptyListenAddress,

    #[error("listener.umask {0:#o} is not a permission mask")]
    InvalidUmask(u32),

    #[error("listener.address '{0}' is not host:port")]
    InvalidTcpAddress(String),

    #[error("backend.auth_backend '{url}' is invalid: {reason}")]
    InvalidBackendUrl { url: String, reason: String },

    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("error_pages.dir must not be an empty path")]
    EmptyErrorPageDir,

    #[error("git.bin must not be empty")]
    EmptyGitBin,

    #[error("backend.auth_socket must not be an empty path")]
    EmptyAuthSocket,

    #[error("observability.metrics_address '{0}' is not host:port")]
    InvalidMetricsAddress(String),
}

/// Check `config` for semantic errors.
pub fn validate_config(config: &WorkhorseConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let listener = &config.listener;
    if listener.address.is_empty() {
        errors.push(ValidationError::EmptyListenAddress);
    } else if listener.network != ListenNetwork::Unix && listener.address.rsplit_once(':').is_none() {
        errors.push(ValidationError::InvalidTcpAddress(listener.address.clone()));
    }
    if listener.umask > 0o777 {
        errors.push(ValidationError::InvalidUmask(listener.umask));
    }

    match url::Url::parse(&config.backend.auth_backend) {
        Ok(url) if url.scheme() != "http" => {
            errors.push(ValidationError::InvalidBackendUrl {
                url: config.backend.auth_backend.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        Ok(url) if url.host_str().is_none() => {
            errors.push(ValidationError::InvalidBackendUrl {
                url: config.backend.auth_backend.clone(),
                reason: "missing host".to_string(),
            });
        }
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::InvalidBackendUrl {
            url: config.backend.auth_backend.clone(),
            reason: e.to_string(),
        }),
    }

    if let Some(socket) = &config.backend.auth_socket {
        if socket.as_os_str().is_empty() {
            errors.push(ValidationError::EmptyAuthSocket);
        }
    }

    if config.backend.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("backend.request_timeout_secs"));
    }
    if config.git.probe_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("git.probe_timeout_secs"));
    }
    if config.git.bin.is_empty() {
        errors.push(ValidationError::EmptyGitBin);
    }

    if let Some(dir) = &config.error_pages.dir {
        if dir.as_os_str().is_empty() {
            errors.push(ValidationError::EmptyErrorPageDir);
        }
    }

    if let Some(addr) = &config.observability.metrics_address {
        if !is_host_port(addr) {
            errors.push(ValidationError::InvalidMetricsAddress(addr.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_host_port(addr: &str) -> bool {
    match addr.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && port.parse::<u16>().is_ok(),
        None => false,
    }
}
