//! Git subprocess subsystem.
//!
//! # Data Flow
//! ```text
//! GitInvocation (program, args, gl_id, gl_repository)
//!     → env.rs (whitelisted environment)
//!     → command.rs (CommandFactory + env + stderr + process group)
//!     → GitCommand (prepared, not started)
//!     → caller spawns → GitProcess
//!     → process_group.rs (signal the whole tree on cancel/timeout)
//! ```
//!
//! # Design Decisions
//! - No ambient environment reaches Git except HOME, PATH, LD_LIBRARY_PATH
//! - Children lead their own process group so they can be killed as a unit
//! - Starting, waiting and killing belong to the caller

pub mod command;
pub mod env;
pub mod process_group;

use std::time::Duration;

use thiserror::Error;

pub use command::{git_command, CommandFactory, GitCommand, GitInvocation, GitProcess, SystemCommandFactory};
pub use env::{sanitized_env, SanitizedEnv};
pub use process_group::KillSignal;

/// Errors raised while running a Git subprocess.
#[derive(Debug, Error)]
pub enum GitError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to signal process group of {program}: {source}")]
    Signal {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} did not finish within {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("{program} exited with {status}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
    },
}

/// Run `<git_bin> --version` through the regular launcher and return its output line.
pub async fn probe_version(
    factory: &dyn CommandFactory,
    git_bin: &str,
    timeout: Duration,
) -> Result<String, GitError> {
    let invocation = GitInvocation::new(git_bin, ["--version"]);
    let mut cmd = git_command(factory, &invocation);
    cmd.as_command_mut()
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped());

    let output = cmd.spawn()?.output_with_timeout(timeout).await?;
    if !output.status.success() {
        return Err(GitError::Failed {
            program: invocation.program,
            status: output.status,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
