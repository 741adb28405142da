//! Git subprocess construction.
//!
//! # Responsibilities
//! - Turn a [`GitInvocation`] into a ready-to-spawn command
//! - Replace the inherited environment with the sanitized one
//! - Route the child's stderr to ours so failures are visible in logs
//! - Start the child in its own process group
//!
//! # Design Decisions
//! - Building never fails; spawn errors surface from [`GitCommand::spawn`]
//! - Command creation goes through [`CommandFactory`] so callers can wrap
//!   the binary (e.g. an absolute path or a test double)

use std::process::{ExitStatus, Output, Stdio};
use std::time::Duration;

use tokio::process::{Child, Command};

use crate::git::env::{sanitized_env, SanitizedEnv};
use crate::git::process_group::{kill_process_group, KillSignal};
use crate::git::GitError;
use crate::observability::metrics;

/// Creates the base command for a program and its arguments.
pub trait CommandFactory: Send + Sync {
    fn command(&self, program: &str, args: &[String]) -> Command;
}

/// Default factory backed by `tokio::process::Command::new`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandFactory;

impl CommandFactory for SystemCommandFactory {
    fn command(&self, program: &str, args: &[String]) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(args);
        cmd
    }
}

/// Everything needed to start one Git subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub gl_id: String,
    pub gl_repository: Option<String>,
}

impl GitInvocation {
    /// Invocation with an empty identity and no repository.
    pub fn new<I, A>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            gl_id: String::new(),
            gl_repository: None,
        }
    }

    pub fn gl_id(mut self, gl_id: impl Into<String>) -> Self {
        self.gl_id = gl_id.into();
        self
    }

    pub fn gl_repository(mut self, gl_repository: impl Into<String>) -> Self {
        self.gl_repository = Some(gl_repository.into());
        self
    }
}

/// Build a command for `invocation` without starting it.
pub fn git_command(factory: &dyn CommandFactory, invocation: &GitInvocation) -> GitCommand {
    let env = sanitized_env(&invocation.gl_id, invocation.gl_repository.as_deref());

    let mut cmd = factory.command(&invocation.program, &invocation.args);
    cmd.env_clear();
    cmd.envs(env.pairs());
    cmd.stderr(Stdio::inherit());
    #[cfg(unix)]
    cmd.process_group(0);

    tracing::debug!(
        program = %invocation.program,
        args = ?invocation.args,
        gl_id = %invocation.gl_id,
        gl_repository = invocation.gl_repository.as_deref().unwrap_or(""),
        "Git command prepared"
    );

    GitCommand {
        program: invocation.program.clone(),
        inner: cmd,
        env,
    }
}

/// A prepared, not yet started, Git subprocess.
#[derive(Debug)]
pub struct GitCommand {
    program: String,
    inner: Command,
    env: SanitizedEnv,
}

impl GitCommand {
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The environment the child will see.
    pub fn env(&self) -> &SanitizedEnv {
        &self.env
    }

    /// Access the underlying command, e.g. to pipe stdin/stdout.
    pub fn as_command_mut(&mut self) -> &mut Command {
        &mut self.inner
    }

    pub fn as_std(&self) -> &std::process::Command {
        self.inner.as_std()
    }

    /// Start the child process.
    pub fn spawn(mut self) -> Result<GitProcess, GitError> {
        match self.inner.spawn() {
            Ok(child) => {
                let pgid = child.id();
                metrics::record_git_spawn(&self.program, true);
                tracing::debug!(program = %self.program, pid = ?pgid, "Git process started");
                Ok(GitProcess {
                    program: self.program,
                    child,
                    pgid,
                })
            }
            Err(source) => {
                metrics::record_git_spawn(&self.program, false);
                tracing::error!(program = %self.program, error = %source, "Failed to start git process");
                Err(GitError::Spawn {
                    program: self.program,
                    source,
                })
            }
        }
    }
}

/// A running Git subprocess and the process group it leads.
#[derive(Debug)]
pub struct GitProcess {
    program: String,
    child: Child,
    pgid: Option<u32>,
}

impl GitProcess {
    /// Process group id, equal to the child's pid.
    ///
    /// Kept after the leader is reaped: the group lives on while any
    /// descendant remains in it.
    pub fn pgid(&self) -> Option<u32> {
        self.pgid
    }

    pub fn child_mut(&mut self) -> &mut Child {
        &mut self.child
    }

    /// Signal the child and all of its descendants.
    ///
    /// Still reaches descendants after [`GitProcess::wait`] has returned.
    pub fn kill_group(&self, signal: KillSignal) -> Result<(), GitError> {
        let Some(pgid) = self.pgid else {
            return Ok(());
        };

        tracing::info!(program = %self.program, pgid, signal = ?signal, "Signalling git process group");
        kill_process_group(pgid, signal).map_err(|source| GitError::Signal {
            program: self.program.clone(),
            source,
        })
    }

    pub async fn wait(&mut self) -> Result<ExitStatus, GitError> {
        let status = self.child.wait().await.map_err(|source| GitError::Wait {
            program: self.program.clone(),
            source,
        })?;
        tracing::debug!(program = %self.program, status = %status, "Git process exited");
        Ok(status)
    }

    /// Collect the output, killing the whole group if `timeout` elapses.
    pub async fn output_with_timeout(self, timeout: Duration) -> Result<Output, GitError> {
        let Self {
            program,
            child,
            pgid,
        } = self;

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|source| GitError::Wait { program, source }),
            Err(_) => {
                if let Some(pgid) = pgid {
                    if let Err(e) = kill_process_group(pgid, KillSignal::Kill) {
                        tracing::warn!(program = %program, pgid, error = %e, "Failed to kill timed out git process group");
                    }
                }
                Err(GitError::Timeout { program, timeout })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    fn env_keys(cmd: &GitCommand) -> Vec<String> {
        cmd.as_std()
            .get_envs()
            .map(|(k, _)| k.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_invocation_builder() {
        let inv = GitInvocation::new("git-upload-pack", ["--stateless-rpc", "/repos/a.git"])
            .gl_id("user-1")
            .gl_repository("project-2");
        assert_eq!(inv.program, "git-upload-pack");
        assert_eq!(inv.args, vec!["--stateless-rpc", "/repos/a.git"]);
        assert_eq!(inv.gl_id, "user-1");
        assert_eq!(inv.gl_repository.as_deref(), Some("project-2"));
    }

    #[test]
    fn test_command_carries_program_and_args() {
        let inv = GitInvocation::new("git", ["upload-pack", "--advertise-refs", "."]);
        let cmd = git_command(&SystemCommandFactory, &inv);
        assert_eq!(cmd.as_std().get_program(), OsStr::new("git"));
        let args: Vec<_> = cmd.as_std().get_args().collect();
        assert_eq!(args, vec!["upload-pack", "--advertise-refs", "."]);
    }

    #[test]
    fn test_command_env_is_whitelist_only() {
        let inv = GitInvocation::new("git", ["status"]).gl_id("key-3");
        let cmd = git_command(&SystemCommandFactory, &inv);

        let mut keys = env_keys(&cmd);
        keys.sort();
        assert_eq!(
            keys,
            vec!["GL_ID", "GL_PROTOCOL", "HOME", "LD_LIBRARY_PATH", "PATH"]
        );
        assert_eq!(cmd.env().get("GL_ID"), Some("key-3"));
    }

    #[test]
    fn test_command_env_with_repository() {
        let inv = GitInvocation::new("git", ["status"])
            .gl_id("user-5")
            .gl_repository("project-9");
        let cmd = git_command(&SystemCommandFactory, &inv);
        assert!(env_keys(&cmd).contains(&"GL_REPOSITORY".to_string()));
    }

    struct WrappingFactory;

    impl CommandFactory for WrappingFactory {
        fn command(&self, program: &str, args: &[String]) -> Command {
            let mut cmd = Command::new("/opt/git/bin/wrapper");
            cmd.arg(program).args(args);
            cmd
        }
    }

    #[test]
    fn test_custom_factory_is_used() {
        let inv = GitInvocation::new("git", ["gc"]);
        let cmd = git_command(&WrappingFactory, &inv);
        assert_eq!(cmd.as_std().get_program(), OsStr::new("/opt/git/bin/wrapper"));
        assert_eq!(cmd.program(), "git");
    }

    #[tokio::test]
    async fn test_spawn_failure_is_reported() {
        let inv = GitInvocation::new("/nonexistent/bin/git-does-not-exist", Vec::<String>::new());
        let err = git_command(&SystemCommandFactory, &inv).spawn().unwrap_err();
        match err {
            GitError::Spawn { program, source } => {
                assert_eq!(program, "/nonexistent/bin/git-does-not-exist");
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected spawn error, got {other:?}"),
        }
    }
}
