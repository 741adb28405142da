//! Environment sanitization for Git subprocesses.
//!
//! # Responsibilities
//! - Build the complete environment handed to a Git child process
//! - Copy only `HOME`, `PATH` and `LD_LIBRARY_PATH` from the parent
//! - Inject the request identity (`GL_ID`, `GL_REPOSITORY`)
//!
//! # Design Decisions
//! - Whitelist, never blacklist: the child's environment is cleared first
//! - Output order is fixed so the result is deterministic
//! - Missing ambient variables become empty entries, never errors

use std::fmt;

/// Ambient variables copied verbatim from the parent process.
pub const AMBIENT_KEYS: [&str; 3] = ["HOME", "PATH", "LD_LIBRARY_PATH"];

/// Protocol marker key and its fixed value.
pub const GL_PROTOCOL: &str = "GL_PROTOCOL";
pub const GL_PROTOCOL_VALUE: &str = "http";

/// Identity token key. Always present, possibly empty.
pub const GL_ID: &str = "GL_ID";

/// Repository identifier key. Present only for a non-empty repository id.
pub const GL_REPOSITORY: &str = "GL_REPOSITORY";

/// A single `KEY=VALUE` entry of a sanitized environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvEntry {
    pub key: &'static str,
    pub value: String,
}

impl fmt::Display for EnvEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// The ordered environment of a Git subprocess.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SanitizedEnv {
    entries: Vec<EnvEntry>,
}

impl SanitizedEnv {
    /// Entries in the order they are applied to the child.
    pub fn entries(&self) -> &[EnvEntry] {
        &self.entries
    }

    /// Keys of all entries, in order.
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|e| e.key)
    }

    /// Value for `key`, if the key is part of the environment.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.value.as_str())
    }

    /// Render as `KEY=VALUE` strings.
    pub fn to_strings(&self) -> Vec<String> {
        self.entries.iter().map(ToString::to_string).collect()
    }

    /// Iterate as `(key, value)` pairs, the shape `Command::envs` expects.
    pub fn pairs(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        self.entries.iter().map(|e| (e.key, e.value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build the sanitized environment from the current process environment.
pub fn sanitized_env(gl_id: &str, gl_repository: Option<&str>) -> SanitizedEnv {
    sanitized_env_from(|key| std::env::var(key).ok(), gl_id, gl_repository)
}

/// Build the sanitized environment using `lookup` for ambient variables.
///
/// `lookup` is only ever asked for the keys in [`AMBIENT_KEYS`].
pub fn sanitized_env_from<F>(lookup: F, gl_id: &str, gl_repository: Option<&str>) -> SanitizedEnv
where
    F: Fn(&str) -> Option<String>,
{
    let mut entries: Vec<EnvEntry> = AMBIENT_KEYS
        .iter()
        .map(|&key| EnvEntry {
            key,
            value: lookup(key).unwrap_or_default(),
        })
        .collect();

    entries.push(EnvEntry {
        key: GL_PROTOCOL,
        value: GL_PROTOCOL_VALUE.to_string(),
    });
    entries.push(EnvEntry {
        key: GL_ID,
        value: gl_id.to_string(),
    });

    if let Some(repo) = gl_repository.filter(|r| !r.is_empty()) {
        entries.push(EnvEntry {
            key: GL_REPOSITORY,
            value: repo.to_string(),
        });
    }

    SanitizedEnv { entries }
}
