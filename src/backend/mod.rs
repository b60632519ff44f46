//! Narrow query interface to the version-control backend.
//!
//! The updater never mutates history; it only asks four questions:
//!
//! 1. Which lines of which files contain one of these literals?
//! 2. Which change last touched line N of file F?
//! 3. Which release tags exist, oldest first?
//! 4. Which release tags contain a given change?
//!
//! [`GitBackend`] answers them by running `git`; [`MemoryBackend`] answers
//! them from in-process state so resolution logic can be tested without a
//! repository.

pub mod git;
pub mod memory;

pub use git::GitBackend;
pub use memory::MemoryBackend;

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Identifier of the change that last touched a line (a commit id for git).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ChangeRef(String);

impl ChangeRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 characters, for trace output.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(12) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl fmt::Display for ChangeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One line reported by [`Backend::enumerate_matches`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMatch {
    /// Path relative to the repository root
    pub file: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// Line content without the trailing newline
    pub text: String,
}

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("unexpected output from `{command}`: {detail}")]
    Malformed { command: String, detail: String },

    #[error("invalid include glob `{pattern}`: {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("{0}")]
    Injected(String),

    #[error("I/O error while scanning {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Capability set the updater needs from version control.
///
/// Every method blocks until the backend answers. Errors are fatal to the
/// run, with the one exception the release resolver documents for
/// [`Backend::tags_containing`].
pub trait Backend {
    /// Lines containing any of `literals`, restricted to files matching
    /// `globs`. No match at all is `Ok(vec![])`, never an error.
    fn enumerate_matches(
        &self,
        literals: &[&str],
        globs: &[String],
    ) -> Result<Vec<RawMatch>, BackendError>;

    /// The change that last touched `line` (1-based) of `file`.
    fn attribute_line(&self, file: &Path, line: usize) -> Result<ChangeRef, BackendError>;

    /// Tag names starting with `prefix`, oldest first. Ties keep the
    /// backend's own order.
    fn list_tags(&self, prefix: &str) -> Result<Vec<String>, BackendError>;

    /// Tag names starting with `prefix` whose history contains `change`,
    /// in no particular order.
    fn tags_containing(
        &self,
        prefix: &str,
        change: &ChangeRef,
    ) -> Result<Vec<String>, BackendError>;
}

impl<B: Backend + ?Sized> Backend for &B {
    fn enumerate_matches(
        &self,
        literals: &[&str],
        globs: &[String],
    ) -> Result<Vec<RawMatch>, BackendError> {
        (**self).enumerate_matches(literals, globs)
    }

    fn attribute_line(&self, file: &Path, line: usize) -> Result<ChangeRef, BackendError> {
        (**self).attribute_line(file, line)
    }

    fn list_tags(&self, prefix: &str) -> Result<Vec<String>, BackendError> {
        (**self).list_tags(prefix)
    }

    fn tags_containing(
        &self,
        prefix: &str,
        change: &ChangeRef,
    ) -> Result<Vec<String>, BackendError> {
        (**self).tags_containing(prefix, change)
    }
}
