//! Since Resolver: fill in `TODO` release placeholders from version control
//!
//! Sources announce new or deprecated API with placeholders such as
//! `@since TODO`, `@Deprecated(since = "TODO")` and
//! `@RestrictedSince("TODO")`. Once the change carrying a placeholder has
//! shipped, the placeholder can be replaced with the version of the first
//! release that contained it.
//!
//! # Architecture
//!
//! Every history question goes through the [`Backend`] trait:
//!
//! 1. [`scan`] enumerates placeholder lines in tracked files
//! 2. [`resolve::attribute`] finds the change that last touched each line
//! 3. [`ReleaseResolver`] maps the change to its earliest release tag
//! 4. [`LineEdit`] rewrites the placeholder in place
//! 5. [`Aggregate`] collects change/release pairs for the final report
//!
//! [`Updater`] runs the pipeline. [`GitBackend`] answers the questions with
//! `git`; [`MemoryBackend`] answers them from scripted history.
//!
//! # Safety
//!
//! - Only the placeholder bytes on the attributed line change
//! - Atomic file writes (tempfile + fsync + rename)
//! - Rewrites are confined to the repository worktree
//! - Re-running on an already updated tree changes nothing
//!
//! # Example
//!
//! ```no_run
//! use since_resolver::{GitBackend, RepoGuard, Updater, UpdaterConfig, WriteMode};
//! use std::path::Path;
//!
//! let backend = GitBackend::discover(Path::new("."))?;
//! let guard = RepoGuard::new(backend.root())?;
//! let updater = Updater::new(backend, UpdaterConfig::default(), guard)
//!     .with_mode(WriteMode::DryRun);
//!
//! let summary = updater.run(&mut std::io::stdout())?;
//! println!("{} placeholders would be rewritten", summary.applied());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod backend;
pub mod config;
pub mod edit;
pub mod engine;
pub mod marker;
pub mod report;
pub mod resolve;
pub mod safety;
pub mod scan;

// Re-exports
pub use backend::{Backend, BackendError, ChangeRef, GitBackend, MemoryBackend, RawMatch};
pub use config::{load_for_repo, load_from_path, load_from_str, ConfigError, Links, UpdaterConfig};
pub use edit::{DryRunOverlay, EditError, EditResult, LineEdit, WriteMode};
pub use engine::{ConsoleStyle, RunSummary, UpdateError, Updater};
pub use marker::{release_version, Marker, MarkerKind};
pub use report::{render_json, render_text, Aggregate, ReleaseGroup};
pub use resolve::{ReleaseResolver, ReleaseTag};
pub use safety::{RepoGuard, SafetyError};
pub use scan::{scan, Candidate};
