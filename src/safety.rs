use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Keeps rewrites inside the repository worktree.
///
/// Paths come from the backend relative to the repository root. Anything
/// that resolves outside the root, or into the `.git` directory, is refused.
#[derive(Debug, Clone)]
pub struct RepoGuard {
    /// Canonical worktree root
    root: PathBuf,
    /// Canonical paths that must never be rewritten
    forbidden_paths: Vec<PathBuf>,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("Path is outside repository: {path} (repository: {root})")]
    OutsideRepository { path: PathBuf, root: PathBuf },

    #[error("Path is in forbidden directory: {path} (forbidden: {forbidden})")]
    ForbiddenPath { path: PathBuf, forbidden: PathBuf },

    #[error("Failed to canonicalize {path}: {source}")]
    Canonicalize {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RepoGuard {
    /// Create a guard for the worktree at `root`.
    ///
    /// The root is canonicalized so symlinked checkouts compare correctly.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, SafetyError> {
        let root = canonicalize(root.as_ref())?;

        let mut forbidden_paths = Vec::new();
        // A `.git` file (worktrees, submodules) canonicalizes too; either way
        // nothing under it is source.
        if let Ok(git_dir) = root.join(".git").canonicalize() {
            forbidden_paths.push(git_dir);
        }

        Ok(Self {
            root,
            forbidden_paths,
        })
    }

    /// Resolve a backend-reported path and check it is safe to rewrite.
    ///
    /// Returns the canonical absolute path.
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let path = path.as_ref();

        // Resolve relative paths against the repository root
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };

        // A `.git` component is refused even before the file exists.
        if absolute
            .strip_prefix(&self.root)
            .map(|rel| {
                rel.components()
                    .any(|c| c == Component::Normal(OsStr::new(".git")))
            })
            .unwrap_or(false)
        {
            return Err(SafetyError::ForbiddenPath {
                path: absolute,
                forbidden: self.root.join(".git"),
            });
        }

        // Canonicalize to resolve symlinks and .. components
        let canonical = canonicalize(&absolute)?;
        self.check_canonical(&canonical)?;

        Ok(canonical)
    }

    fn check_canonical(&self, canonical: &Path) -> Result<(), SafetyError> {
        if !canonical.starts_with(&self.root) {
            return Err(SafetyError::OutsideRepository {
                path: canonical.to_path_buf(),
                root: self.root.clone(),
            });
        }

        for forbidden in &self.forbidden_paths {
            if canonical.starts_with(forbidden) {
                return Err(SafetyError::ForbiddenPath {
                    path: canonical.to_path_buf(),
                    forbidden: forbidden.clone(),
                });
            }
        }

        Ok(())
    }

    /// Get the repository root.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn canonicalize(path: &Path) -> Result<PathBuf, SafetyError> {
    path.canonicalize().map_err(|source| SafetyError::Canonicalize {
        path: path.to_path_buf(),
        source,
    })
}
