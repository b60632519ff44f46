//! In-process [`Backend`] with scripted history.
//!
//! Placeholder enumeration reads real files under a root directory, so the
//! rewriter can be exercised against disk, while attribution and tag
//! history come from whatever the test configured.

use super::{Backend, BackendError, ChangeRef, RawMatch};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Which query should fail with an injected error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    Enumerate,
    Attribute,
    ListTags,
    Contains,
}

#[derive(Debug, Clone)]
struct TagEntry {
    name: String,
    contains: HashSet<ChangeRef>,
}

#[derive(Debug)]
pub struct MemoryBackend {
    root: PathBuf,
    attributions: HashMap<(PathBuf, usize), ChangeRef>,
    fallback: Option<ChangeRef>,
    /// Creation order, oldest first
    tags: Vec<TagEntry>,
    failure: Option<FailurePoint>,
    list_tag_calls: Cell<usize>,
    contains_calls: Cell<usize>,
}

impl MemoryBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            attributions: HashMap::new(),
            fallback: None,
            tags: Vec::new(),
            failure: None,
            list_tag_calls: Cell::new(0),
            contains_calls: Cell::new(0),
        }
    }

    /// Attribute one line of one file to `change`.
    pub fn attribute(mut self, file: impl Into<PathBuf>, line: usize, change: &str) -> Self {
        self.attributions
            .insert((file.into(), line), ChangeRef::new(change));
        self
    }

    /// Attribute every line without an explicit attribution to `change`.
    pub fn attribute_rest(mut self, change: &str) -> Self {
        self.fallback = Some(ChangeRef::new(change));
        self
    }

    /// Create a tag after all previously created ones.
    pub fn tag(mut self, name: &str, contains: &[&str]) -> Self {
        self.tags.push(TagEntry {
            name: name.to_string(),
            contains: contains.iter().map(|c| ChangeRef::new(*c)).collect(),
        });
        self
    }

    pub fn fail_on(mut self, point: FailurePoint) -> Self {
        self.failure = Some(point);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of `list_tags` queries answered so far.
    pub fn list_tag_calls(&self) -> usize {
        self.list_tag_calls.get()
    }

    /// Number of `tags_containing` queries answered so far.
    pub fn contains_calls(&self) -> usize {
        self.contains_calls.get()
    }

    fn check(&self, point: FailurePoint) -> Result<(), BackendError> {
        if self.failure == Some(point) {
            return Err(BackendError::Injected(format!(
                "injected {point:?} failure"
            )));
        }
        Ok(())
    }
}

impl Backend for MemoryBackend {
    fn enumerate_matches(
        &self,
        literals: &[&str],
        globs: &[String],
    ) -> Result<Vec<RawMatch>, BackendError> {
        self.check(FailurePoint::Enumerate)?;

        let matcher = build_matcher(globs)?;
        let mut matches = Vec::new();
        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.file_name() != ".git");

        for entry in walker {
            let entry = entry.map_err(|e| BackendError::Io {
                path: self.root.clone(),
                source: e.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or(entry.path())
                .to_path_buf();
            let name = relative.to_string_lossy().replace('\\', "/");
            if !matcher.is_match(&name) {
                continue;
            }

            let content = fs::read(entry.path()).map_err(|source| BackendError::Io {
                path: entry.path().to_path_buf(),
                source,
            })?;
            let text = String::from_utf8_lossy(&content);
            for (idx, line) in text.lines().enumerate() {
                if literals.iter().any(|literal| line.contains(literal)) {
                    matches.push(RawMatch {
                        file: relative.clone(),
                        line: idx + 1,
                        text: line.to_string(),
                    });
                }
            }
        }

        Ok(matches)
    }

    fn attribute_line(&self, file: &Path, line: usize) -> Result<ChangeRef, BackendError> {
        self.check(FailurePoint::Attribute)?;
        self.attributions
            .get(&(file.to_path_buf(), line))
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| {
                BackendError::Injected(format!(
                    "no history for {}:{}",
                    file.display(),
                    line
                ))
            })
    }

    fn list_tags(&self, prefix: &str) -> Result<Vec<String>, BackendError> {
        self.check(FailurePoint::ListTags)?;
        self.list_tag_calls.set(self.list_tag_calls.get() + 1);
        Ok(self
            .tags
            .iter()
            .filter(|tag| tag.name.starts_with(prefix))
            .map(|tag| tag.name.clone())
            .collect())
    }

    fn tags_containing(
        &self,
        prefix: &str,
        change: &ChangeRef,
    ) -> Result<Vec<String>, BackendError> {
        self.check(FailurePoint::Contains)?;
        self.contains_calls.set(self.contains_calls.get() + 1);
        // Newest first, so callers cannot rely on this order.
        Ok(self
            .tags
            .iter()
            .rev()
            .filter(|tag| tag.name.starts_with(prefix) && tag.contains.contains(change))
            .map(|tag| tag.name.clone())
            .collect())
    }
}

/// Compile include globs the way git pathspecs read them: `*` also matches
/// across `/`.
fn build_matcher(globs: &[String]) -> Result<GlobSet, BackendError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in globs {
        let glob = Glob::new(pattern).map_err(|source| BackendError::InvalidGlob {
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| BackendError::InvalidGlob {
        pattern: globs.join(" "),
        source,
    })
}
