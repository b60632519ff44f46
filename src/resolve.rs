//! History and release resolution.
//!
//! [`attribute`] maps a candidate to the change that introduced its line;
//! [`ReleaseResolver`] maps a change to the earliest release tag containing
//! it.

use crate::backend::{Backend, BackendError, ChangeRef};
use crate::scan::Candidate;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Change that last touched the candidate's line. Backend errors are fatal.
pub fn attribute<B: Backend + ?Sized>(
    backend: &B,
    candidate: &Candidate,
) -> Result<ChangeRef, BackendError> {
    let change = backend.attribute_line(&candidate.file, candidate.line)?;
    debug!(
        file = %candidate.file.display(),
        line = candidate.line,
        change = %change,
        "line attributed"
    );
    Ok(change)
}

/// A release tag and its position in creation order (0 = oldest).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ReleaseTag {
    pub name: String,
    pub order: usize,
}

impl Ord for ReleaseTag {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order
            .cmp(&other.order)
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl PartialOrd for ReleaseTag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Resolves changes to their first release.
///
/// The qualifying tag list is fetched once, on first use, and every answer
/// is memoized, so asking twice about one change always gives the same tag.
#[derive(Debug)]
pub struct ReleaseResolver {
    prefix: String,
    order: Option<HashMap<String, usize>>,
    memo: HashMap<ChangeRef, Option<ReleaseTag>>,
}

impl ReleaseResolver {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            order: None,
            memo: HashMap::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Earliest qualifying tag containing `change`, or `None` if the change
    /// is not released yet.
    ///
    /// Failing to list tags is fatal. Failing to answer the containment
    /// query for one change (git cannot resolve the all-zero id it reports
    /// for uncommitted lines, for instance) is treated as "not released".
    pub fn resolve<B: Backend + ?Sized>(
        &mut self,
        backend: &B,
        change: &ChangeRef,
    ) -> Result<Option<ReleaseTag>, BackendError> {
        if let Some(known) = self.memo.get(change) {
            debug!(change = %change, "release lookup served from memo");
            return Ok(known.clone());
        }

        let order = match self.order.take() {
            Some(order) => order,
            None => self.load_order(backend)?,
        };

        let earliest = match backend.tags_containing(&self.prefix, change) {
            Ok(containing) => containing
                .into_iter()
                .filter_map(|name| {
                    let idx = *order.get(&name)?;
                    Some(ReleaseTag { name, order: idx })
                })
                .min(),
            Err(err) => {
                warn!(change = %change, error = %err, "containment query failed");
                None
            }
        };

        self.order = Some(order);
        self.memo.insert(change.clone(), earliest.clone());
        Ok(earliest)
    }

    fn load_order<B: Backend + ?Sized>(
        &self,
        backend: &B,
    ) -> Result<HashMap<String, usize>, BackendError> {
        let tags = backend.list_tags(&self.prefix)?;
        debug!(count = tags.len(), prefix = %self.prefix, "release tags listed");

        let mut order = HashMap::with_capacity(tags.len());
        for (idx, name) in tags.into_iter().enumerate() {
            // A duplicated name keeps its first (oldest) position.
            order.entry(name).or_insert(idx);
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::FailurePoint;
    use crate::backend::MemoryBackend;
    use crate::marker::MarkerKind;
    use std::path::PathBuf;

    fn change(id: &str) -> ChangeRef {
        ChangeRef::new(id)
    }

    #[test]
    fn test_attribute_uses_candidate_location() {
        let backend = MemoryBackend::new(".").attribute("Foo.src", 42, "c1");
        let candidate = Candidate {
            file: PathBuf::from("Foo.src"),
            line: 42,
            kind: MarkerKind::Introduced,
        };
        assert_eq!(attribute(&backend, &candidate).unwrap(), change("c1"));
    }

    #[test]
    fn test_earliest_containing_tag_wins() {
        let backend = MemoryBackend::new(".")
            .tag("rel-1.0", &["c1"])
            .tag("rel-1.1", &["c1", "c2"]);
        let mut resolver = ReleaseResolver::new("rel-");

        let tag = resolver.resolve(&backend, &change("c1")).unwrap().unwrap();
        assert_eq!(tag.name, "rel-1.0");
        assert_eq!(tag.order, 0);

        let tag = resolver.resolve(&backend, &change("c2")).unwrap().unwrap();
        assert_eq!(tag.name, "rel-1.1");
    }

    #[test]
    fn test_unreleased_change_is_none() {
        let backend = MemoryBackend::new(".").tag("rel-1.0", &["c1"]);
        let mut resolver = ReleaseResolver::new("rel-");
        assert_eq!(resolver.resolve(&backend, &change("c9")).unwrap(), None);
    }

    #[test]
    fn test_foreign_tags_are_ignored() {
        let backend = MemoryBackend::new(".")
            .tag("nightly-1", &["c1"])
            .tag("rel-1.0", &["c1"]);
        let mut resolver = ReleaseResolver::new("rel-");
        let tag = resolver.resolve(&backend, &change("c1")).unwrap().unwrap();
        assert_eq!(tag.name, "rel-1.0");
    }

    #[test]
    fn test_repeated_lookups_are_memoized_and_identical() {
        let backend = MemoryBackend::new(".")
            .tag("rel-1.0", &["c1"])
            .tag("rel-2.0", &["c1"]);
        let mut resolver = ReleaseResolver::new("rel-");

        let first = resolver.resolve(&backend, &change("c1")).unwrap();
        let second = resolver.resolve(&backend, &change("c1")).unwrap();
        assert_eq!(first, second);
        assert_eq!(backend.list_tag_calls(), 1);
        assert_eq!(backend.contains_calls(), 1);
    }

    #[test]
    fn test_tag_listing_failure_is_fatal() {
        let backend = MemoryBackend::new(".")
            .tag("rel-1.0", &["c1"])
            .fail_on(FailurePoint::ListTags);
        let mut resolver = ReleaseResolver::new("rel-");
        assert!(resolver.resolve(&backend, &change("c1")).is_err());
    }

    #[test]
    fn test_containment_failure_is_soft_miss() {
        let backend = MemoryBackend::new(".")
            .tag("rel-1.0", &["c1"])
            .fail_on(FailurePoint::Contains);
        let mut resolver = ReleaseResolver::new("rel-");
        assert_eq!(resolver.resolve(&backend, &change("c1")).unwrap(), None);
    }

    #[test]
    fn test_release_tag_ordering_follows_creation() {
        let older = ReleaseTag {
            name: "rel-9.0".to_string(),
            order: 0,
        };
        let newer = ReleaseTag {
            name: "rel-10.0".to_string(),
            order: 1,
        };
        assert!(older < newer);
    }
}
