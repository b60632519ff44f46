//! Candidate scanner: turns backend matches into one [`Candidate`] per
//! placeholder occurrence.

use crate::backend::{Backend, BackendError};
use crate::marker::{Marker, MarkerKind};
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

/// A pending placeholder at a known location.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Candidate {
    /// Path relative to the repository root
    pub file: PathBuf,
    /// 1-based line number
    pub line: usize,
    pub kind: MarkerKind,
}

impl Candidate {
    pub fn marker(&self) -> &'static Marker {
        self.kind.marker()
    }
}

/// Enumerate placeholder occurrences in files matching `include`.
///
/// A line carrying several different placeholders yields one candidate per
/// kind. The result is sorted by file, line, then kind.
pub fn scan<B: Backend + ?Sized>(
    backend: &B,
    include: &[String],
) -> Result<Vec<Candidate>, BackendError> {
    let literals = Marker::placeholders();
    let matches = backend.enumerate_matches(&literals, include)?;
    debug!(lines = matches.len(), "placeholder lines enumerated");

    let mut candidates: Vec<Candidate> = matches
        .into_iter()
        .flat_map(|m| {
            Marker::kinds_in(&m.text)
                .map(|kind| Candidate {
                    file: m.file.clone(),
                    line: m.line,
                    kind,
                })
                .collect::<Vec<_>>()
        })
        .collect();

    candidates.sort();
    candidates.dedup();
    Ok(candidates)
}
