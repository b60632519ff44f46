//! Result aggregation and the end-of-run report.

use crate::backend::ChangeRef;
use crate::config::Links;
use crate::marker::{release_version, Marker};
use crate::resolve::ReleaseTag;
use colored::Colorize;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};

/// Every change resolved during a run, with its first release.
///
/// Recording the same change twice keeps the first entry.
#[derive(Debug, Default, Clone)]
pub struct Aggregate {
    entries: Vec<(ChangeRef, ReleaseTag)>,
    index: HashMap<ChangeRef, usize>,
}

/// Changes that first shipped in one release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseGroup {
    pub tag: ReleaseTag,
    /// In first-recorded order
    pub changes: Vec<ChangeRef>,
}

impl Aggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `change` was not recorded before.
    pub fn record(&mut self, change: ChangeRef, tag: ReleaseTag) -> bool {
        if self.index.contains_key(&change) {
            return false;
        }
        self.index.insert(change.clone(), self.entries.len());
        self.entries.push((change, tag));
        true
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, change: &ChangeRef) -> Option<&ReleaseTag> {
        self.index.get(change).map(|&idx| &self.entries[idx].1)
    }

    /// Entries grouped by release, oldest release first.
    pub fn groups(&self) -> Vec<ReleaseGroup> {
        let mut grouped: BTreeMap<&ReleaseTag, Vec<ChangeRef>> = BTreeMap::new();
        for (change, tag) in &self.entries {
            grouped.entry(tag).or_default().push(change.clone());
        }
        grouped
            .into_iter()
            .map(|(tag, changes)| ReleaseGroup {
                tag: tag.clone(),
                changes,
            })
            .collect()
    }
}

/// Notice printed instead of an empty grouped report.
pub fn nothing_found_notice() -> String {
    let [introduced, deprecated, restricted] = Marker::placeholders();
    format!("No '{introduced}', '{deprecated}', or '{restricted}' placeholders were resolved.")
}

/// Human-readable report.
pub fn render_text<W: Write>(
    aggregate: &Aggregate,
    links: &Links,
    out: &mut W,
) -> io::Result<()> {
    if aggregate.is_empty() {
        return writeln!(out, "{}", nothing_found_notice());
    }

    writeln!(
        out,
        "{}",
        "List of commits introducing new API and the first release they went in:".bold()
    )?;
    for group in aggregate.groups() {
        writeln!(out, "* {}", links.release(&group.tag.name))?;
        for change in &group.changes {
            writeln!(out, "  - {}", links.commit(change.as_str()))?;
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct JsonReport<'a> {
    releases: Vec<JsonRelease<'a>>,
}

#[derive(Serialize)]
struct JsonRelease<'a> {
    tag: &'a str,
    version: &'a str,
    changes: &'a [ChangeRef],
}

/// Machine-readable report: `{"releases": [{"tag", "version", "changes"}]}`.
pub fn render_json<W: Write>(
    aggregate: &Aggregate,
    tag_prefix: &str,
    out: &mut W,
) -> io::Result<()> {
    let groups = aggregate.groups();
    let report = JsonReport {
        releases: groups
            .iter()
            .map(|group| JsonRelease {
                tag: &group.tag.name,
                version: release_version(&group.tag.name, tag_prefix),
                changes: &group.changes,
            })
            .collect(),
    };
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)
}
