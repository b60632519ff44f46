//! The resolution pipeline.
//!
//! Candidates are processed one at a time, in scan order: attribute the
//! line, resolve the first release, rewrite the placeholder, record the
//! result. A later rewrite always sees the effect of an earlier one on the
//! same file; in a dry run the earlier result is staged in memory.

use crate::backend::{Backend, BackendError, ChangeRef};
use crate::config::UpdaterConfig;
use crate::edit::{DryRunOverlay, EditError, EditResult, LineEdit, WriteMode};
use crate::marker::release_version;
use crate::report::Aggregate;
use crate::resolve::{attribute, ReleaseResolver};
use crate::safety::{RepoGuard, SafetyError};
use crate::scan::{scan, Candidate};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::io::{self, Write};
use thiserror::Error;
use tracing::info;

/// Environment variable whose value `true` selects [`ConsoleStyle::Grouped`].
pub const GROUPED_CONSOLE_ENV: &str = "GITHUB_ACTIONS";

/// How per-candidate trace output is framed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsoleStyle {
    #[default]
    Plain,
    /// Each candidate's trace is wrapped in collapsible
    /// `::group::` / `::endgroup::` workflow commands
    Grouped,
}

impl ConsoleStyle {
    pub fn from_env() -> Self {
        match std::env::var(GROUPED_CONSOLE_ENV) {
            Ok(value) if value == "true" => ConsoleStyle::Grouped,
            _ => ConsoleStyle::Plain,
        }
    }

    fn open<W: Write>(self, out: &mut W, title: &str) -> io::Result<()> {
        match self {
            ConsoleStyle::Plain => writeln!(out, "{title}"),
            ConsoleStyle::Grouped => writeln!(out, "::group::{title}"),
        }
    }

    fn close<W: Write>(self, out: &mut W) -> io::Result<()> {
        match self {
            ConsoleStyle::Plain => Ok(()),
            ConsoleStyle::Grouped => writeln!(out, "::endgroup::"),
        }
    }
}

/// Every variant aborts the run.
#[derive(Error, Debug)]
pub enum UpdateError {
    #[error("version control query failed: {0}")]
    Backend(#[from] BackendError),

    #[error("rewrite failed: {0}")]
    Edit(#[from] EditError),

    #[error("refusing to rewrite: {0}")]
    Safety(#[from] SafetyError),

    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

/// What a completed run did.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub candidates: usize,
    pub aggregate: Aggregate,
    /// One entry per candidate whose release was found
    pub rewrites: Vec<EditResult>,
    /// Candidates whose change is not in any release yet
    pub soft_misses: Vec<(Candidate, ChangeRef)>,
}

impl RunSummary {
    pub fn applied(&self) -> usize {
        self.rewrites.iter().filter(|r| r.is_applied()).count()
    }
}

pub struct Updater<B> {
    backend: B,
    config: UpdaterConfig,
    guard: RepoGuard,
    mode: WriteMode,
    console: ConsoleStyle,
    show_diff: bool,
}

impl<B: Backend> Updater<B> {
    pub fn new(backend: B, config: UpdaterConfig, guard: RepoGuard) -> Self {
        Self {
            backend,
            config,
            guard,
            mode: WriteMode::Write,
            console: ConsoleStyle::Plain,
            show_diff: false,
        }
    }

    pub fn with_mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_console(mut self, console: ConsoleStyle) -> Self {
        self.console = console;
        self
    }

    /// Print a unified diff of every rewritten line.
    pub fn with_diff(mut self, show_diff: bool) -> Self {
        self.show_diff = show_diff;
        self
    }

    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    /// Run the pipeline, writing the per-candidate trace to `out`.
    ///
    /// Output is identical in dry-run and write mode.
    pub fn run<W: Write>(&self, out: &mut W) -> Result<RunSummary, UpdateError> {
        let candidates = scan(&self.backend, &self.config.include)?;
        info!(count = candidates.len(), "placeholder candidates found");

        let mut resolver = ReleaseResolver::new(self.config.tag_prefix.clone());
        let mut overlay = DryRunOverlay::new();
        let mut summary = RunSummary {
            candidates: candidates.len(),
            ..RunSummary::default()
        };

        for candidate in candidates {
            let location = format!("{}:{}", candidate.file.display(), candidate.line);
            self.console
                .open(out, &format!("Processing {location} ({})", candidate.kind))?;
            self.process(
                &candidate,
                &location,
                &mut resolver,
                &mut overlay,
                &mut summary,
                out,
            )?;
            self.console.close(out)?;
        }

        info!(
            resolved = summary.aggregate.len(),
            rewrites = summary.applied(),
            unreleased = summary.soft_misses.len(),
            "run complete"
        );
        Ok(summary)
    }

    fn process<W: Write>(
        &self,
        candidate: &Candidate,
        location: &str,
        resolver: &mut ReleaseResolver,
        overlay: &mut DryRunOverlay,
        summary: &mut RunSummary,
        out: &mut W,
    ) -> Result<(), UpdateError> {
        let change = attribute(&self.backend, candidate)?;

        let Some(tag) = resolver.resolve(&self.backend, &change)? else {
            writeln!(
                out,
                "\t{} {location}, no tag found for {}. Normal if the change is not \
                 merged and released yet; otherwise make sure release tags are fetched",
                "Not updating".yellow(),
                change.short()
            )?;
            summary.soft_misses.push((candidate.clone(), change));
            return Ok(());
        };
        writeln!(out, "\tfirst release containing {} is {}", change.short(), tag.name)?;

        let marker = candidate.marker();
        let replacement = marker.render(release_version(&tag.name, &self.config.tag_prefix));
        let path = self.guard.validate_path(&candidate.file)?;

        let result = LineEdit::new(path, candidate.line, marker.placeholder, &replacement)
            .apply_staged(self.mode, overlay)?;

        match &result {
            EditResult::Applied { before, after, .. } => {
                writeln!(
                    out,
                    "\t{} {location} to {replacement}",
                    "Updating".green()
                )?;
                if self.show_diff {
                    write_line_diff(out, location, before, after)?;
                }
            }
            EditResult::NoPlaceholder { .. } => {
                writeln!(out, "\t{} {location}", "Placeholder already gone from".dimmed())?;
            }
        }

        summary.aggregate.record(change, tag);
        summary.rewrites.push(result);
        Ok(())
    }
}

fn write_line_diff<W: Write>(
    out: &mut W,
    location: &str,
    before: &str,
    after: &str,
) -> io::Result<()> {
    writeln!(out, "{}", format!("--- {location} (original)").dimmed())?;
    writeln!(out, "{}", format!("+++ {location} (updated)").dimmed())?;

    let before = format!("{before}\n");
    let after = format!("{after}\n");
    let diff = TextDiff::from_lines(&before, &after);

    for change in diff.iter_all_changes() {
        let line = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        write!(out, "{}", line)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::FailurePoint;
    use crate::backend::MemoryBackend;
    use std::fs;
    use std::path::Path;

    fn config() -> UpdaterConfig {
        UpdaterConfig {
            tag_prefix: "rel-".to_string(),
            include: vec!["*.src".to_string()],
            ..UpdaterConfig::default()
        }
    }

    fn updater(root: &Path, backend: MemoryBackend) -> Updater<MemoryBackend> {
        Updater::new(backend, config(), RepoGuard::new(root).unwrap())
    }

    fn run(updater: &Updater<MemoryBackend>) -> (RunSummary, String) {
        colored::control::set_override(false);
        let mut out = Vec::new();
        let summary = updater.run(&mut out).unwrap();
        (summary, String::from_utf8(out).unwrap())
    }

    fn write_lines(path: &Path, count: usize, at: usize, text: &str) {
        let mut content = String::new();
        for n in 1..=count {
            if n == at {
                content.push_str(text);
            } else {
                content.push_str(&format!("line {n}"));
            }
            content.push('\n');
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_grouped_console_frames_each_candidate() {
        let dir = tempfile::tempdir().unwrap();
        write_lines(&dir.path().join("Foo.src"), 3, 2, " * @since TODO");
        let backend = MemoryBackend::new(dir.path())
            .attribute_rest("c1")
            .tag("rel-1.0", &["c1"]);

        let updater = updater(dir.path(), backend).with_console(ConsoleStyle::Grouped);
        let (_, output) = run(&updater);

        assert!(output.starts_with("::group::Processing Foo.src:2"));
        assert!(output.trim_end().ends_with("::endgroup::"));
    }

    #[test]
    fn test_unreleased_change_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Foo.src");
        write_lines(&file, 3, 2, " * @since TODO");
        let backend = MemoryBackend::new(dir.path())
            .attribute_rest("c1")
            .tag("rel-1.0", &["c0"]);

        let (summary, output) = run(&updater(dir.path(), backend));

        assert!(summary.aggregate.is_empty());
        assert_eq!(summary.soft_misses.len(), 1);
        assert!(output.contains("Not updating"));
        assert!(fs::read_to_string(&file).unwrap().contains("@since TODO"));
    }

    #[test]
    fn test_history_failure_aborts() {
        let dir = tempfile::tempdir().unwrap();
        write_lines(&dir.path().join("Foo.src"), 1, 1, "@since TODO");
        let backend = MemoryBackend::new(dir.path()).fail_on(FailurePoint::Attribute);

        let result = updater(dir.path(), backend).run(&mut Vec::new());
        assert!(matches!(result, Err(UpdateError::Backend(_))));
    }

    #[test]
    fn test_diff_output() {
        let dir = tempfile::tempdir().unwrap();
        write_lines(&dir.path().join("Foo.src"), 1, 1, "x @since TODO");
        let backend = MemoryBackend::new(dir.path())
            .attribute_rest("c1")
            .tag("rel-4.2", &["c1"]);

        let (_, output) = run(&updater(dir.path(), backend).with_diff(true));
        assert!(output.contains("-x @since TODO\n"));
        assert!(output.contains("+x @since 4.2\n"));
    }

    #[test]
    fn test_console_style_default_is_plain() {
        assert_eq!(ConsoleStyle::default(), ConsoleStyle::Plain);
    }
}
