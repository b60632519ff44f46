use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::ops::Range;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The rewrite primitive: replace the first occurrence of a placeholder on
/// one line of one file.
///
/// Everything outside the matched bytes is preserved exactly, including
/// line endings and bytes that are not valid UTF-8. If the placeholder is no
/// longer on that line the edit is a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "LineEdit does nothing until apply() is called"]
pub struct LineEdit {
    /// File to edit
    pub file: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// Literal text to find on the line
    pub placeholder: String,
    /// Literal text written in its place
    pub replacement: String,
}

/// File contents as left by earlier dry-run edits.
///
/// A dry run never touches storage, so a second edit to the same file would
/// otherwise see the original bytes. Edits applied through
/// [`LineEdit::apply_staged`] read from and write to this overlay instead.
#[derive(Debug, Default, Clone)]
pub struct DryRunOverlay {
    files: HashMap<PathBuf, Vec<u8>>,
}

impl DryRunOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Staged content of `path`, if a dry-run edit touched it.
    pub fn get(&self, path: &Path) -> Option<&[u8]> {
        self.files.get(path).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Whether [`LineEdit::apply`] persists its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    #[default]
    Write,
    /// Match exactly as `Write` would, but leave storage untouched
    DryRun,
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("Placeholder must not be empty")]
    EmptyPlaceholder,

    #[error("Placeholder and replacement must not contain line breaks")]
    MultiLine,

    #[error("File I/O error on {file}: {source}")]
    Io {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result of applying a line edit.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "EditResult should be checked for applied/no-op"]
pub enum EditResult {
    /// The placeholder was found and replaced (or would be, in a dry run)
    Applied {
        file: PathBuf,
        line: usize,
        before: String,
        after: String,
        persisted: bool,
    },
    /// The placeholder was not on the line; nothing was touched
    NoPlaceholder { file: PathBuf, line: usize },
}

impl EditResult {
    pub fn is_applied(&self) -> bool {
        matches!(self, EditResult::Applied { .. })
    }
}

impl LineEdit {
    pub fn new(
        file: impl Into<PathBuf>,
        line: usize,
        placeholder: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            line,
            placeholder: placeholder.into(),
            replacement: replacement.into(),
        }
    }

    fn validate(&self) -> Result<(), EditError> {
        if self.placeholder.is_empty() {
            return Err(EditError::EmptyPlaceholder);
        }
        let has_break = |s: &str| s.contains('\n') || s.contains('\r');
        if has_break(&self.placeholder) || has_break(&self.replacement) {
            return Err(EditError::MultiLine);
        }
        Ok(())
    }

    /// Byte range of the placeholder inside `content`, if it is on our line.
    fn locate(&self, content: &[u8]) -> Option<Range<usize>> {
        let span = line_span(content, self.line)?;
        let offset = find(&content[span.clone()], self.placeholder.as_bytes())?;
        let start = span.start + offset;
        Some(start..start + self.placeholder.len())
    }

    /// Apply this edit.
    ///
    /// In [`WriteMode::Write`] the new content is persisted atomically
    /// (tempfile in the same directory, fsync, rename), so a crash leaves
    /// either the old or the new file, never a mix.
    pub fn apply(&self, mode: WriteMode) -> Result<EditResult, EditError> {
        self.apply_staged(mode, &mut DryRunOverlay::new())
    }

    /// Apply this edit on top of earlier dry-run edits.
    ///
    /// In [`WriteMode::DryRun`] the file is read from `overlay` when an
    /// earlier edit staged it there, and the updated content is staged in
    /// turn. [`WriteMode::Write`] behaves exactly like [`LineEdit::apply`].
    pub fn apply_staged(
        &self,
        mode: WriteMode,
        overlay: &mut DryRunOverlay,
    ) -> Result<EditResult, EditError> {
        self.validate()?;

        let staged = match mode {
            WriteMode::DryRun => overlay.files.get(&self.file).cloned(),
            WriteMode::Write => None,
        };
        let original = match staged {
            Some(content) => content,
            None => fs::read(&self.file).map_err(|source| self.io_error(source))?,
        };

        let Some(range) = self.locate(&original) else {
            return Ok(EditResult::NoPlaceholder {
                file: self.file.clone(),
                line: self.line,
            });
        };

        let mut updated =
            Vec::with_capacity(original.len() - range.len() + self.replacement.len());
        updated.extend_from_slice(&original[..range.start]);
        updated.extend_from_slice(self.replacement.as_bytes());
        updated.extend_from_slice(&original[range.end..]);

        let before = line_text(&original, self.line);
        let after = line_text(&updated, self.line);

        let persisted = match mode {
            WriteMode::Write => {
                atomic_write(&self.file, &updated).map_err(|source| self.io_error(source))?;
                true
            }
            WriteMode::DryRun => {
                overlay.files.insert(self.file.clone(), updated);
                false
            }
        };

        Ok(EditResult::Applied {
            file: self.file.clone(),
            line: self.line,
            before,
            after,
            persisted,
        })
    }

    fn io_error(&self, source: std::io::Error) -> EditError {
        EditError::Io {
            file: self.file.clone(),
            source,
        }
    }
}

/// Byte range of 1-based `line`, excluding its `\n`. A trailing `\r` stays
/// in the range.
fn line_span(content: &[u8], line: usize) -> Option<Range<usize>> {
    if line == 0 {
        return None;
    }

    let mut start = 0;
    for _ in 1..line {
        let newline = content[start..].iter().position(|b| *b == b'\n')?;
        start += newline + 1;
    }

    let end = content[start..]
        .iter()
        .position(|b| *b == b'\n')
        .map_or(content.len(), |p| start + p);
    Some(start..end)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn line_text(content: &[u8], line: usize) -> String {
    line_span(content, line)
        .map(|span| {
            let bytes = &content[span];
            let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
            String::from_utf8_lossy(bytes).into_owned()
        })
        .unwrap_or_default()
}

/// Atomic file write: tempfile + fsync + rename.
///
/// The original file's permissions carry over to the replacement.
fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    // Same directory keeps the rename on one filesystem
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let permissions = fs::metadata(path)?.permissions();
    let mut temp = tempfile::NamedTempFile::new_in(parent)?;

    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    fs::set_permissions(temp.path(), permissions)?;

    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
