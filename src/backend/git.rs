//! [`Backend`] implementation that shells out to `git`.
//!
//! | capability          | command                                              |
//! |---------------------|------------------------------------------------------|
//! | `enumerate_matches` | `git grep --null -n -F -e <lit>... -- <glob>...`     |
//! | `attribute_line`    | `git blame --porcelain -L N,N -- <file>`             |
//! | `list_tags`         | `git tag --list --sort=creatordate <prefix>*`        |
//! | `tags_containing`   | `git tag --list --contains <change> <prefix>*`       |

use super::{Backend, BackendError, ChangeRef, RawMatch};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tracing::debug;

/// `git grep` exits with 1 when nothing matched.
const GREP_NO_MATCH: i32 = 1;

#[derive(Debug, Clone)]
pub struct GitBackend {
    root: PathBuf,
}

impl GitBackend {
    /// Backend rooted at an already-known worktree root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Locate the worktree containing `start` via `git rev-parse --show-toplevel`.
    pub fn discover(start: &Path) -> Result<Self, BackendError> {
        let output = run_git(start, ["rev-parse", "--show-toplevel"])?;
        let output = require_success(output, "git rev-parse --show-toplevel", &[])?;
        let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if root.is_empty() {
            return Err(BackendError::Malformed {
                command: "git rev-parse --show-toplevel".to_string(),
                detail: "empty worktree path".to_string(),
            });
        }
        debug!(root = %root, "discovered git worktree");
        Ok(Self::new(root))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn git<I, S>(&self, args: I, ok_codes: &[i32]) -> Result<Output, BackendError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();
        let command = describe(&args);
        let output = run_git(&self.root, &args)?;
        require_success(output, &command, ok_codes)
    }
}

impl Backend for GitBackend {
    fn enumerate_matches(
        &self,
        literals: &[&str],
        globs: &[String],
    ) -> Result<Vec<RawMatch>, BackendError> {
        let mut args: Vec<OsString> = ["grep", "--null", "--line-number", "--fixed-strings"]
            .iter()
            .map(OsString::from)
            .collect();
        for literal in literals {
            args.push(OsString::from("-e"));
            args.push(OsString::from(literal));
        }
        args.push(OsString::from("--"));
        args.extend(globs.iter().map(OsString::from));

        let command = describe(&args);
        let output = self.git(&args, &[GREP_NO_MATCH])?;
        if output.status.code() == Some(GREP_NO_MATCH) {
            debug!("git grep found no placeholders");
            return Ok(Vec::new());
        }
        parse_grep_output(&output.stdout).map_err(|detail| BackendError::Malformed {
            command,
            detail,
        })
    }

    fn attribute_line(&self, file: &Path, line: usize) -> Result<ChangeRef, BackendError> {
        let range = format!("{line},{line}");
        let args = [
            OsStr::new("blame"),
            OsStr::new("--porcelain"),
            OsStr::new("-L"),
            OsStr::new(&range),
            OsStr::new("--"),
            file.as_os_str(),
        ];
        let command = describe(&args);
        let output = self.git(args, &[])?;
        parse_blame_output(&output.stdout).map_err(|detail| BackendError::Malformed {
            command,
            detail,
        })
    }

    fn list_tags(&self, prefix: &str) -> Result<Vec<String>, BackendError> {
        let pattern = format!("{prefix}*");
        let output = self.git(["tag", "--list", "--sort=creatordate", pattern.as_str()], &[])?;
        Ok(parse_lines(&output.stdout))
    }

    fn tags_containing(
        &self,
        prefix: &str,
        change: &ChangeRef,
    ) -> Result<Vec<String>, BackendError> {
        let pattern = format!("{prefix}*");
        let output = self.git(
            ["tag", "--list", "--contains", change.as_str(), pattern.as_str()],
            &[],
        )?;
        Ok(parse_lines(&output.stdout))
    }
}

fn run_git<I, S>(dir: &Path, args: I) -> Result<Output, BackendError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();
    let command = describe(&args);
    debug!(%command, dir = %dir.display(), "running git");

    Command::new("git")
        .current_dir(dir)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|source| BackendError::Spawn { command, source })
}

/// Accept exit status 0 and any code in `ok_codes`; everything else is fatal.
fn require_success(
    output: Output,
    command: &str,
    ok_codes: &[i32],
) -> Result<Output, BackendError> {
    if output.status.success() {
        return Ok(output);
    }
    if let Some(code) = output.status.code() {
        if ok_codes.contains(&code) {
            return Ok(output);
        }
    }
    Err(BackendError::CommandFailed {
        command: command.to_string(),
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

fn describe<S: AsRef<OsStr>>(args: &[S]) -> String {
    let mut command = String::from("git");
    for arg in args {
        command.push(' ');
        command.push_str(&arg.as_ref().to_string_lossy());
    }
    command
}

/// Parse `git grep --null --line-number` records: `path\0line\0text\n`.
///
/// Older git versions separate the line number with `:` instead of NUL;
/// both are accepted.
fn parse_grep_output(stdout: &[u8]) -> Result<Vec<RawMatch>, String> {
    let mut matches = Vec::new();

    for record in stdout.split(|b| *b == b'\n') {
        if record.is_empty() {
            continue;
        }
        let record = record.strip_suffix(b"\r").unwrap_or(record);

        let name_end = record
            .iter()
            .position(|b| *b == 0)
            .ok_or_else(|| format!("missing path separator in {:?}", lossy(record)))?;
        let file = PathBuf::from(lossy(&record[..name_end]));

        let rest = &record[name_end + 1..];
        let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
        if digits == 0 || !matches!(rest.get(digits).copied(), Some(0) | Some(b':')) {
            return Err(format!("missing line number in {:?}", lossy(record)));
        }
        let line = lossy(&rest[..digits])
            .parse::<usize>()
            .map_err(|e| format!("bad line number in {:?}: {e}", lossy(record)))?;
        let text = lossy(&rest[digits + 1..]);

        matches.push(RawMatch { file, line, text });
    }

    Ok(matches)
}

/// The first token of porcelain blame output is the commit id.
fn parse_blame_output(stdout: &[u8]) -> Result<ChangeRef, String> {
    let text = String::from_utf8_lossy(stdout);
    let first = text
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().next())
        .ok_or_else(|| "empty blame output".to_string())?;

    if !first.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("expected a commit id, found {first:?}"));
    }
    Ok(ChangeRef::new(first))
}

fn parse_lines(stdout: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
