//! Throwaway git repositories for backend and CLI tests.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// A git repository whose commits get strictly increasing dates, so tag
/// creation order is deterministic.
pub struct GitRepo {
    pub dir: TempDir,
    clock: i64,
}

impl GitRepo {
    pub fn init() -> Self {
        let dir = TempDir::new().unwrap();
        let repo = Self {
            dir,
            clock: 1_600_000_000,
        };
        repo.git(&["init", "--quiet"]);
        repo
    }

    pub fn inside_worktree(dir: &Path) -> bool {
        Command::new("git")
            .current_dir(dir)
            .args(["rev-parse", "--is-inside-work-tree"])
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, file: &str, content: &str) {
        let path = self.path().join(file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    pub fn read(&self, file: &str) -> String {
        fs::read_to_string(self.path().join(file)).unwrap()
    }

    /// Commit everything and return the commit id.
    pub fn commit(&mut self, message: &str) -> String {
        self.clock += 3600;
        self.git(&["add", "--all"]);
        self.git(&["commit", "--quiet", "--no-verify", "-m", message]);
        self.git(&["rev-parse", "HEAD"]).trim().to_string()
    }

    /// Lightweight tag on HEAD; creation date is the commit date.
    pub fn tag(&self, name: &str) {
        self.git(&["tag", name]);
    }

    pub fn git(&self, args: &[&str]) -> String {
        let date = format!("@{} +0000", self.clock);
        let output = Command::new("git")
            .current_dir(self.path())
            .args([
                "-c",
                "user.name=Release Bot",
                "-c",
                "user.email=release@example.org",
                "-c",
                "commit.gpgsign=false",
                "-c",
                "tag.gpgsign=false",
            ])
            .args(args)
            .env("GIT_AUTHOR_DATE", &date)
            .env("GIT_COMMITTER_DATE", &date)
            .env_remove("GIT_DIR")
            .env_remove("GIT_WORK_TREE")
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8(output.stdout).unwrap()
    }
}

/// Repository with one placeholder shipped in `rel-1.0` and again in
/// `rel-1.1`, plus one unreleased placeholder.
///
/// Returns the repository and the id of the released change.
pub fn released_fixture() -> (GitRepo, String) {
    let mut repo = GitRepo::init();
    repo.write("src/Base.java", "class Base {}\n");
    repo.commit("base");
    repo.tag("rel-0.9");

    repo.write(
        "src/Api.java",
        "/**\n * New API.\n * @since TODO\n */\npublic class Api {}\n",
    );
    let released = repo.commit("add api");
    repo.tag("rel-1.0");

    repo.write("src/Other.java", "class Other {}\n");
    repo.commit("other");
    repo.tag("rel-1.1");

    repo.write(
        "src/Next.java",
        "public class Next {\n    @Deprecated(since = \"TODO\")\n    void old() {}\n}\n",
    );
    repo.commit("unreleased");

    (repo, released)
}
