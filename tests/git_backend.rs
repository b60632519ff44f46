//! `GitBackend` against real repositories
//!
//! Skipped when no `git` executable is available.

mod common;

use common::{git_available, released_fixture, GitRepo};
use since_resolver::{
    scan, Backend, ChangeRef, GitBackend, MarkerKind, ReleaseResolver, RepoGuard, Updater,
    UpdaterConfig, WriteMode,
};
use std::path::Path;

fn config() -> UpdaterConfig {
    UpdaterConfig {
        tag_prefix: "rel-".to_string(),
        ..UpdaterConfig::default()
    }
}

#[test]
fn test_discover_finds_worktree_root() {
    if !git_available() {
        return;
    }
    let (repo, _) = released_fixture();
    let backend = GitBackend::discover(&repo.path().join("src")).unwrap();

    assert_eq!(
        backend.root().canonicalize().unwrap(),
        repo.path().canonicalize().unwrap()
    );
}

#[test]
fn test_scan_finds_tracked_placeholders() {
    if !git_available() {
        return;
    }
    let (repo, _) = released_fixture();
    let backend = GitBackend::new(repo.path());

    let candidates = scan(&backend, &config().include).unwrap();

    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].file, Path::new("src/Api.java"));
    assert_eq!(candidates[0].line, 3);
    assert_eq!(candidates[0].kind, MarkerKind::Introduced);
    assert_eq!(candidates[1].file, Path::new("src/Next.java"));
    assert_eq!(candidates[1].kind, MarkerKind::Deprecated);
}

#[test]
fn test_no_match_is_empty_not_an_error() {
    if !git_available() {
        return;
    }
    let mut repo = GitRepo::init();
    repo.write("Plain.java", "class Plain {}\n");
    repo.commit("plain");

    let backend = GitBackend::new(repo.path());
    let matches = backend
        .enumerate_matches(&["@since TODO"], &["*.java".to_string()])
        .unwrap();
    assert!(matches.is_empty());
}

#[test]
fn test_blame_and_first_release() {
    if !git_available() {
        return;
    }
    let (repo, released) = released_fixture();
    let backend = GitBackend::new(repo.path());

    let change = backend
        .attribute_line(Path::new("src/Api.java"), 3)
        .unwrap();
    assert_eq!(change, ChangeRef::new(released.clone()));

    assert_eq!(
        backend.list_tags("rel-").unwrap(),
        vec!["rel-0.9", "rel-1.0", "rel-1.1"]
    );

    let mut resolver = ReleaseResolver::new("rel-");
    let tag = resolver.resolve(&backend, &change).unwrap().unwrap();
    assert_eq!(tag.name, "rel-1.0");
}

#[test]
fn test_unknown_file_is_fatal() {
    if !git_available() {
        return;
    }
    let (repo, _) = released_fixture();
    let backend = GitBackend::new(repo.path());

    assert!(backend
        .attribute_line(Path::new("src/Missing.java"), 1)
        .is_err());
}

#[test]
fn test_full_run_rewrites_released_placeholder_only() {
    if !git_available() {
        return;
    }
    let (repo, released) = released_fixture();
    let backend = GitBackend::new(repo.path());
    let guard = RepoGuard::new(repo.path()).unwrap();

    colored::control::set_override(false);
    let updater = Updater::new(backend, config(), guard).with_mode(WriteMode::Write);
    let summary = updater.run(&mut Vec::new()).unwrap();

    assert_eq!(
        repo.read("src/Api.java"),
        "/**\n * New API.\n * @since 1.0\n */\npublic class Api {}\n"
    );
    assert!(repo.read("src/Next.java").contains("@Deprecated(since = \"TODO\")"));
    assert_eq!(summary.applied(), 1);
    assert_eq!(summary.soft_misses.len(), 1);
    assert_eq!(
        summary
            .aggregate
            .get(&ChangeRef::new(released))
            .map(|tag| tag.name.as_str()),
        Some("rel-1.0")
    );
}

#[test]
fn test_uncommitted_placeholder_is_a_soft_miss() {
    if !git_available() {
        return;
    }
    let (repo, _) = released_fixture();
    repo.write("src/Base.java", "class Base {}\n/** @since TODO */\n");
    let backend = GitBackend::new(repo.path());
    let guard = RepoGuard::new(repo.path()).unwrap();

    colored::control::set_override(false);
    let updater = Updater::new(backend, config(), guard);
    let mut out = Vec::new();
    let summary = updater.run(&mut out).unwrap();
    let output = String::from_utf8(out).unwrap();

    let (candidate, change) = summary
        .soft_misses
        .iter()
        .find(|(candidate, _)| candidate.file == Path::new("src/Base.java"))
        .unwrap();
    assert_eq!(candidate.line, 2);
    assert!(change.as_str().chars().all(|c| c == '0'));
    assert!(output.contains("Not updating src/Base.java:2"));

    assert_eq!(repo.read("src/Base.java"), "class Base {}\n/** @since TODO */\n");
    assert!(repo.read("src/Api.java").contains(" * @since 1.0\n"));
}
