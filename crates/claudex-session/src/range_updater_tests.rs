// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Mutex;

use super::*;
use claudex_core::Policy;
use tempfile::tempdir;

struct FakeVcs {
    head: String,
    reachable: Vec<String>,
    diffs: std::collections::HashMap<(String, String), Vec<PathBuf>>,
    messages: Mutex<std::collections::HashMap<(String, String), Vec<String>>>,
}

impl FakeVcs {
    fn new(head: &str) -> Self {
        Self {
            head: head.to_owned(),
            reachable: Vec::new(),
            diffs: std::collections::HashMap::new(),
            messages: Mutex::new(std::collections::HashMap::new()),
        }
    }

    fn with_diff(mut self, base: &str, head: &str, files: &[&str]) -> Self {
        self.diffs.insert((base.to_owned(), head.to_owned()), files.iter().map(PathBuf::from).collect());
        self.reachable.push(base.to_owned());
        self
    }

    fn with_messages(self, base: &str, head: &str, msgs: &[&str]) -> Self {
        self.messages
            .lock()
            .unwrap()
            .insert((base.to_owned(), head.to_owned()), msgs.iter().map(|s| s.to_string()).collect());
        self
    }
}

impl VcsService for FakeVcs {
    fn head(&self) -> Result<String> {
        Ok(self.head.clone())
    }

    fn is_reachable(&self, commit: &str) -> Result<bool> {
        Ok(self.reachable.iter().any(|c| c == commit))
    }

    fn merge_base(&self, _a: &str, _b: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn diff_files(&self, base: &str, head: &str) -> Result<Vec<PathBuf>> {
        Ok(self.diffs.get(&(base.to_owned(), head.to_owned())).cloned().unwrap_or_default())
    }

    fn log_messages(&self, base: &str, head: &str) -> Result<Vec<String>> {
        Ok(self
            .messages
            .lock()
            .unwrap()
            .get(&(base.to_owned(), head.to_owned()))
            .cloned()
            .unwrap_or_default())
    }
}

fn write_tracking_at(session_path: &Path, commit: &str) {
    std::fs::write(
        session_path.join(TRACKING_FILE),
        serde_json::to_string(&TrackingState {
            last_processed_commit: commit.to_owned(),
            updated_at: "2024-01-01T00:00:00Z".into(),
            strategy_version: STRATEGY_VERSION.into(),
        })
        .unwrap(),
    )
    .unwrap();
}

#[tokio::test]
async fn initializes_tracking_on_first_run() {
    let dir = tempdir().unwrap();
    let vcs = FakeVcs::new("c1");
    let commander = Commander::new(Policy::default());
    let config = RangeUpdaterConfig {
        session_path: dir.path(),
        repo_root: dir.path(),
        default_branch: "main",
        lock_timeout: Duration::from_millis(100),
    };

    let result = run(&vcs, &commander, config, "true").await;

    assert_eq!(result.status, RangeStatus::Success);
    assert!(result.affected_indexes.is_empty());
    let tracking = read_tracking(&dir.path().join(TRACKING_FILE)).unwrap();
    assert_eq!(tracking.last_processed_commit, "c1");
}

#[tokio::test]
async fn happy_path_resolves_affected_index() {
    let dir = tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("src")).unwrap();
    std::fs::write(dir.path().join("src/index.md"), "# src").unwrap();
    write_tracking_at(dir.path(), "c1");

    let vcs = FakeVcs::new("c2").with_diff("c1", "c2", &["src/foo.go"]);
    let commander = Commander::new(Policy::default());
    let config = RangeUpdaterConfig {
        session_path: dir.path(),
        repo_root: dir.path(),
        default_branch: "main",
        lock_timeout: Duration::from_millis(100),
    };

    let result = run(&vcs, &commander, config, "true").await;

    assert_eq!(result.status, RangeStatus::Success);
    assert_eq!(result.affected_indexes, vec![dir.path().join("src/index.md")]);
    let tracking = read_tracking(&dir.path().join(TRACKING_FILE)).unwrap();
    assert_eq!(tracking.last_processed_commit, "c2");
}

#[tokio::test]
async fn no_new_commits_is_skipped() {
    let dir = tempdir().unwrap();
    write_tracking_at(dir.path(), "c1");
    let vcs = FakeVcs::new("c1").with_diff("c1", "c1", &[]);
    let commander = Commander::new(Policy::default());
    let config = RangeUpdaterConfig {
        session_path: dir.path(),
        repo_root: dir.path(),
        default_branch: "main",
        lock_timeout: Duration::from_millis(100),
    };

    let result = run(&vcs, &commander, config, "true").await;
    assert_eq!(result.status, RangeStatus::Skipped);
    assert_eq!(result.reason.as_deref(), Some("no new commits"));
}

#[tokio::test]
async fn docs_only_change_is_skipped_and_tracking_advances() {
    let dir = tempdir().unwrap();
    write_tracking_at(dir.path(), "c1");
    let vcs = FakeVcs::new("c2").with_diff("c1", "c2", &["src/index.md"]);
    let commander = Commander::new(Policy::default());
    let config = RangeUpdaterConfig {
        session_path: dir.path(),
        repo_root: dir.path(),
        default_branch: "main",
        lock_timeout: Duration::from_millis(100),
    };

    let result = run(&vcs, &commander, config, "true").await;

    assert_eq!(result.status, RangeStatus::Skipped);
    assert!(result.reason.unwrap().contains("documentation"));
    let tracking = read_tracking(&dir.path().join(TRACKING_FILE)).unwrap();
    assert_eq!(tracking.last_processed_commit, "c2");
}

#[tokio::test]
async fn skip_docs_env_takes_precedence_over_commit_tag() {
    let dir = tempdir().unwrap();
    write_tracking_at(dir.path(), "c1");
    let vcs = FakeVcs::new("c2")
        .with_diff("c1", "c2", &["src/foo.go"])
        .with_messages("c1", "c2", &["unrelated message, no tag here"]);
    let commander = Commander::new(Policy::default());
    let config = RangeUpdaterConfig {
        session_path: dir.path(),
        repo_root: dir.path(),
        default_branch: "main",
        lock_timeout: Duration::from_millis(100),
    };

    std::env::set_var(SKIP_DOCS_ENV, "1");
    let result = run(&vcs, &commander, config, "true").await;
    std::env::remove_var(SKIP_DOCS_ENV);

    assert_eq!(result.status, RangeStatus::Skipped);
    assert_eq!(result.reason.as_deref(), Some("CLAUDEX_SKIP_DOCS=1"));
}

#[tokio::test]
async fn skip_docs_commit_tag_is_honored() {
    let dir = tempdir().unwrap();
    write_tracking_at(dir.path(), "c1");
    let vcs = FakeVcs::new("c2")
        .with_diff("c1", "c2", &["src/foo.go"])
        .with_messages("c1", "c2", &["do the thing [skip-docs] please"]);
    let commander = Commander::new(Policy::default());
    let config = RangeUpdaterConfig {
        session_path: dir.path(),
        repo_root: dir.path(),
        default_branch: "main",
        lock_timeout: Duration::from_millis(100),
    };

    let result = run(&vcs, &commander, config, "true").await;
    assert_eq!(result.status, RangeStatus::Skipped);
    assert!(result.reason.unwrap().contains("skip-docs"));
}

#[tokio::test]
async fn lock_contention_returns_locked_and_preserves_tracking() {
    let dir = tempdir().unwrap();
    write_tracking_at(dir.path(), "c1");
    let lock_path = dir.path().join(LOCK_FILE);
    let held = Lock::acquire(&lock_path).unwrap();

    let vcs = FakeVcs::new("c2").with_diff("c1", "c2", &["src/foo.go"]);
    let commander = Commander::new(Policy::default());
    let config = RangeUpdaterConfig {
        session_path: dir.path(),
        repo_root: dir.path(),
        default_branch: "main",
        lock_timeout: Duration::from_millis(100),
    };

    let result = run(&vcs, &commander, config, "true").await;

    assert_eq!(result.status, RangeStatus::Locked);
    let tracking = read_tracking(&dir.path().join(TRACKING_FILE)).unwrap();
    assert_eq!(tracking.last_processed_commit, "c1");
    assert!(lock_path.exists());
    held.release().unwrap();
}

#[test]
fn nearest_index_walks_up_to_closest_ancestor() {
    let dir = tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("a/b")).unwrap();
    std::fs::write(dir.path().join("a/index.md"), "# a").unwrap();
    let found = nearest_index(dir.path(), Path::new("a/b/file.rs"));
    assert_eq!(found, Some(dir.path().join("a/index.md")));
}

#[test]
fn nearest_index_returns_none_when_absent() {
    let dir = tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("a/b")).unwrap();
    let found = nearest_index(dir.path(), Path::new("a/b/file.rs"));
    assert_eq!(found, None);
}
