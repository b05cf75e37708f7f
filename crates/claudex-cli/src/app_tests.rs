// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

fn app() -> App {
    App::new(Config::default())
}

#[test]
fn install_hooks_creates_new_file_with_shebang_and_marker() {
    let dir = tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join(".git").join("hooks")).unwrap();

    let hook_path = app().install_hooks(dir.path()).unwrap();
    let contents = std::fs::read_to_string(&hook_path).unwrap();

    assert!(contents.starts_with("#!/bin/sh\n"));
    assert!(contents.contains(HOOK_GUARD_MARKER));
    assert!(contents.contains("claudex --update-docs &"));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&hook_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}

#[test]
fn install_hooks_appends_to_existing_file_without_shebang() {
    let dir = tempdir().unwrap();
    let hooks_dir = dir.path().join(".git").join("hooks");
    std::fs::create_dir_all(&hooks_dir).unwrap();
    std::fs::write(hooks_dir.join("post-commit"), "#!/bin/sh\necho existing\n").unwrap();

    let hook_path = app().install_hooks(dir.path()).unwrap();
    let contents = std::fs::read_to_string(&hook_path).unwrap();

    assert_eq!(contents.matches("#!/bin/sh").count(), 1);
    assert!(contents.contains("echo existing"));
    assert!(contents.contains(HOOK_GUARD_MARKER));
}

#[test]
fn install_hooks_is_idempotent() {
    let dir = tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join(".git").join("hooks")).unwrap();

    let app = app();
    app.install_hooks(dir.path()).unwrap();
    let first = std::fs::read_to_string(dir.path().join(".git/hooks/post-commit")).unwrap();
    app.install_hooks(dir.path()).unwrap();
    let second = std::fs::read_to_string(dir.path().join(".git/hooks/post-commit")).unwrap();

    assert_eq!(first, second);
}

#[test]
fn new_derives_commander_policy_from_config() {
    let mut config = Config::default();
    config.features.process_protection.max_processes = 3;
    config.features.process_protection.rate_limit_per_second = 7;
    config.features.process_protection.timeout_seconds = 42;

    // Policy isn't publicly inspectable on Commander, so this just
    // confirms construction doesn't panic with a non-default policy.
    let _app = App::new(config);
}
