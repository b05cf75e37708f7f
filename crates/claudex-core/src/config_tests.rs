// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let config = Config::load(&path).unwrap();
    assert!(config.features.process_protection.autodoc_session_progress);
    assert_eq!(config.features.process_protection.autodoc_frequency, 5);
    assert_eq!(config.features.process_protection.rate_limit_per_second, 5);
    assert_eq!(config.features.process_protection.timeout_seconds, 300);
    assert!(!config.features.no_overwrite);
}

#[test]
fn malformed_file_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "not valid toml [[[").unwrap();
    assert!(Config::load(&path).is_err());
}

#[test]
fn loads_overridden_values_and_defaults_missing_ones() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
        [features]
        no_overwrite = true
        doc = ["README.md", "docs/index.md"]

        [features.process_protection]
        autodoc_frequency = 10
        max_processes = 4
        "#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();
    assert!(config.features.no_overwrite);
    assert_eq!(config.features.doc, vec!["README.md", "docs/index.md"]);
    assert_eq!(config.features.process_protection.autodoc_frequency, 10);
    assert_eq!(config.features.process_protection.max_processes, 4);
    // Untouched keys keep their defaults.
    assert_eq!(config.features.process_protection.rate_limit_per_second, 5);
    assert!(config.features.process_protection.autodoc_session_end);
}

#[test]
fn env_overrides_apply_on_top_of_loaded_values() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[features.process_protection]\nmax_processes = 4\n").unwrap();

    let mut config = Config::load(&path).unwrap();
    std::env::set_var("CLAUDEX_MAX_PROCESSES", "9");
    std::env::set_var("CLAUDEX_RATE_LIMIT", "1");
    config.apply_env_overrides();
    std::env::remove_var("CLAUDEX_MAX_PROCESSES");
    std::env::remove_var("CLAUDEX_RATE_LIMIT");

    assert_eq!(config.features.process_protection.max_processes, 9);
    assert_eq!(config.features.process_protection.rate_limit_per_second, 1);
}

#[test]
fn config_dir_prefers_xdg_config_home() {
    std::env::set_var("XDG_CONFIG_HOME", "/tmp/xdg-test-home");
    assert_eq!(config_dir(), Some(PathBuf::from("/tmp/xdg-test-home/claudex")));
    std::env::remove_var("XDG_CONFIG_HOME");
}
