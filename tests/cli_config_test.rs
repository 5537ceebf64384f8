//! Integration tests for configuration resolution via CLI.
//!
//! Precedence is CLI flag > environment variable > config.kdl > default, and
//! `bv config show` reports where each value came from.

mod common;

use common::{TestEnv, stdout_json};
use predicates::prelude::*;

#[test]
fn test_config_show_defaults_and_env() {
    let env = TestEnv::new();

    let json = stdout_json(env.bv().args(["config", "show"]));
    assert_eq!(json["archive_dir"]["source"], "env:BV_ARCHIVE_DIR");
    assert_eq!(json["max_archives"]["value"], 10);
    assert_eq!(json["max_archives"]["source"], "default");
    assert_eq!(json["cache_ttl"]["value"], 3600);
    assert_eq!(json["auto_unpack"]["value"], true);
}

#[test]
fn test_config_file_values() {
    let env = TestEnv::new();
    env.write_config("max-archives 4\ncache-enabled #false\nwatch #true\n");

    let json = stdout_json(env.bv().args(["config", "show"]));
    assert_eq!(json["max_archives"]["value"], 4);
    assert!(
        json["max_archives"]["source"]
            .as_str()
            .unwrap()
            .starts_with("config:")
    );
    assert_eq!(json["cache_enabled"]["value"], false);
    assert_eq!(json["watch"]["value"], true);
}

#[test]
fn test_env_overrides_config_file() {
    let env = TestEnv::new();
    env.write_config("max-archives 4\n");

    let json = stdout_json(
        env.bv()
            .env("BV_MAX_ARCHIVES", "6")
            .args(["config", "show"]),
    );
    assert_eq!(json["max_archives"]["value"], 6);
    assert_eq!(json["max_archives"]["source"], "env:BV_MAX_ARCHIVES");
}

#[test]
fn test_cli_flag_overrides_env() {
    let env = TestEnv::new();
    let flag_dir = env.config_dir.path().join("from-flag");

    let json = stdout_json(
        env.bv()
            .args(["config", "show", "--archive-dir"])
            .arg(&flag_dir),
    );
    assert_eq!(json["archive_dir"]["source"], "cli");
    assert_eq!(json["archive_dir"]["value"], flag_dir.to_str().unwrap());
}

#[test]
fn test_invalid_env_number_is_ignored() {
    let env = TestEnv::new();

    let json = stdout_json(
        env.bv()
            .env("BV_CACHE_TTL", "an hour")
            .args(["config", "show"]),
    );
    assert_eq!(json["cache_ttl"]["value"], 3600);
    assert_eq!(json["cache_ttl"]["source"], "default");
}

#[test]
fn test_invalid_config_file_fails() {
    let env = TestEnv::new();
    env.write_config("archive-dir \"unterminated");

    env.bv()
        .args(["config", "show", "-H"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse KDL"));
}

#[test]
fn test_missing_explicit_config_fails() {
    let env = TestEnv::new();
    let missing = env.config_dir.path().join("missing.kdl");

    env.bv()
        .arg("--config")
        .arg(&missing)
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"error\""));
}

#[test]
fn test_config_show_human() {
    let env = TestEnv::new();

    env.bv()
        .args(["config", "show", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("max-archives   = 10 [default]"));
}
