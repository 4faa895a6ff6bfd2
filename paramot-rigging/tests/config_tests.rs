//! Configuration resolution and graceful degradation
//!
//! Uses serial_test to keep tests that touch PARAMOT_RIGGING_CONFIG from
//! racing each other.

use paramot_rigging::config::{resolve_config_path, EngineConfig, CONFIG_ENV_VAR};
use paramot_rigging::trim::LoopShortening;
use paramot_rigging::Error;
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;

#[test]
#[serial]
fn test_missing_explicit_file_falls_back_to_defaults() {
    env::remove_var(CONFIG_ENV_VAR);
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.toml");

    let config = EngineConfig::load(Some(&missing)).unwrap();
    assert_eq!(config, EngineConfig::default());
}

#[test]
#[serial]
fn test_explicit_file_is_loaded() {
    env::remove_var(CONFIG_ENV_VAR);
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rigging.toml");
    fs::write(
        &path,
        r#"
[loops]
shortening_mm = [8.0, 12.0, 20.0, 30.0, 40.0]

[logging]
level = "debug"
"#,
    )
    .unwrap();

    let config = EngineConfig::load(Some(&path)).unwrap();
    assert_eq!(config.loop_shortening(), LoopShortening([8.0, 12.0, 20.0, 30.0, 40.0]));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.symmetry.limit_mm, 15.0);
}

#[test]
#[serial]
fn test_env_var_used_when_no_explicit_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("env.toml");
    fs::write(&path, "[symmetry]\nlimit_mm = 10.0\n").unwrap();

    env::set_var(CONFIG_ENV_VAR, &path);
    assert_eq!(resolve_config_path(None), Some(path.clone()));
    let config = EngineConfig::load(None).unwrap();
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(config.symmetry.limit_mm, 10.0);
}

#[test]
#[serial]
fn test_explicit_path_beats_env_var() {
    let dir = TempDir::new().unwrap();
    let from_env = dir.path().join("env.toml");
    let explicit = dir.path().join("explicit.toml");
    fs::write(&from_env, "[symmetry]\nlimit_mm = 10.0\n").unwrap();
    fs::write(&explicit, "[symmetry]\nlimit_mm = 20.0\n").unwrap();

    env::set_var(CONFIG_ENV_VAR, &from_env);
    let config = EngineConfig::load(Some(&explicit)).unwrap();
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(config.symmetry.limit_mm, 20.0);
}

#[test]
#[serial]
fn test_malformed_file_is_an_error() {
    env::remove_var(CONFIG_ENV_VAR);
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[loops\nshortening_mm = ").unwrap();

    assert!(matches!(EngineConfig::load(Some(&path)), Err(Error::Toml(_))));
}

#[test]
#[serial]
fn test_invalid_values_are_config_error() {
    env::remove_var(CONFIG_ENV_VAR);
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("invalid.toml");
    fs::write(&path, "[loops]\nshortening_mm = [45.0, 35.0, 25.0, 15.0, 10.0]\n").unwrap();

    assert!(matches!(EngineConfig::load(Some(&path)), Err(Error::Config(_))));
}
