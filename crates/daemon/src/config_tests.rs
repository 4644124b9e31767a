// SPDX-License-Identifier: MIT

use super::*;
use serial_test::serial;
use std::io::Write;

const ENV_KEYS: &[&str] = &[
    "SCRIPTMESH_BUS_URL",
    "SCRIPTMESH_SCRIPTS_DIR",
    "SCRIPTMESH_HOST_ID",
    "SCRIPTMESH_LOG_LEVEL",
    "SCRIPTMESH_CONFIG",
];

fn clear_env() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
}

fn argv(args: &[&str]) -> Vec<String> {
    std::iter::once("smd".to_string()).chain(args.iter().map(|s| s.to_string())).collect()
}

#[test]
#[serial]
fn defaults_fill_in_when_nothing_else_is_configured() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(argv(&["--scripts-dir", dir.path().to_str().unwrap()])).unwrap();
    assert_eq!(config.bus_url, "nats://127.0.0.1:4222");
    assert_eq!(config.host_id, "auto");
    assert_eq!(config.log_level, "info");
    clear_env();
}

#[test]
#[serial]
fn cli_flag_takes_precedence_over_env_and_file() {
    clear_env();
    std::env::set_var("SCRIPTMESH_BUS_URL", "nats://from-env:4222");
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(argv(&[
        "--scripts-dir",
        dir.path().to_str().unwrap(),
        "--bus-url",
        "nats://from-cli:4222",
    ]))
    .unwrap();
    assert_eq!(config.bus_url, "nats://from-cli:4222");
    clear_env();
}

#[test]
#[serial]
fn env_var_is_used_when_no_cli_flag_is_given() {
    clear_env();
    std::env::set_var("SCRIPTMESH_HOST_ID", "node-7");
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(argv(&["--scripts-dir", dir.path().to_str().unwrap()])).unwrap();
    assert_eq!(config.host_id, "node-7");
    clear_env();
}

#[test]
#[serial]
fn file_value_is_used_when_no_cli_flag_or_env_var_is_given() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let scripts_dir = dir.path().join("scripts");
    std::fs::create_dir_all(&scripts_dir).unwrap();
    let config_path = dir.path().join("config.toml");
    let mut f = std::fs::File::create(&config_path).unwrap();
    writeln!(f, "log_level = \"debug\"").unwrap();
    writeln!(f, "scripts_dir = \"{}\"", scripts_dir.to_str().unwrap()).unwrap();

    let config = Config::load(argv(&["--config", config_path.to_str().unwrap()])).unwrap();
    assert_eq!(config.log_level, "debug");
    assert_eq!(config.scripts_dir, scripts_dir);
    clear_env();
}

#[test]
#[serial]
fn a_default_config_path_that_does_not_exist_is_silently_skipped() {
    clear_env();
    std::env::set_var("SCRIPTMESH_CONFIG", "/nonexistent/scriptmesh-config-that-should-not-exist.toml");
    std::env::remove_var("SCRIPTMESH_CONFIG");
    let dir = tempfile::tempdir().unwrap();
    let result = Config::load(argv(&["--scripts-dir", dir.path().to_str().unwrap()]));
    assert!(result.is_ok());
    clear_env();
}

#[test]
#[serial]
fn an_explicitly_configured_path_that_does_not_exist_is_fatal() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.toml");
    let result = Config::load(argv(&[
        "--scripts-dir",
        dir.path().to_str().unwrap(),
        "--config",
        missing.to_str().unwrap(),
    ]));
    assert!(matches!(result, Err(ConfigError::FileUnreadable { .. })));
    clear_env();
}

#[test]
#[serial]
fn an_unparsable_config_file_is_fatal() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    std::fs::write(&config_path, "not valid toml {{{").unwrap();
    let result = Config::load(argv(&[
        "--scripts-dir",
        dir.path().to_str().unwrap(),
        "--config",
        config_path.to_str().unwrap(),
    ]));
    assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    clear_env();
}

#[test]
#[serial]
fn a_missing_scripts_directory_is_fatal() {
    clear_env();
    let result = Config::load(argv(&["--scripts-dir", "/nonexistent/scriptmesh-scripts-dir"]));
    assert!(matches!(result, Err(ConfigError::ScriptsDirMissing { .. })));
    clear_env();
}
