// Integration test for configuration file support

use std::fs;
use tempfile::TempDir;
use uptimemon::cli::Cli;
use uptimemon::config::{build_config, FileConfig, Overrides};
use uptimemon::error::UptimemonError;
use clap::Parser;

#[test]
fn test_load_toml_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("uptimemon.toml");

    let toml_content = r#"
        uptime = "1d"
        exclude = "uptimemon"

        [programs]
        program1 = "200s"
        cron = 3600

        [groups]
        thegroup = "1h"
    "#;

    fs::write(&config_path, toml_content).unwrap();

    let file = FileConfig::from_file(&config_path).unwrap();
    let config = build_config(Some(file), Overrides::default()).unwrap();

    assert_eq!(config.registry.program_limit("program1"), Some(200));
    assert_eq!(config.registry.program_limit("cron"), Some(3600));
    assert_eq!(config.registry.group_limit("thegroup"), Some(3600));
    assert_eq!(config.global_limit(), Some(86_400));
    assert_eq!(config.self_name.as_deref(), Some("uptimemon"));
}

#[test]
fn test_load_json_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("uptimemon.json");

    let json_content = r#"
        {
            "programs": { "worker": "10m" },
            "groups": { "batch": 900 }
        }
    "#;

    fs::write(&config_path, json_content).unwrap();

    let file = FileConfig::from_file(&config_path).unwrap();
    let config = build_config(Some(file), Overrides::default()).unwrap();

    assert_eq!(config.registry.program_limit("worker"), Some(600));
    assert_eq!(config.registry.group_limit("batch"), Some(900));
    assert_eq!(config.global_limit(), None);
}

#[test]
fn test_cli_overrides_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("uptimemon.toml");

    fs::write(
        &config_path,
        r#"
        uptime = "1h"
        [programs]
        worker = "10m"
        "#,
    )
    .unwrap();

    let cli = Cli::try_parse_from([
        "uptimemon",
        "--config",
        config_path.to_str().unwrap(),
        "-p",
        "worker=5m",
        "-e",
        "uptimemon",
    ])
    .unwrap();

    let config = cli.watchdog_config().unwrap();
    assert_eq!(config.registry.program_limit("worker"), Some(300));
    assert_eq!(config.global_limit(), Some(3600));
    assert!(config.is_self("uptimemon"));
}

#[test]
fn test_missing_config_file() {
    let cli = Cli::try_parse_from(["uptimemon", "-c", "/nonexistent/uptimemon.toml"]).unwrap();
    assert!(matches!(
        cli.watchdog_config(),
        Err(UptimemonError::ConfigError(_))
    ));
}

#[test]
fn test_invalid_toml_syntax() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("uptimemon.toml");

    fs::write(&config_path, "[programs\nworker = 10").unwrap();

    assert!(matches!(
        FileConfig::from_file(&config_path),
        Err(UptimemonError::InvalidConfig(_))
    ));
}

#[test]
fn test_invalid_duration_in_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("uptimemon.json");

    fs::write(&config_path, r#"{ "groups": { "g": "3w" } }"#).unwrap();

    let file = FileConfig::from_file(&config_path).unwrap();
    assert!(matches!(
        build_config(Some(file), Overrides::default()),
        Err(UptimemonError::InvalidDuration(_))
    ));
}
