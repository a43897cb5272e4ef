use clap::{CommandFactory, FromArgMatches, Parser};
use microdrop::config::AppConfig;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[derive(Parser, Debug)]
struct TestCli {
    #[command(flatten)]
    config: AppConfig,
}

fn parse(args: &[&str]) -> (AppConfig, clap::ArgMatches) {
    let matches = TestCli::command().get_matches_from(args);
    let cli = TestCli::from_arg_matches(&matches).unwrap();
    (cli.config, matches)
}

#[test]
fn test_defaults() {
    let config = AppConfig::default();
    assert_eq!(config.device_directory, PathBuf::from("devices"));
    assert_eq!(config.overlay_opacity, 30);
    assert_eq!(config.widget_size(), (640, 480));
    assert!(config.validate().is_ok());

    // Clap defaults agree with Default.
    let (parsed, _) = parse(&["test"]);
    assert_eq!(parsed.overlay_opacity, config.overlay_opacity);
    assert_eq!(parsed.widget_size(), config.widget_size());
}

#[test]
fn test_device_paths() {
    let config = AppConfig {
        device_directory: PathBuf::from("/data/devices"),
        ..Default::default()
    };
    assert_eq!(config.device_path("chip"), PathBuf::from("/data/devices/chip"));
    assert_eq!(
        config.log_directory("chip"),
        PathBuf::from("/data/devices/chip/logs")
    );
}

#[test]
fn test_partial_file_falls_back_to_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{ "overlay_opacity": 75 }"#).unwrap();

    let config = AppConfig::load_from_file(&path).unwrap();
    assert_eq!(config.overlay_opacity, 75);
    assert_eq!(config.widget_width, 640);
}

#[test]
fn test_out_of_range_opacity_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");

    for bad in [r#"{ "overlay_opacity": 0 }"#, r#"{ "overlay_opacity": 101 }"#] {
        fs::write(&path, bad).unwrap();
        assert!(AppConfig::load_from_file(&path).is_err(), "{} accepted", bad);
    }
}

#[test]
fn test_missing_file_is_config_error() {
    let dir = tempdir().unwrap();
    let err = AppConfig::load_from_file(dir.path().join("absent.json")).unwrap_err();
    assert!(err.to_string().contains("absent.json"));
}

#[test]
fn test_command_line_overrides_file() {
    let mut from_file = AppConfig {
        overlay_opacity: 80,
        widget_width: 1024,
        ..Default::default()
    };
    let (cli, matches) = parse(&["test", "--widget-width", "320"]);
    from_file.merge_from_cli(&cli, &matches);

    assert_eq!(from_file.widget_width, 320);
    // Not typed: the file value survives the clap default.
    assert_eq!(from_file.overlay_opacity, 80);
}
