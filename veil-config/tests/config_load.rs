use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;
use veil_common::{StealthLevel, WaitUntil};
use veil_config::VeilConfigLoader;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

#[test]
#[serial]
fn test_config_load() {
    let tmp = TempDir::new().unwrap();

    let file_yaml = r#"
version: "0.1"
fetcher:
  headless: true
  stealth: maximum
  webdriver_url: "http://localhost:4444"
  timeout_secs: 20
  wait: networkidle
  headers:
    Accept: "application/xml, text/xml, */*"
  block_phrases: ["access denied", "blocked", "pardon our interruption"]
  root_tags: ["ownershipDocument"]
  "#;
    let p = write_yaml(&tmp, "veil.yaml", file_yaml);

    let config = VeilConfigLoader::new()
        .with_file(p)
        .load()
        .expect("load fetcher config");

    assert_eq!(config.version.as_deref(), Some("0.1"));
    assert_eq!(config.fetcher.stealth, StealthLevel::Maximum);
    assert_eq!(config.fetcher.wait, WaitUntil::NetworkIdle);
    assert_eq!(config.fetcher.timeout_secs, 20);
    assert_eq!(config.fetcher.block_phrases.len(), 3);
    assert_eq!(
        config.fetcher.headers.get("Accept").map(String::as_str),
        Some("application/xml, text/xml, */*")
    );
}

#[test]
#[serial]
fn test_env_placeholders_expand_inside_values() {
    let tmp = TempDir::new().unwrap();

    let file_yaml = r#"
fetcher:
  webdriver_url: "${VEIL_TEST_DRIVER_URL}"
  "#;
    let p = write_yaml(&tmp, "veil.yaml", file_yaml);

    temp_env::with_var("VEIL_TEST_DRIVER_URL", Some("http://10.0.0.2:9515"), || {
        let config = VeilConfigLoader::new()
            .with_file(&p)
            .load()
            .expect("load fetcher config");
        assert_eq!(config.fetcher.webdriver_url, "http://10.0.0.2:9515");
    });
}

#[test]
#[serial]
fn test_missing_sections_fall_back_to_defaults() {
    let config = VeilConfigLoader::new()
        .with_yaml_str("version: 'test'")
        .load()
        .expect("load defaults");

    assert!(config.fetcher.headless);
    assert_eq!(config.fetcher.webdriver_url, "http://localhost:9515");
    assert_eq!(config.fetcher.wait, WaitUntil::DomContentLoaded);
}
