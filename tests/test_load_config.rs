use std::env;
use std::fs::write;
use std::path::PathBuf;
use std::time::Duration;

use leetcode_tracker::load_config::{load_config, AppConfig, TOKEN_ENV};
use serial_test::serial;
use tempfile::NamedTempFile;

fn config_file(yaml: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), yaml).unwrap();
    file
}

#[tokio::test]
#[serial]
async fn full_config_is_read_and_env_token_injected() {
    let file = config_file(
        r#"
repository:
  name: my-solutions
  description: Solved problems
  private: true
github:
  api_base: https://github.example.com/api/v3
  user_agent: tracker-test
oauth:
  client_id: abc123
  redirect_uri: https://example.test/callback
  exchange_url: https://exchange.example.test/exchange-code
storage:
  path: /tmp/tracker/identity.json
status:
  revert_after_secs: 5
http:
  timeout_secs: 10
"#,
    );
    env::set_var(TOKEN_ENV, "  gho_from_env \n");

    let config = load_config(file.path()).expect("Config should load");

    assert_eq!(config.repository.name, "my-solutions");
    assert_eq!(config.repository.description, "Solved problems");
    assert!(config.repository.private);
    assert_eq!(config.github.api_base, "https://github.example.com/api/v3");
    assert_eq!(config.github.user_agent, "tracker-test");
    assert_eq!(config.oauth.client_id.as_deref(), Some("abc123"));
    assert_eq!(
        config.oauth.exchange_url,
        "https://exchange.example.test/exchange-code"
    );
    assert_eq!(
        config.storage_path,
        PathBuf::from("/tmp/tracker/identity.json")
    );
    assert_eq!(config.status_revert, Duration::from_secs(5));
    assert_eq!(config.http_timeout, Duration::from_secs(10));
    assert_eq!(config.env_token.as_deref(), Some("gho_from_env"));
    assert!(!format!("{config:?}").contains("gho_from_env"));

    env::remove_var(TOKEN_ENV);
}

#[tokio::test]
#[serial]
async fn omitted_sections_take_defaults() {
    env::remove_var(TOKEN_ENV);
    let file = config_file("repository:\n  private: true\n");

    let config = load_config(file.path()).unwrap();

    assert_eq!(config.repository.name, "leetcode-tracker");
    assert_eq!(config.repository.description, "📊 Automated LeetCode Tracker");
    assert!(config.repository.private);
    assert_eq!(config.github.api_base, "https://api.github.com");
    assert_eq!(
        config.oauth.exchange_url,
        "http://localhost:4000/exchange-code"
    );
    assert_eq!(config.status_revert, Duration::from_secs(3));
    assert_eq!(config.http_timeout, Duration::from_secs(30));
    assert_eq!(config.env_token, None);
}

#[tokio::test]
#[serial]
async fn empty_file_equals_defaults() {
    env::remove_var(TOKEN_ENV);
    let file = config_file("");
    assert_eq!(load_config(file.path()).unwrap(), AppConfig::from_env());
}

#[tokio::test]
#[serial]
async fn invalid_yaml_reports_parse_error() {
    let file = config_file("not-yaml: [:::");
    let msg = load_config(file.path()).unwrap_err().to_string();
    assert!(
        msg.contains("parse") || msg.contains("YAML"),
        "Parse error expected, got: {msg}"
    );
}

#[tokio::test]
#[serial]
async fn unknown_section_is_rejected() {
    let file = config_file("download:\n  output_dir: ./tmp\n");
    assert!(load_config(file.path()).is_err());
}

#[tokio::test]
#[serial]
async fn missing_file_is_an_error() {
    let err = load_config("/definitely/not/here.yaml").unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}
