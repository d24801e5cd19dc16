//! Tests for loading the configuration from YAML files and the environment

use cms_automation::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_yaml(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write temp file");
    file
}

fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_load_from_yaml_file() {
    let file = write_yaml(
        r#"
frontend_link: "https://www.example.com"
forms_collection: form_definitions
batch_chunk_size: 10
cascade_statuses:
  - archived
  - draft
"#,
    );

    let config = AutomationConfig::from_yaml_file(file.path().to_str().unwrap()).unwrap();

    assert_eq!(config.frontend_link(), Some("https://www.example.com"));
    assert_eq!(config.forms_collection, "form_definitions");
    assert_eq!(config.pages_collection, "pages");
    assert_eq!(config.batch_chunk_size, 10);
    assert!(config.cascade_statuses.contains(&PageStatus::Draft));
    assert!(!config.cascade_statuses.contains(&PageStatus::Published));
}

#[test]
fn test_empty_file_gives_defaults() {
    let file = write_yaml("{}");
    let config = AutomationConfig::from_yaml_file(file.path().to_str().unwrap()).unwrap();

    assert_eq!(config.batch_chunk_size, 30);
    assert_eq!(config.schema, "public");
    assert_eq!(config.bind_address, "0.0.0.0:3000");
    assert_eq!(config.cascade_statuses, vec![PageStatus::Archived]);
    assert!(config.frontend_link().is_none());
}

#[test]
fn test_invalid_chunk_size_is_rejected() {
    let file = write_yaml("batch_chunk_size: 0\n");
    let err = AutomationConfig::from_yaml_file(file.path().to_str().unwrap()).unwrap_err();
    assert!(err.to_string().contains("batch_chunk_size"), "{}", err);
}

#[test]
fn test_missing_file_is_an_error() {
    assert!(AutomationConfig::from_yaml_file("/nonexistent/automation.yaml").is_err());
}

#[test]
fn test_environment_overrides_file() {
    let file = write_yaml("frontend_link: https://from-file.example\n");
    let mut config = AutomationConfig::from_yaml_file(file.path().to_str().unwrap()).unwrap();

    config.merge_env(env(&[
        ("FRONT_END_LINK", "https://from-env.example"),
        ("PAGE_WEB_HOOK_API_KEY", "key"),
        ("BIND_ADDRESS", "127.0.0.1:8080"),
        ("UNRELATED", "ignored"),
    ]));

    assert_eq!(config.frontend_link(), Some("https://from-env.example"));
    assert_eq!(config.webhook_api_key.as_deref(), Some("key"));
    assert_eq!(config.bind_address, "127.0.0.1:8080");
}

#[test]
fn test_blank_environment_values_are_unset() {
    let mut config = AutomationConfig::default();
    config.merge_env(env(&[("FRONT_END_LINK", ""), ("PAGE_WEB_HOOK_API_KEY", "  ")]));

    assert!(config.frontend_link().is_none());
    assert!(config.webhook_api_key.is_none());
}

#[test]
fn test_from_vars_reads_the_named_file() {
    let file = write_yaml("frontend_link: https://from-file.example\nbatch_chunk_size: 5\n");
    let path = file.path().to_str().unwrap();

    let config = AutomationConfig::from_vars(env(&[
        ("CMS_AUTOMATION_CONFIG", path),
        ("PAGE_WEB_HOOK_API_KEY", "key"),
    ]))
    .unwrap();

    assert_eq!(config.frontend_link(), Some("https://from-file.example"));
    assert_eq!(config.batch_chunk_size, 5);
    assert_eq!(config.webhook_api_key.as_deref(), Some("key"));
}

#[test]
fn test_from_vars_without_file_uses_defaults() {
    let config = AutomationConfig::from_vars(env(&[("DATABASE_URL", "postgres://db")])).unwrap();

    assert_eq!(config.batch_chunk_size, 30);
    assert_eq!(config.database_url.as_deref(), Some("postgres://db"));
}

#[test]
fn test_from_vars_with_missing_file_fails() {
    let result = AutomationConfig::from_vars(env(&[(
        "CMS_AUTOMATION_CONFIG",
        "/nonexistent/automation.yaml",
    )]));
    assert!(result.is_err());
}
