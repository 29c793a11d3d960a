//! Unit tests for configuration resolution
//!
//! Tests the implementation of:
//! - Priority order: environment over TOML over compiled defaults
//! - Provider selection and credential validation
//! - Missing TOML files do not cause failure
//!
//! Note: Uses serial_test for the tests that touch the process environment.

use cogni_common::config::{
    load_toml_config, locate_config_file, PromptLimits, ProviderKind, ServiceConfig, TomlConfig,
    DEFAULT_GEMINI_MODEL, DEFAULT_OPENAI_MODEL, DEFAULT_PORT, GEMINI_API_BASE,
};
use serial_test::serial;
use std::collections::HashMap;
use std::io::Write;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

#[test]
fn test_defaults_without_any_source() {
    let config = ServiceConfig::resolve(&TomlConfig::default(), env_from(&[])).unwrap();

    assert_eq!(config.provider, ProviderKind::Gemini);
    assert_eq!(config.gemini.model, DEFAULT_GEMINI_MODEL);
    assert_eq!(config.openai.model, DEFAULT_OPENAI_MODEL);
    assert_eq!(config.gemini.base_url, GEMINI_API_BASE);
    assert_eq!(config.server.port, DEFAULT_PORT);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.limits, PromptLimits::default());
    assert_eq!(config.limits.max_source_chars, 30_000);
}

#[test]
fn test_provider_is_case_insensitive() {
    let config =
        ServiceConfig::resolve(&TomlConfig::default(), env_from(&[("AI_PROVIDER", "OpenAI")])).unwrap();
    assert_eq!(config.provider, ProviderKind::OpenAi);
    assert_eq!(config.provider_info(), "OpenAI (gpt-4o-mini)");
}

#[test]
fn test_invalid_provider_rejected() {
    let err = ServiceConfig::resolve(&TomlConfig::default(), env_from(&[("AI_PROVIDER", "claude")]))
        .unwrap_err();
    assert!(err.to_string().contains("Invalid AI_PROVIDER 'claude'"));
}

#[test]
fn test_invalid_port_rejected() {
    let err = ServiceConfig::resolve(&TomlConfig::default(), env_from(&[("AI_SERVICE_PORT", "http")]))
        .unwrap_err();
    assert!(err.to_string().contains("AI_SERVICE_PORT"));
}

#[test]
fn test_environment_overrides_toml() {
    let toml_config: TomlConfig = toml::from_str(
        r#"
        supabase_url = "https://toml.supabase.co"
        supabase_service_key = "toml-key"
        ai_provider = "openai"

        [openai]
        api_key = "sk-toml"
        model = "gpt-4o"

        [server]
        port = 6000

        [limits]
        max_source_chars = 1000
        "#,
    )
    .unwrap();

    let env = env_from(&[
        ("SUPABASE_URL", "https://env.supabase.co"),
        ("OPENAI_MODEL", "gpt-4.1-mini"),
        ("AI_SERVICE_PORT", "7000"),
    ]);
    let config = ServiceConfig::resolve(&toml_config, env).unwrap();

    assert_eq!(config.datastore.url.as_deref(), Some("https://env.supabase.co"));
    assert_eq!(config.datastore.service_key.as_deref(), Some("toml-key"));
    assert_eq!(config.provider, ProviderKind::OpenAi);
    assert_eq!(config.openai.api_key.as_deref(), Some("sk-toml"));
    assert_eq!(config.openai.model, "gpt-4.1-mini");
    assert_eq!(config.server.port, 7000);
    assert_eq!(config.limits.max_source_chars, 1000);
    // Unspecified limits keep their defaults
    assert_eq!(config.limits.min_content_chars, 50);
}

#[test]
fn test_blank_environment_values_are_ignored() {
    let toml_config = TomlConfig {
        supabase_url: Some("https://toml.supabase.co".to_string()),
        ..Default::default()
    };
    let config = ServiceConfig::resolve(&toml_config, env_from(&[("SUPABASE_URL", "  ")])).unwrap();
    assert_eq!(config.datastore.url.as_deref(), Some("https://toml.supabase.co"));
}

#[test]
fn test_validate_requires_datastore_credentials() {
    let config =
        ServiceConfig::resolve(&TomlConfig::default(), env_from(&[("GEMINI_API_KEY", "g-key")])).unwrap();
    let err = config.validate().unwrap_err();
    assert!(err
        .to_string()
        .contains("SUPABASE_URL and SUPABASE_SERVICE_KEY must be set"));
}

#[test]
fn test_validate_requires_selected_provider_key() {
    let env = env_from(&[
        ("SUPABASE_URL", "https://x.supabase.co"),
        ("SUPABASE_SERVICE_KEY", "service"),
        ("AI_PROVIDER", "openai"),
        ("GEMINI_API_KEY", "g-key"),
    ]);
    let config = ServiceConfig::resolve(&TomlConfig::default(), env).unwrap();

    assert!(config.validate_datastore().is_ok());
    let err = config.validate().unwrap_err();
    assert!(err
        .to_string()
        .contains("OPENAI_API_KEY must be set when using OpenAI"));
}

#[test]
fn test_validate_accepts_complete_gemini_config() {
    let env = env_from(&[
        ("SUPABASE_URL", "https://x.supabase.co"),
        ("SUPABASE_SERVICE_KEY", "service"),
        ("GEMINI_API_KEY", "g-key"),
    ]);
    let config = ServiceConfig::resolve(&TomlConfig::default(), env).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.provider_info(), "Google Gemini (gemini-1.5-flash)");
}

#[test]
fn test_load_toml_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
        ai_provider = "gemini"
        [gemini]
        model = "gemini-1.5-pro"
        [logging]
        level = "debug"
        "#
    )
    .unwrap();

    let toml_config = load_toml_config(file.path()).unwrap();
    assert_eq!(toml_config.gemini.model.as_deref(), Some("gemini-1.5-pro"));
    assert_eq!(toml_config.logging.level, "debug");
}

#[test]
fn test_load_toml_config_reports_parse_errors() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "this is = = not toml").unwrap();

    let err = load_toml_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("Parse TOML failed"));
}

#[test]
fn test_missing_explicit_config_file_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");

    let located = locate_config_file(Some(&missing), &env_from(&[]));
    assert!(located.is_none());
}

#[test]
fn test_config_path_from_environment() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let path = file.path().to_string_lossy().to_string();

    let located = locate_config_file(None, &env_from(&[("COGNI_CONFIG", path.as_str())]));
    assert_eq!(located.as_deref(), Some(file.path()));
}

#[test]
#[serial]
fn test_load_reads_process_environment() {
    std::env::set_var("AI_PROVIDER", "openai");
    std::env::set_var("OPENAI_MODEL", "gpt-4o");
    std::env::set_var("COGNI_CONFIG", "/nonexistent/cogni-ai.toml");

    let config = ServiceConfig::load(None).unwrap();

    std::env::remove_var("AI_PROVIDER");
    std::env::remove_var("OPENAI_MODEL");
    std::env::remove_var("COGNI_CONFIG");

    assert_eq!(config.provider, ProviderKind::OpenAi);
    assert_eq!(config.openai.model, "gpt-4o");
}
