use sr_domain::config::{
    BackendKind, Config, ConfigSeverity, LateReplyPolicy, StoreBackend,
};

#[test]
fn default_llm_settings() {
    let config = Config::default();
    assert_eq!(config.llm.kind, BackendKind::OpenaiCompat);
    assert_eq!(config.llm.model, "gpt-3.5-turbo");
    assert_eq!(config.llm.max_tokens, 300);
    assert!((config.llm.temperature - 0.7).abs() < f32::EPSILON);
    assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
}

#[test]
fn late_replies_are_suppressed_by_default() {
    let config = Config::default();
    assert_eq!(config.llm.late_reply, LateReplyPolicy::Suppress);
    assert_eq!(config.llm.max_retries, 0);
}

#[test]
fn default_context_limit_is_ten() {
    assert_eq!(Config::default().context.limit, 10);
}

#[test]
fn default_store_is_memory() {
    let config = Config::default();
    assert_eq!(config.sessions.backend, StoreBackend::Memory);
    assert_eq!(config.sessions.terminal_append_retries, 2);
}

#[test]
fn default_config_validates_clean() {
    assert!(Config::default().validate().is_empty());
}

#[test]
fn partial_toml_keeps_other_defaults() {
    let toml_str = r#"
[llm]
kind = "canned"
late_reply = "append"

[sessions]
backend = "jsonl"
state_path = "/tmp/serene"
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.llm.kind, BackendKind::Canned);
    assert_eq!(config.llm.late_reply, LateReplyPolicy::Append);
    assert_eq!(config.llm.timeout_ms, 20_000);
    assert_eq!(config.sessions.backend, StoreBackend::Jsonl);
    assert_eq!(config.sessions.state_path.to_str(), Some("/tmp/serene"));
    assert_eq!(config.server.port, 5000);
}

#[test]
fn zero_timeout_is_an_error() {
    let toml_str = r#"
[llm]
timeout_ms = 0
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    let issues = config.validate();
    assert!(issues
        .iter()
        .any(|e| e.field == "llm.timeout_ms" && e.severity == ConfigSeverity::Error));
}

#[test]
fn unversioned_custom_phrase_list_warns() {
    let toml_str = r#"
[safety]
phrases = ["end it all"]
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    let issues = config.validate();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].severity, ConfigSeverity::Warning);
    assert_eq!(issues[0].field, "safety.phrase_list_version");
}

#[test]
fn blank_extra_phrase_is_an_error() {
    let toml_str = r#"
[safety]
extra_phrases = ["  "]
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert!(config
        .validate()
        .iter()
        .any(|e| e.field == "safety.phrases" && e.severity == ConfigSeverity::Error));
}
