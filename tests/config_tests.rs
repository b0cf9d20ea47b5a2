//! Tests for configuration loading.

use std::io::Write;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use turnkit::config::RuntimeConfig;
use turnkit::error::TurnkitError;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const CONFIG_ENV_VARS: [&str; 4] = [
    "AGENT_TURN_TIMEOUT_MS",
    "TURNKIT_MODEL",
    "OPENAI_API_KEY",
    "OPENAI_BASE_URL",
];

struct EnvGuard {
    saved: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    fn capture(keys: &[&str]) -> Self {
        let saved = keys
            .iter()
            .map(|key| ((*key).to_string(), std::env::var(key).ok()))
            .collect();
        Self { saved }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.saved {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
    }
}

fn env_lock_guard() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn clean_env() -> (std::sync::MutexGuard<'static, ()>, EnvGuard) {
    let lock = env_lock_guard();
    let guard = EnvGuard::capture(&CONFIG_ENV_VARS);
    for key in CONFIG_ENV_VARS {
        std::env::remove_var(key);
    }
    (lock, guard)
}

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn from_env_reads_overrides() {
    let _env = clean_env();
    std::env::set_var("AGENT_TURN_TIMEOUT_MS", "5000");
    std::env::set_var("TURNKIT_MODEL", "gpt-5-mini");
    std::env::set_var("OPENAI_API_KEY", "sk-env");
    std::env::set_var("OPENAI_BASE_URL", "http://localhost:9999/v1/");

    let config = RuntimeConfig::from_env();

    assert_eq!(config.turn_timeout(), Duration::from_millis(5000));
    assert_eq!(config.default_model, "gpt-5-mini");
    assert_eq!(config.require_openai_api_key().unwrap(), "sk-env");
    assert_eq!(config.openai_base_url, "http://localhost:9999/v1");
}

#[test]
fn invalid_timeout_env_is_ignored() {
    let _env = clean_env();
    for raw in ["soon", "0", "-5"] {
        std::env::set_var("AGENT_TURN_TIMEOUT_MS", raw);
        let config = RuntimeConfig::from_env();
        assert_eq!(config.turn_timeout_ms, 120_000, "value {raw:?}");
    }
}

#[test]
fn blank_api_key_is_still_missing() {
    let _env = clean_env();
    std::env::set_var("OPENAI_API_KEY", "   ");
    let config = RuntimeConfig::from_env();
    assert!(matches!(
        config.require_openai_api_key(),
        Err(TurnkitError::Configuration(_))
    ));
}

#[test]
fn load_from_file_keeps_defaults_for_missing_keys() {
    let _env = clean_env();
    let file = write_config(
        r#"
turn_timeout_ms = 30000
default_model = "gpt-4o-mini"
max_tool_iterations = 4
"#,
    );

    let config = RuntimeConfig::load_from(file.path()).unwrap();

    assert_eq!(config.turn_timeout_ms, 30_000);
    assert_eq!(config.default_model, "gpt-4o-mini");
    assert_eq!(config.max_tool_iterations, 4);
    assert_eq!(config.backlog_capacity, 1000);
    assert_eq!(config.log_capacity, 1000);
    assert_eq!(config.openai_base_url, "https://api.openai.com/v1");
}

#[test]
fn environment_wins_over_file() {
    let _env = clean_env();
    let file = write_config("turn_timeout_ms = 30000\n");
    std::env::set_var("AGENT_TURN_TIMEOUT_MS", "750");

    let config = RuntimeConfig::load_from(file.path()).unwrap();
    assert_eq!(config.turn_timeout_ms, 750);
}

#[test]
fn malformed_file_is_a_config_file_error() {
    let file = write_config("turn_timeout_ms = \"soon\"\n");
    let err = RuntimeConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, TurnkitError::ConfigFile(_)), "{err:?}");
}

#[test]
fn zero_capacities_are_rejected() {
    let file = write_config("backlog_capacity = 0\n");
    let err = RuntimeConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, TurnkitError::Configuration(_)));

    let file = write_config("turn_timeout_ms = 0\n");
    let err = RuntimeConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, TurnkitError::Configuration(ref m) if m.contains("turn_timeout_ms")));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = RuntimeConfig::load_from(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, TurnkitError::Io(_)));
}

#[test]
fn api_key_is_never_serialized() {
    let config = RuntimeConfig::builder().openai_api_key("sk-secret").build();
    let toml = toml::to_string(&config).unwrap();
    assert!(!toml.contains("sk-secret"));
    assert!(!format!("{config:?}").contains("sk-secret"));
}
