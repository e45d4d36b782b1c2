//! Configuration loading and management

use super::schema::Config;
use super::validate::validate_config;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Configuration loader
///
/// Precedence, lowest first: built-in defaults, `config.json`, env aliases,
/// `AGENT_RELAY__SECTION__KEY` path overrides.
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    /// Create a new config loader with the default config directory
    pub fn new() -> Self {
        let config_dir = dirs::home_dir()
            .map(|h| h.join(".agent-relay"))
            .unwrap_or_else(|| PathBuf::from(".agent-relay"));

        Self { config_dir }
    }

    /// Create a new config loader with a custom config directory
    pub fn with_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            config_dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Load configuration from file and environment
    pub fn load(&self) -> crate::Result<Config> {
        let config_path = self.config_path();
        let mut merged = serde_json::to_value(Config::default())?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let file_value: Value = serde_json::from_str(&content)?;
            merge_values(&mut merged, file_value);
        }

        apply_alias_overrides(&mut merged);
        apply_path_overrides(&mut merged);

        let config: Config = serde_json::from_value(merged)?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &Config) -> crate::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        let config_path = self.config_path();
        let content = serde_json::to_string_pretty(config)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Get the config file path
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join("config.json")
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                if let Some(existing) = base_map.get_mut(&key) {
                    merge_values(existing, value);
                } else {
                    base_map.insert(key, value);
                }
            }
        }
        (base_value, overlay_value) => {
            *base_value = overlay_value;
        }
    }
}

/// Env var names copied verbatim into a config path
const ENV_ALIASES: [(&str, &str); 2] = [
    ("OPENAI_API_KEY", "provider.api_key"),
    ("OPENAI_BASE_URL", "provider.api_base"),
];

/// `AGENT_RELAY__DEFAULTS__MODEL` sets `defaults.model`
const ENV_PATH_PREFIX: &str = "AGENT_RELAY__";

/// Interpret an override as JSON when it parses, as a plain string otherwise
fn parse_env_value(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => value,
        Err(_) if raw.eq_ignore_ascii_case("true") => Value::Bool(true),
        Err(_) if raw.eq_ignore_ascii_case("false") => Value::Bool(false),
        Err(_) => Value::String(raw.to_string()),
    }
}

/// Write `value` at `path`, replacing any non-object on the way
fn set_path_value(root: &mut Value, path: &[String], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        *root = value;
        return;
    };

    let mut current = root;
    for segment in parents {
        let Some(map) = ensure_object(current) else {
            return;
        };
        current = map
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    if let Some(map) = ensure_object(current) {
        map.insert(last.clone(), value);
    }
}

fn ensure_object(value: &mut Value) -> Option<&mut Map<String, Value>> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    value.as_object_mut()
}

fn apply_alias_overrides(config: &mut Value) {
    for (env_key, target_path) in ENV_ALIASES {
        if let Ok(value) = std::env::var(env_key) {
            let path: Vec<String> = target_path.split('.').map(ToString::to_string).collect();
            set_path_value(config, &path, Value::String(value));
        }
    }
}

/// Apply `AGENT_RELAY__*` overrides, sorted by name so nested keys land after their parents
fn apply_path_overrides(config: &mut Value) {
    let mut overrides: Vec<(String, String)> = std::env::vars()
        .filter(|(key, _)| key.starts_with(ENV_PATH_PREFIX))
        .collect();
    overrides.sort();

    for (key, raw) in overrides {
        let segments: Vec<String> = key[ENV_PATH_PREFIX.len()..]
            .split("__")
            .filter(|s| !s.is_empty())
            .map(|s| s.to_ascii_lowercase())
            .collect();
        if !segments.is_empty() {
            set_path_value(config, &segments, parse_env_value(&raw));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{AgentConfig, BackendErrorPolicy, TriggerConfig};
    use once_cell::sync::Lazy;
    use std::sync::{Mutex, MutexGuard};
    use tempfile::TempDir;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    struct EnvVarGuard {
        key: String,
        original: Option<String>,
    }

    impl EnvVarGuard {
        fn set(key: &str, value: &str) -> Self {
            let original = std::env::var(key).ok();
            // SAFETY: tests serialize env mutations with ENV_LOCK.
            unsafe { std::env::set_var(key, value) };
            Self {
                key: key.to_string(),
                original,
            }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            if let Some(value) = &self.original {
                // SAFETY: tests serialize env mutations with ENV_LOCK.
                unsafe { std::env::set_var(&self.key, value) };
            } else {
                // SAFETY: tests serialize env mutations with ENV_LOCK.
                unsafe { std::env::remove_var(&self.key) };
            }
        }
    }

    fn lock_env() -> MutexGuard<'static, ()> {
        ENV_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[test]
    fn test_load_default_config() {
        let _lock = lock_env();
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_dir(temp_dir.path());
        let config = loader.load().unwrap();

        assert_eq!(config.defaults.model, "gpt-4o");
        assert_eq!(config.defaults.max_iterations, 10);
        assert_eq!(config.provider.api_base, "https://api.openai.com/v1");
        assert!(config.agents.is_empty());
    }

    #[test]
    fn test_save_and_load_config() {
        let _lock = lock_env();
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_dir(temp_dir.path());

        let mut config = Config::default();
        config.defaults.model = "test-model".to_string();
        config.agents.push(AgentConfig {
            name: "assistant".to_string(),
            instructions: "Be helpful.".to_string(),
            ..Default::default()
        });
        config.triggers.push(TriggerConfig::Timer {
            agent: "assistant".to_string(),
            interval_s: 30.0,
            prompt: None,
        });

        loader.save(&config).unwrap();
        let loaded = loader.load().unwrap();

        assert_eq!(loaded.defaults.model, "test-model");
        assert_eq!(loaded.agents.len(), 1);
        assert_eq!(loaded.agents[0].instructions, "Be helpful.");
        assert_eq!(loaded.triggers, config.triggers);
    }

    #[test]
    fn test_load_applies_alias_env_overrides() {
        let _lock = lock_env();
        let _api_key_guard = EnvVarGuard::set("OPENAI_API_KEY", "sk-openai-from-env");
        let _base_guard = EnvVarGuard::set("OPENAI_BASE_URL", "http://localhost:4000/v1");

        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_dir(temp_dir.path());
        let config = loader.load().unwrap();

        assert_eq!(config.provider.api_key, "sk-openai-from-env");
        assert_eq!(config.provider.api_base, "http://localhost:4000/v1");
    }

    #[test]
    fn test_load_applies_path_env_overrides() {
        let _lock = lock_env();
        let _model_guard = EnvVarGuard::set("AGENT_RELAY__DEFAULTS__MODEL", "gpt-4o-mini");
        let _temp_guard = EnvVarGuard::set("AGENT_RELAY__PROVIDER__TEMPERATURE", "0.9");
        let _iter_guard = EnvVarGuard::set("AGENT_RELAY__DEFAULTS__MAX_ITERATIONS", "42");
        let _policy_guard =
            EnvVarGuard::set("AGENT_RELAY__ORCHESTRATOR__ON_BACKEND_ERROR", "halt");

        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_dir(temp_dir.path());
        let config = loader.load().unwrap();

        assert_eq!(config.defaults.model, "gpt-4o-mini");
        assert!((config.provider.temperature - 0.9).abs() < f32::EPSILON);
        assert_eq!(config.defaults.max_iterations, 42);
        assert_eq!(
            config.orchestrator.on_backend_error,
            BackendErrorPolicy::Halt
        );
    }

    #[test]
    fn test_path_env_overrides_alias_and_file() {
        let _lock = lock_env();
        let _alias_guard = EnvVarGuard::set("OPENAI_API_KEY", "sk-openai-alias");
        let _path_guard =
            EnvVarGuard::set("AGENT_RELAY__PROVIDER__API_KEY", "sk-openai-path-override");

        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_dir(temp_dir.path());

        std::fs::write(
            loader.config_path(),
            r#"{"provider":{"api_key":"sk-openai-file"}}"#,
        )
        .unwrap();

        let config = loader.load().unwrap();
        assert_eq!(config.provider.api_key, "sk-openai-path-override");
    }

    #[test]
    fn test_file_agents_and_triggers() {
        let _lock = lock_env();
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_dir(temp_dir.path());

        std::fs::write(
            loader.config_path(),
            r#"{
  "agents": [
    {"name": "researcher", "instructions": "Research topics.", "tools": ["read_file"]},
    {"name": "writer", "instructions": "Write documents.", "max_iterations": 4}
  ],
  "triggers": [
    {"type": "file_watch", "agent": "writer", "path": "notes.md"}
  ]
}"#,
        )
        .unwrap();

        let config = loader.load().unwrap();
        assert_eq!(config.agents.len(), 2);
        assert_eq!(config.agent("researcher").unwrap().tools, vec!["read_file"]);
        assert_eq!(config.agent("writer").unwrap().max_iterations, Some(4));
        assert_eq!(config.triggers[0].agent(), "writer");
    }

    #[test]
    fn test_validation_rejects_invalid_temperature() {
        let _lock = lock_env();
        let _temp_guard = EnvVarGuard::set("AGENT_RELAY__PROVIDER__TEMPERATURE", "2.5");

        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_dir(temp_dir.path());
        let err = loader.load().unwrap_err();
        assert!(err.to_string().contains("temperature"));
    }

    #[test]
    fn test_parse_env_value() {
        assert_eq!(parse_env_value("true"), Value::Bool(true));
        assert_eq!(parse_env_value("42"), serde_json::json!(42));
        assert_eq!(parse_env_value("halt"), Value::String("halt".to_string()));
        assert_eq!(parse_env_value("[1,2]"), serde_json::json!([1, 2]));
    }
}
