use config::ConfigError;
use moderation::ModerationConfig;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use storage::DbOptions;

const ENV_PREFIX: &str = "COMMOD_";
pub const DEFAULT_API_KEY: &str = "change_me_please";

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub security: SecuritySettings,
    #[serde(default)]
    pub moderation: ModerationConfig,
}

#[derive(Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: String,
}

#[derive(Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub busy_timeout_ms: u64,
}

impl DatabaseSettings {
    pub fn options(&self) -> DbOptions {
        DbOptions {
            max_connections: self.max_connections,
            acquire_timeout: Duration::from_secs(self.acquire_timeout_secs),
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
        }
    }
}

#[derive(Deserialize, Clone)]
pub struct SecuritySettings {
    /// Expected value of the `x-api-key` header on every `/api` route.
    pub api_key: String,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());
        Self::load(&run_mode, collect_env_vars(std::env::vars()))
    }

    fn load(run_mode: &str, env_map: HashMap<String, Value>) -> Result<Self, ConfigError> {
        let env_json = serde_json::to_string(&env_map)
            .map_err(|e| ConfigError::Message(format!("Failed to encode environment: {}", e)))?;

        let s = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("server.cors_origins", "*")?
            .set_default("database.url", "sqlite://data/moderation.db")?
            .set_default("database.max_connections", 5)?
            .set_default("database.acquire_timeout_secs", 5)?
            .set_default("database.busy_timeout_ms", 5000)?
            .set_default("security.api_key", DEFAULT_API_KEY)?
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::File::with_name(&format!("config.{}", run_mode)).required(false))
            .add_source(config::File::from_str(&env_json, config::FileFormat::Json))
            .build()?;

        s.try_deserialize()
    }
}

/// `COMMOD_DATABASE__URL=...` becomes `database.url`. Word lists are given
/// comma separated, e.g. `COMMOD_MODERATION__BANNED_WORDS=scam,spam`.
fn collect_env_vars(vars: impl Iterator<Item = (String, String)>) -> HashMap<String, Value> {
    vars.filter(|(k, _)| k.starts_with(ENV_PREFIX))
        .map(|(k, v)| {
            let new_key = k
                .trim_start_matches(ENV_PREFIX)
                .replace("__", ".")
                .to_lowercase();
            let value = if new_key.ends_with("_words") {
                Value::Array(
                    v.split(',')
                        .map(str::trim)
                        .filter(|w| !w.is_empty())
                        .map(|w| Value::String(w.to_string()))
                        .collect(),
                )
            } else {
                Value::String(v)
            };
            (new_key, value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn env_keys_map_to_nested_paths() {
        let vars = vec![
            ("COMMOD_DATABASE__URL".to_string(), "sqlite::memory:".to_string()),
            ("COMMOD_SERVER__PORT".to_string(), "8080".to_string()),
            ("PATH".to_string(), "/usr/bin".to_string()),
        ];
        let map = collect_env_vars(vars.into_iter());
        assert_eq!(map.len(), 2);
        assert_eq!(map["database.url"], "sqlite::memory:");
        assert_eq!(map["server.port"], "8080");
    }

    #[test]
    fn word_lists_split_on_commas() {
        let vars = vec![(
            "COMMOD_MODERATION__BANNED_WORDS".to_string(),
            "scam, buy followers,,".to_string(),
        )];
        let settings = Settings::load("test-without-files", collect_env_vars(vars.into_iter())).unwrap();
        assert_eq!(
            settings.moderation.banned_words,
            vec!["scam".to_string(), "buy followers".to_string()]
        );
    }

    #[test]
    fn defaults_apply_without_sources() {
        let settings = Settings::load("test-without-files", HashMap::new()).unwrap();
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.server.cors_origins, "*");
        assert_eq!(settings.security.api_key, DEFAULT_API_KEY);
        assert_eq!(settings.database.options().max_connections, 5);
        assert_eq!(settings.database.options().busy_timeout, Duration::from_secs(5));
        assert!(settings.moderation.banned_words.is_empty());
        assert_eq!(settings.moderation.op_timeout_ms, 5_000);
    }

    #[test]
    fn environment_overrides_defaults() {
        let mut env = HashMap::new();
        env.insert("server.host".to_string(), Value::from("127.0.0.1"));
        env.insert("security.api_key".to_string(), Value::from("s3cret"));
        let settings = Settings::load("test-without-files", env).unwrap();
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.security.api_key, "s3cret");
    }
}
