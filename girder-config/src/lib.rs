// Configuration management for the Girder framework

pub mod config_service;
pub mod env;
pub mod error;
pub mod loader;

pub use config_service::{ConfigService, ConfigServiceBuilder};
pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};

use girder_core::Configuration;
use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Thread-safe store of configuration values under dotted keys.
///
/// Sources are applied in the order they are loaded; a later source
/// overwrites keys set by an earlier one. Nested documents are flattened,
/// so `{"http": {"error_format": "text"}}` is read back as
/// `http.error_format`. Clones share the same store.
#[derive(Clone, Default)]
pub struct ConfigManager {
    config: Arc<RwLock<HashMap<String, Value>>>,
    env_prefix: Option<String>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Manager that reads only `<PREFIX>_...` environment variables.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            config: Arc::default(),
            env_prefix: Some(prefix.into()),
        }
    }

    /// Load configuration from environment variables
    pub fn load_env(&self) -> Result<()> {
        let loader = EnvLoader::new(self.env_prefix.clone());
        let vars = loader.load()?;
        debug!(count = vars.len(), "Loaded environment configuration");
        self.insert_strings(vars);
        Ok(())
    }

    /// Load a `.env` file without touching the process environment.
    ///
    /// With no path, `.env` is looked up from the working directory and a
    /// missing file is not an error.
    pub fn load_dotenv(&self, path: Option<&Path>) -> Result<()> {
        let entries = match path {
            Some(path) => dotenvy::from_path_iter(path),
            None => dotenvy::dotenv_iter(),
        };
        let entries = match entries {
            Ok(entries) => entries,
            Err(e) if path.is_none() && e.not_found() => return Ok(()),
            Err(e) => return Err(ConfigError::LoadError(e.to_string())),
        };

        let loader = EnvLoader::new(self.env_prefix.clone());
        let mut vars = HashMap::new();
        for entry in entries {
            let (name, value) = entry.map_err(|e| ConfigError::ParseError(e.to_string()))?;
            if let Some(key) = loader.key_for(&name) {
                vars.insert(key, value);
            }
        }
        self.insert_strings(vars);
        Ok(())
    }

    /// Load configuration from file
    pub fn load_file(&self, path: impl AsRef<Path>, format: FileFormat) -> Result<()> {
        let entries = ConfigLoader::new(format).load_file(path.as_ref())?;
        debug!(path = %path.as_ref().display(), keys = entries.len(), "Loaded configuration file");
        self.config.write().extend(entries);
        Ok(())
    }

    /// Load a file whose format follows from its extension.
    pub fn load_file_auto(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.load_file(path, ConfigLoader::auto(path)?.format())
    }

    fn insert_strings(&self, vars: HashMap<String, String>) {
        let mut config = self.config.write();
        for (key, value) in vars {
            config.insert(key, Value::String(value));
        }
    }

    /// Set a value. Objects are flattened under `key`.
    pub fn set<T: Serialize>(&self, key: &str, value: T) -> Result<()> {
        let value = serde_json::to_value(value)
            .map_err(|e| ConfigError::SerializationError(e.to_string()))?;

        let mut config = self.config.write();
        match value {
            Value::Object(_) => {
                for (nested, leaf) in loader::flatten(value) {
                    config.insert(format!("{}.{}", key, nested), leaf);
                }
            }
            leaf => {
                config.insert(key.to_string(), leaf);
            }
        }
        Ok(())
    }

    /// Get a value. A key that names a section (`db` for `db.url`,
    /// `db.pool.size`) deserializes the whole section.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .value(key)
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;

        serde_json::from_value(value.clone())
            .or_else(|_| serde_json::from_value(coerce(value)))
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })
    }

    /// Get a configuration value with default
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    pub fn get_string(&self, key: &str) -> Result<String> {
        self.get(key)
    }

    pub fn get_int(&self, key: &str) -> Result<i64> {
        self.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.get(key)
    }

    pub fn get_float(&self, key: &str) -> Result<f64> {
        self.get(key)
    }

    /// Whether `key` holds a value or names a section.
    pub fn has(&self, key: &str) -> bool {
        self.value(key).is_some()
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.config.write().remove(key)
    }

    /// Every key, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.config.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Copy every value of `other` into this manager, overwriting.
    pub fn merge(&self, other: &ConfigManager) {
        if Arc::ptr_eq(&self.config, &other.config) {
            return;
        }
        let entries: Vec<(String, Value)> = other
            .config
            .read()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        self.config.write().extend(entries);
    }

    fn value(&self, key: &str) -> Option<Value> {
        let config = self.config.read();
        config
            .get(key)
            .cloned()
            .or_else(|| loader::unflatten(key, config.iter()))
    }
}

/// Strings from the environment stand in for any scalar: `"8080"` reads as
/// a number and `"true"` as a boolean when the target type asks for one.
fn coerce(value: Value) -> Value {
    match value {
        Value::String(s) => match serde_json::from_str::<Value>(&s) {
            Ok(parsed @ (Value::Number(_) | Value::Bool(_))) => parsed,
            _ => Value::String(s),
        },
        Value::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, coerce(v))).collect()),
        other => other,
    }
}

impl Configuration for ConfigManager {
    fn get_value(&self, key: &str) -> Option<Value> {
        self.config.read().get(key).cloned()
    }
}

impl std::fmt::Debug for ConfigManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigManager")
            .field("keys", &self.config.read().len())
            .field("env_prefix", &self.env_prefix)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_set_and_get() {
        let manager = ConfigManager::new();
        manager.set("app.name", "orders").unwrap();

        let value: String = manager.get("app.name").unwrap();
        assert_eq!(value, "orders");
        assert!(matches!(manager.get::<String>("app.missing"), Err(ConfigError::KeyNotFound(_))));
    }

    #[test]
    fn test_get_or_default() {
        let manager = ConfigManager::new();
        assert_eq!(manager.get_or("missing", 8192usize), 8192);
    }

    #[test]
    fn test_strings_coerce_to_scalars() {
        let manager = ConfigManager::new();
        manager.set("port", "8080").unwrap();
        manager.set("debug", "true").unwrap();
        manager.set("name", "0x1").unwrap();

        assert_eq!(manager.get_int("port").unwrap(), 8080);
        assert!(manager.get_bool("debug").unwrap());
        assert_eq!(manager.get_string("port").unwrap(), "8080");
        assert!(matches!(manager.get_int("name"), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_objects_are_flattened_and_sections_read_back() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Pool {
            size: u32,
            timeout_ms: u64,
        }

        let manager = ConfigManager::new();
        manager
            .set("db.pool", serde_json::json!({"size": 4, "timeout_ms": 250}))
            .unwrap();

        assert_eq!(manager.get_int("db.pool.size").unwrap(), 4);
        assert!(manager.has("db"));
        assert_eq!(
            manager.get::<Pool>("db.pool").unwrap(),
            Pool {
                size: 4,
                timeout_ms: 250
            }
        );
    }

    #[test]
    fn test_merge_overwrites() {
        let base = ConfigManager::new();
        base.set("a", 1).unwrap();
        base.set("b", 1).unwrap();

        let overrides = ConfigManager::new();
        overrides.set("b", 2).unwrap();

        base.merge(&overrides);
        base.merge(&base.clone());
        assert_eq!(base.get_int("a").unwrap(), 1);
        assert_eq!(base.get_int("b").unwrap(), 2);
        assert_eq!(base.keys(), vec!["a", "b"]);
    }

    #[test]
    fn test_is_a_core_configuration() {
        let manager = ConfigManager::new();
        manager.set("http.stream_chunk_size", "2048").unwrap();
        manager.set("http.error_format", "text").unwrap();

        let settings = girder_core::HttpSettings::from_configuration(&manager).unwrap();
        assert_eq!(settings.stream_chunk_size, 2048);
        assert_eq!(settings.error_format, girder_core::ErrorFormat::Text);
    }
}
