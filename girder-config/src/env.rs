// Environment variable loading

use crate::{ConfigError, Result};
use std::collections::HashMap;
use std::env;

/// Turn an environment-style name into a dotted configuration key:
/// lower-cased, with `__` separating levels (`HTTP__ERROR_FORMAT` becomes
/// `http.error_format`).
pub fn normalize_key(name: &str) -> String {
    name.trim().to_lowercase().replace("__", ".")
}

/// Environment variable loader
///
/// With a prefix, only variables named `<PREFIX>_...` are read and the
/// prefix is stripped.
#[derive(Debug, Clone, Default)]
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Load the process environment.
    pub fn load(&self) -> Result<HashMap<String, String>> {
        Ok(self.collect(env::vars()))
    }

    /// Normalize and filter `vars` as [`load`](Self::load) does.
    pub fn collect(&self, vars: impl IntoIterator<Item = (String, String)>) -> HashMap<String, String> {
        vars.into_iter()
            .filter_map(|(name, value)| self.key_for(&name).map(|key| (key, value)))
            .collect()
    }

    /// The configuration key for variable `name`, if it belongs to this
    /// loader.
    pub fn key_for(&self, name: &str) -> Option<String> {
        let name = match &self.prefix {
            Some(prefix) => name.strip_prefix(prefix.as_str())?.strip_prefix('_')?,
            None => name,
        };
        if name.is_empty() {
            None
        } else {
            Some(normalize_key(name))
        }
    }

    /// Load a specific environment variable
    pub fn load_var(&self, key: &str) -> Result<String> {
        let full_key = match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, key.to_uppercase()),
            None => key.to_uppercase(),
        };

        env::var(&full_key).map_err(ConfigError::EnvError)
    }

    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_nested_keys() {
        let loader = EnvLoader::default();
        let loaded = loader.collect(vars(&[("HTTP__ERROR_FORMAT", "text"), ("PORT", "8080")]));

        assert_eq!(loaded.get("http.error_format").map(String::as_str), Some("text"));
        assert_eq!(loaded.get("port").map(String::as_str), Some("8080"));
    }

    #[test]
    fn test_prefix_filters_and_strips() {
        let loader = EnvLoader::new(Some("GIRDER".to_string()));
        let loaded = loader.collect(vars(&[
            ("GIRDER_LOG__LEVEL", "debug"),
            ("GIRDERX_LOG__LEVEL", "trace"),
            ("GIRDER_", "empty"),
            ("PATH", "/usr/bin"),
        ]));

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.get("log.level").map(String::as_str), Some("debug"));
    }

    #[test]
    fn test_missing_var_uses_default() {
        let loader = EnvLoader::new(Some("GIRDER_TEST".to_string()));
        assert!(loader.load_var("MISSING_VAR_67890").is_err());
        assert_eq!(loader.load_var_or("MISSING_VAR_67890", "fallback"), "fallback");
    }
}
