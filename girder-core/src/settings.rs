// Configuration lookup and HTTP layer settings

use crate::emitter::DEFAULT_CHUNK_SIZE;
use crate::error_transform::ErrorFormat;
use crate::routing::DEFAULT_PREFLIGHT_MAX_AGE;
use crate::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;

/// Read-only key/value configuration, keys in dotted form (`http.error_format`).
///
/// `girder-config`'s `ConfigManager` implements this; tests can use a plain
/// `HashMap<String, Value>`.
pub trait Configuration: Send + Sync {
    fn get_value(&self, key: &str) -> Option<Value>;

    /// String value; numbers and booleans are rendered as text.
    fn get_str(&self, key: &str) -> Option<String> {
        match self.get_value(key)? {
            Value::String(s) => Some(s),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Boolean value; accepts JSON booleans and `true/false/1/0/yes/no/on/off`.
    fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.get_value(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(b)),
            Some(Value::Number(n)) if n.as_u64() == Some(0) => Ok(Some(false)),
            Some(Value::Number(n)) if n.as_u64() == Some(1) => Ok(Some(true)),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(Some(true)),
                "false" | "0" | "no" | "off" => Ok(Some(false)),
                _ => Err(invalid(key, "a boolean", &s)),
            },
            Some(other) => Err(invalid(key, "a boolean", &other.to_string())),
        }
    }

    /// Unsigned integer value; numeric strings are accepted.
    fn get_u64(&self, key: &str) -> Result<Option<u64>> {
        match self.get_value(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_u64()
                .map(Some)
                .ok_or_else(|| invalid(key, "an unsigned integer", &n.to_string())),
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| invalid(key, "an unsigned integer", &s)),
            Some(other) => Err(invalid(key, "an unsigned integer", &other.to_string())),
        }
    }
}

fn invalid(key: &str, expected: &str, got: &str) -> Error {
    Error::Configuration(format!("'{}' must be {}, got '{}'", key, expected, got))
}

impl Configuration for HashMap<String, Value> {
    fn get_value(&self, key: &str) -> Option<Value> {
        self.get(key).cloned()
    }
}

pub mod keys {
    pub const ERROR_FORMAT: &str = "http.error_format";
    pub const CORS_ON_METHOD_NOT_ALLOWED: &str = "http.cors_on_method_not_allowed";
    pub const STREAM_CHUNK_SIZE: &str = "http.stream_chunk_size";
    pub const PREFLIGHT_MAX_AGE: &str = "http.preflight_max_age";
}

/// Settings of the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    pub error_format: ErrorFormat,
    pub cors_on_method_not_allowed: bool,
    pub stream_chunk_size: usize,
    pub preflight_max_age: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            error_format: ErrorFormat::default(),
            cors_on_method_not_allowed: false,
            stream_chunk_size: DEFAULT_CHUNK_SIZE,
            preflight_max_age: DEFAULT_PREFLIGHT_MAX_AGE,
        }
    }
}

impl HttpSettings {
    /// Read settings; missing keys keep their defaults.
    pub fn from_configuration(config: &dyn Configuration) -> Result<Self> {
        let defaults = Self::default();

        let error_format = match config.get_str(keys::ERROR_FORMAT) {
            Some(value) => value.parse()?,
            None => defaults.error_format,
        };

        let stream_chunk_size = match config.get_u64(keys::STREAM_CHUNK_SIZE)? {
            Some(0) => {
                return Err(Error::Configuration(format!(
                    "'{}' must be greater than zero",
                    keys::STREAM_CHUNK_SIZE
                )));
            }
            Some(size) => usize::try_from(size).map_err(|_| {
                invalid(keys::STREAM_CHUNK_SIZE, "a platform-sized integer", &size.to_string())
            })?,
            None => defaults.stream_chunk_size,
        };

        Ok(Self {
            error_format,
            cors_on_method_not_allowed: config
                .get_bool(keys::CORS_ON_METHOD_NOT_ALLOWED)?
                .unwrap_or(defaults.cors_on_method_not_allowed),
            stream_chunk_size,
            preflight_max_age: config
                .get_u64(keys::PREFLIGHT_MAX_AGE)?
                .unwrap_or(defaults.preflight_max_age),
        })
    }
}
