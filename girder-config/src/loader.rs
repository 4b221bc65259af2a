// Configuration file loaders

use crate::env::normalize_key;
use crate::{ConfigError, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
    /// `KEY=value` lines, as in `.env` files
    Env,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            "env" => Some(FileFormat::Env),
            _ => None,
        }
    }

    /// Format of `path`, from its extension. `.env` itself counts as
    /// [`FileFormat::Env`].
    pub fn from_path(path: &Path) -> Option<Self> {
        if path.file_name().and_then(|name| name.to_str()) == Some(".env") {
            return Some(FileFormat::Env);
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// Reads one configuration file into dotted keys.
#[derive(Debug, Clone, Copy)]
pub struct ConfigLoader {
    format: FileFormat,
}

impl ConfigLoader {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }

    /// Loader for `path`'s format.
    pub fn auto(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        FileFormat::from_path(path).map(Self::new).ok_or_else(|| {
            ConfigError::LoadError(format!("Unsupported configuration file: {}", path.display()))
        })
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    /// Load `path` as flattened, dotted keys.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<BTreeMap<String, Value>> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::LoadError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Ok(flatten(self.parse(&content)?))
    }

    /// Parse `content` into a JSON document.
    pub fn parse(&self, content: &str) -> Result<Value> {
        match self.format {
            FileFormat::Json => serde_json::from_str(content)
                .map_err(|e| ConfigError::ParseError(format!("JSON parse error: {}", e))),
            FileFormat::Toml => {
                let document: toml::Value = toml::from_str(content)
                    .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;
                serde_json::to_value(document)
                    .map_err(|e| ConfigError::SerializationError(e.to_string()))
            }
            FileFormat::Env => parse_env(content),
        }
    }
}

fn parse_env(content: &str) -> Result<Value> {
    let mut map = Map::new();
    for entry in dotenvy::from_read_iter(content.as_bytes()) {
        let (name, value) =
            entry.map_err(|e| ConfigError::ParseError(format!("env parse error: {}", e)))?;
        map.insert(normalize_key(&name), Value::String(value));
    }
    Ok(Value::Object(map))
}

/// Flatten nested objects into dotted keys. Arrays and scalars are leaves.
pub fn flatten(value: Value) -> BTreeMap<String, Value> {
    let mut out = BTreeMap::new();
    match value {
        Value::Object(map) => flatten_into(&mut out, None, map),
        Value::Null => {}
        other => {
            out.insert(String::new(), other);
        }
    }
    out
}

fn flatten_into(out: &mut BTreeMap<String, Value>, prefix: Option<&str>, map: Map<String, Value>) {
    for (key, value) in map {
        let key = match prefix {
            Some(prefix) => format!("{}.{}", prefix, key),
            None => key,
        };
        match value {
            Value::Object(nested) => flatten_into(out, Some(&key), nested),
            leaf => {
                out.insert(key, leaf);
            }
        }
    }
}

/// Rebuild a nested object from dotted `entries` under `section`.
pub fn unflatten<'a>(section: &str, entries: impl IntoIterator<Item = (&'a String, &'a Value)>) -> Option<Value> {
    let prefix = format!("{}.", section);
    let mut root = Map::new();
    let mut found = false;

    for (key, value) in entries {
        let Some(rest) = key.strip_prefix(&prefix) else {
            continue;
        };
        found = true;

        let mut node = &mut root;
        let mut segments = rest.split('.').peekable();
        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                node.insert(segment.to_string(), value.clone());
                break;
            }
            let child = node
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            let Value::Object(child) = child else {
                break;
            };
            node = child;
        }
    }

    found.then_some(Value::Object(root))
}
