// ConfigService - layered configuration for an application

use crate::{ConfigManager, FileFormat, Result};
use girder_core::logging::LogConfig;
use girder_core::{Configuration, HttpSettings};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::PathBuf;

/// High-level configuration service
#[derive(Clone, Debug, Default)]
pub struct ConfigService {
    manager: ConfigManager,
}

impl ConfigService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_manager(manager: ConfigManager) -> Self {
        Self { manager }
    }

    pub fn builder() -> ConfigServiceBuilder {
        ConfigServiceBuilder::new()
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.manager.get(key)
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.manager.get_or(key, default)
    }

    pub fn has(&self, key: &str) -> bool {
        self.manager.has(key)
    }

    /// `http.*` settings of the request pipeline.
    pub fn http_settings(&self) -> girder_core::Result<HttpSettings> {
        HttpSettings::from_configuration(&self.manager)
    }

    /// `log.*` settings.
    pub fn log_config(&self) -> girder_core::Result<LogConfig> {
        LogConfig::from_configuration(&self.manager)
    }

    pub fn manager(&self) -> &ConfigManager {
        &self.manager
    }
}

impl Configuration for ConfigService {
    fn get_value(&self, key: &str) -> Option<Value> {
        self.manager.get_value(key)
    }
}

enum Source {
    Defaults(Vec<(String, Value)>),
    File(PathBuf, Option<FileFormat>),
    Dotenv(Option<PathBuf>),
    Env,
}

/// Builder for [`ConfigService`].
///
/// Sources are applied lowest precedence first: defaults, then files in
/// the order added, then `.env`, then the process environment.
#[derive(Default)]
pub struct ConfigServiceBuilder {
    prefix: Option<String>,
    defaults: Vec<(String, Value)>,
    files: Vec<(PathBuf, Option<FileFormat>)>,
    dotenv: Option<Option<PathBuf>>,
    env: bool,
    errors: Vec<crate::ConfigError>,
}

impl ConfigServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only read environment variables named `<PREFIX>_...`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn default_value<T: Serialize>(mut self, key: impl Into<String>, value: T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => self.defaults.push((key.into(), value)),
            Err(e) => self
                .errors
                .push(crate::ConfigError::SerializationError(e.to_string())),
        }
        self
    }

    pub fn load_env(mut self) -> Self {
        self.env = true;
        self
    }

    /// Read a `.env` file; `None` looks for `.env` in the working directory.
    pub fn load_dotenv(mut self, path: Option<PathBuf>) -> Self {
        self.dotenv = Some(path);
        self
    }

    pub fn add_file(mut self, path: impl Into<PathBuf>, format: FileFormat) -> Self {
        self.files.push((path.into(), Some(format)));
        self
    }

    /// Add a file whose format follows from its extension.
    pub fn add_file_auto(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push((path.into(), None));
        self
    }

    fn sources(self) -> (Option<String>, Vec<Source>) {
        let mut sources = vec![Source::Defaults(self.defaults)];
        sources.extend(
            self.files
                .into_iter()
                .map(|(path, format)| Source::File(path, format)),
        );
        if let Some(path) = self.dotenv {
            sources.push(Source::Dotenv(path));
        }
        if self.env {
            sources.push(Source::Env);
        }
        (self.prefix, sources)
    }

    pub fn build(mut self) -> Result<ConfigService> {
        if !self.errors.is_empty() {
            return Err(self.errors.remove(0));
        }

        let (prefix, sources) = self.sources();
        let manager = match prefix {
            Some(prefix) => ConfigManager::with_prefix(prefix),
            None => ConfigManager::new(),
        };

        for source in sources {
            match source {
                Source::Defaults(defaults) => {
                    for (key, value) in defaults {
                        manager.set(&key, value)?;
                    }
                }
                Source::File(path, Some(format)) => manager.load_file(&path, format)?,
                Source::File(path, None) => manager.load_file_auto(&path)?,
                Source::Dotenv(path) => manager.load_dotenv(path.as_deref())?,
                Source::Env => manager.load_env()?,
            }
        }

        Ok(ConfigService::from_manager(manager))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_files_override_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[http]\nerror_format = \"negotiate\"").unwrap();

        let service = ConfigService::builder()
            .default_value("http.error_format", "text")
            .default_value("http.stream_chunk_size", 1024)
            .add_file_auto(file.path())
            .build()
            .unwrap();

        let settings = service.http_settings().unwrap();
        assert_eq!(settings.error_format, girder_core::ErrorFormat::Negotiate);
        assert_eq!(settings.stream_chunk_size, 1024);
    }

    #[test]
    fn test_explicit_dotenv_must_exist() {
        let result = ConfigService::builder()
            .load_dotenv(Some(PathBuf::from("/definitely/not/here/.env")))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_log_config_from_service() {
        let service = ConfigService::builder()
            .default_value("log", serde_json::json!({"level": "warn", "format": "pretty"}))
            .build()
            .unwrap();

        let log = service.log_config().unwrap();
        assert_eq!(log.level, girder_core::logging::LogLevel::Warn);
        assert_eq!(log.format, girder_core::logging::LogFormat::Pretty);
    }
}
