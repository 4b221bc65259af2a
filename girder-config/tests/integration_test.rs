//! Integration tests for girder-config

use girder_config::*;
use girder_core::{Configuration, ErrorFormat, HttpSettings};
use std::env;
use std::io::Write;

#[test]
fn test_prefixed_environment_overrides_files() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(
        file,
        r#"{{"http": {{"error_format": "json", "preflight_max_age": 600}}}}"#
    )
    .unwrap();

    unsafe {
        env::set_var("GIRDER_IT1_HTTP__ERROR_FORMAT", "text");
    }

    let service = ConfigService::builder()
        .with_prefix("GIRDER_IT1")
        .add_file(file.path(), FileFormat::Json)
        .load_env()
        .build()
        .unwrap();

    unsafe {
        env::remove_var("GIRDER_IT1_HTTP__ERROR_FORMAT");
    }

    let settings = service.http_settings().unwrap();
    assert_eq!(settings.error_format, ErrorFormat::Text);
    assert_eq!(settings.preflight_max_age, 600);
}

#[test]
fn test_dotenv_file_is_read_without_touching_environment() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "GIRDER_IT2_HTTP__CORS_ON_METHOD_NOT_ALLOWED=yes").unwrap();
    writeln!(file, "GIRDER_IT2_HTTP__STREAM_CHUNK_SIZE=\"512\"").unwrap();

    let manager = ConfigManager::with_prefix("GIRDER_IT2");
    manager.load_dotenv(Some(file.path())).unwrap();

    assert!(env::var("GIRDER_IT2_HTTP__STREAM_CHUNK_SIZE").is_err());
    let settings = HttpSettings::from_configuration(&manager).unwrap();
    assert!(settings.cors_on_method_not_allowed);
    assert_eq!(settings.stream_chunk_size, 512);
}

#[test]
fn test_invalid_setting_is_a_configuration_error() {
    let manager = ConfigManager::new();
    manager.set("http.stream_chunk_size", 0).unwrap();

    let error = HttpSettings::from_configuration(&manager).unwrap_err();
    assert!(matches!(error, girder_core::Error::Configuration(_)));
}

#[test]
fn test_unsupported_file_is_rejected() {
    let manager = ConfigManager::new();
    let result = manager.load_file_auto("settings.ini");
    assert!(matches!(result, Err(ConfigError::LoadError(_))));

    let core: girder_core::Error = result.unwrap_err().into();
    assert!(matches!(core, girder_core::Error::Configuration(_)));
}

#[test]
fn test_manager_clones_share_values() {
    let manager = ConfigManager::new();
    let view = manager.clone();
    manager.set("feature.enabled", true).unwrap();

    assert_eq!(view.get_value("feature.enabled"), Some(serde_json::json!(true)));
    assert_eq!(view.get_str("feature.enabled").as_deref(), Some("true"));
}

#[test]
fn test_config_error_display() {
    let err = ConfigError::ParseError("bad key".to_string());
    assert!(err.to_string().contains("bad key"));
}
