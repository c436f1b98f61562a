//! TOML configuration files
//!
//! The config structs themselves live with the binaries that own them; this
//! module only knows where config files are and how to read and write them.

use serde::{Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};

use crate::{CoreError, Result, error::ConfigError};

/// Load configuration from a TOML file
pub async fn load_config<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CoreError::ConfigurationError {
            config_path: path.display().to_string(),
            field: "file".to_string(),
            expected: "readable TOML file".to_string(),
            cause: ConfigError::Io(e.to_string()),
        })?;

    toml::from_str(&content).map_err(|e| CoreError::ConfigurationError {
        config_path: path.display().to_string(),
        field: "content".to_string(),
        expected: "valid TOML configuration".to_string(),
        cause: ConfigError::TomlParse(e.to_string()),
    })
}

/// Save configuration to a TOML file, creating parent directories
pub async fn save_config<T: Serialize>(config: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| CoreError::ConfigurationError {
                config_path: parent.display().to_string(),
                field: "directory".to_string(),
                expected: "writable directory".to_string(),
                cause: ConfigError::Io(e.to_string()),
            })?;
    }

    let content = toml::to_string_pretty(config).map_err(|e| CoreError::ConfigurationError {
        config_path: path.display().to_string(),
        field: "serialization".to_string(),
        expected: "serializable config structure".to_string(),
        cause: ConfigError::TomlSerialize(e.to_string()),
    })?;

    tokio::fs::write(path, content)
        .await
        .map_err(|e| CoreError::ConfigurationError {
            config_path: path.display().to_string(),
            field: "file".to_string(),
            expected: "writable file location".to_string(),
            cause: ConfigError::Io(e.to_string()),
        })
}

/// Standard config file locations, most specific first
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("triage.toml")];

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("patient-triage").join("config.toml"));
    }

    if let Some(home_dir) = dirs::home_dir() {
        paths.push(home_dir.join(".patient-triage").join("config.toml"));
    }

    paths
}

/// Load the first config file found in [`config_paths`], or the defaults
pub async fn load_from_standard_locations<T>() -> Result<(T, Option<PathBuf>)>
where
    T: DeserializeOwned + Default,
{
    for path in config_paths() {
        if path.exists() {
            let config = load_config(&path).await?;
            return Ok((config, Some(path)));
        }
    }
    Ok((T::default(), None))
}

/// Build the error for a value that parsed but is not acceptable
pub fn invalid_value(
    config_path: impl Into<String>,
    field: impl Into<String>,
    expected: impl Into<String>,
    value: impl std::fmt::Display,
) -> CoreError {
    CoreError::ConfigurationError {
        config_path: config_path.into(),
        field: field.into(),
        expected: expected.into(),
        cause: ConfigError::InvalidValue(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct Sample {
        name: String,
        port: u16,
    }

    fn scratch_path(file: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("triage-config-{}", uuid::Uuid::new_v4()))
            .join(file)
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let path = scratch_path("config.toml");
        let sample = Sample {
            name: "triage".to_string(),
            port: 8000,
        };

        save_config(&sample, &path).await.unwrap();
        let loaded: Sample = load_config(&path).await.unwrap();
        assert_eq!(loaded, sample);

        let _ = tokio::fs::remove_dir_all(path.parent().unwrap()).await;
    }

    #[tokio::test]
    async fn test_missing_file_reports_path() {
        let path = scratch_path("missing.toml");
        let err = load_config::<Sample>(&path).await.unwrap_err();
        match err {
            CoreError::ConfigurationError {
                config_path,
                field,
                cause: ConfigError::Io(_),
                ..
            } => {
                assert_eq!(config_path, path.display().to_string());
                assert_eq!(field, "file");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_bad_toml_is_parse_error() {
        let path = scratch_path("bad.toml");
        tokio::fs::create_dir_all(path.parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(&path, "port = \"not a number\"").await.unwrap();

        let err = load_config::<Sample>(&path).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::ConfigurationError {
                cause: ConfigError::TomlParse(_),
                ..
            }
        ));

        let _ = tokio::fs::remove_dir_all(path.parent().unwrap()).await;
    }

    #[test]
    fn test_config_paths_start_with_project_file() {
        let paths = config_paths();
        assert_eq!(paths[0], PathBuf::from("triage.toml"));
    }
}
