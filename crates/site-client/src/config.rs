use serde::Deserialize;
use site_core::EntityId;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub default_project: Option<EntityId>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            request_timeout: DEFAULT_TIMEOUT,
            default_project: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    api_url: Option<String>,
    request_timeout_secs: Option<u64>,
    project_id: Option<EntityId>,
}

/// Values taken from command-line flags; they win over every other layer.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub project: Option<EntityId>,
}

impl ClientConfig {
    /// Defaults, then the config file, then `SITE_*` variables, then flags.
    pub fn load(overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(path) = config_path() {
            config.apply_file(&path)?;
        }
        config.apply_env(|key| std::env::var(key).ok())?;
        config.apply_overrides(overrides);
        Ok(config)
    }

    /// A missing file leaves the config untouched.
    pub fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        if !path.exists() {
            return Ok(());
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFile = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(url) = file.api_url.filter(|url| !url.trim().is_empty()) {
            self.base_url = url;
        }
        if let Some(secs) = file.request_timeout_secs {
            self.request_timeout = timeout_from_secs("request_timeout_secs", secs)?;
        }
        if file.project_id.is_some() {
            self.default_project = file.project_id;
        }
        Ok(())
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = read("SITE_API_URL") {
            self.base_url = url.trim().to_string();
        }
        if let Some(raw) = read("SITE_REQUEST_TIMEOUT_SECS") {
            let secs = raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: "SITE_REQUEST_TIMEOUT_SECS",
                    value: raw.clone(),
                })?;
            self.request_timeout = timeout_from_secs("SITE_REQUEST_TIMEOUT_SECS", secs)?;
        }
        if let Some(raw) = read("SITE_PROJECT_ID") {
            let id = raw.parse::<EntityId>().map_err(|_| ConfigError::InvalidValue {
                key: "SITE_PROJECT_ID",
                value: raw.clone(),
            })?;
            self.default_project = Some(id);
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(url) = &overrides.api_url {
            self.base_url = url.clone();
        }
        if let Some(secs) = overrides.timeout_secs.filter(|secs| *secs > 0) {
            self.request_timeout = Duration::from_secs(secs);
        }
        if overrides.project.is_some() {
            self.default_project = overrides.project;
        }
    }
}

fn timeout_from_secs(key: &'static str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::InvalidValue {
            key,
            value: secs.to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

pub fn config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("SITE_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    dirs::config_dir().map(|dir| dir.join("site-ops").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn layers_apply_in_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "api_url = \"http://file:5000\"\nrequest_timeout_secs = 30\nproject_id = 3\n",
        )
        .expect("write config");

        let mut config = ClientConfig::default();
        config.apply_file(&path).expect("file layer");
        assert_eq!(config.base_url, "http://file:5000");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.default_project, Some(EntityId::new(3)));

        config
            .apply_env(env(&[("SITE_API_URL", "http://env:5000"), ("SITE_PROJECT_ID", "9")]))
            .expect("env layer");
        assert_eq!(config.base_url, "http://env:5000");
        assert_eq!(config.default_project, Some(EntityId::new(9)));

        config.apply_overrides(&ConfigOverrides {
            api_url: Some("http://flag:5000".to_string()),
            timeout_secs: Some(5),
            project: None,
        });
        assert_eq!(config.base_url, "http://flag:5000");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.default_project, Some(EntityId::new(9)));
    }

    #[test]
    fn missing_file_keeps_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = ClientConfig::default();
        config
            .apply_file(&dir.path().join("absent.toml"))
            .expect("missing file is fine");
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn malformed_file_and_bad_env_are_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "api_url = [").expect("write config");
        let mut config = ClientConfig::default();
        assert!(matches!(
            config.apply_file(&path),
            Err(ConfigError::Parse { .. })
        ));

        let err = config
            .apply_env(env(&[("SITE_REQUEST_TIMEOUT_SECS", "soon")]))
            .expect_err("non-numeric timeout");
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "SITE_REQUEST_TIMEOUT_SECS",
                ..
            }
        ));
        assert!(config
            .apply_env(env(&[("SITE_REQUEST_TIMEOUT_SECS", "0")]))
            .is_err());
    }
}
