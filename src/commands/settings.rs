use crate::api::{ApiConfig, DEFAULT_BASE_URL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const API_URL_ENV: &str = "HEALTH_HARBOR_API_URL";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub api_base_url: String,
    pub request_timeout_secs: Option<u64>,
    pub email: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: None,
            email: None,
        }
    }
}

impl Settings {
    pub fn api_config(&self) -> ApiConfig {
        let mut config = ApiConfig::new(self.api_base_url.as_str());
        config.request_timeout = self.request_timeout_secs.map(Duration::from_secs);
        config
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("reading {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parsing {}: {}", .path.display(), .source)]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Config files searched from lowest to highest priority.
fn search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("health-harbor/config.toml"));
    }
    paths.push(PathBuf::from("health-harbor.toml"));
    paths
}

/// Load settings from the standard locations, then `explicit`, then the
/// environment. Later layers win.
pub fn load(explicit: Option<&Path>) -> Result<Settings, SettingsError> {
    let env_url = std::env::var(API_URL_ENV).ok();
    load_from(&search_paths(), explicit, env_url.as_deref())
}

fn load_from(
    paths: &[PathBuf],
    explicit: Option<&Path>,
    env_url: Option<&str>,
) -> Result<Settings, SettingsError> {
    let mut merged = toml::Table::new();
    let mut last_layer = PathBuf::new();

    for path in paths.iter().filter(|p| p.is_file()) {
        debug!(path = %path.display(), "loading settings layer");
        merged.extend(read_layer(path)?);
        last_layer = path.clone();
    }
    if let Some(path) = explicit {
        debug!(path = %path.display(), "loading explicit settings");
        merged.extend(read_layer(path)?);
        last_layer = path.to_path_buf();
    }

    let mut settings = toml::Value::Table(merged)
        .try_into::<Settings>()
        .map_err(|source| SettingsError::Toml {
            path: last_layer,
            source,
        })?;

    if let Some(url) = env_url.filter(|u| !u.trim().is_empty()) {
        settings.api_base_url = url.trim().to_string();
    }
    Ok(settings)
}

/// Read one file and check it on its own, so a bad value is reported against
/// the file it came from.
fn read_layer(path: &Path) -> Result<toml::Table, SettingsError> {
    let toml_error = |source: toml::de::Error| SettingsError::Toml {
        path: path.to_path_buf(),
        source,
    };
    let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let table: toml::Table = toml::from_str(&text).map_err(toml_error)?;
    toml::Value::Table(table.clone())
        .try_into::<Settings>()
        .map_err(toml_error)?;
    Ok(table)
}
