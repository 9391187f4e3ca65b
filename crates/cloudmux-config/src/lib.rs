//! Process settings for cloudmux
//!
//! Settings come from a YAML file, then environment variables override
//! individual fields. Lookup order for the file:
//!
//! 1. `CLOUDMUX_CONFIG_PATH`
//! 2. `./cloudmux.yaml`
//! 3. `~/.config/cloudmux/cloudmux.yaml`
//!
//! With no file, defaults apply.

pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const CONFIG_FILE: &str = "cloudmux.yaml";

pub const ENV_CONFIG_PATH: &str = "CLOUDMUX_CONFIG_PATH";
pub const ENV_DATA_DIR: &str = "CLOUDMUX_DATA_DIR";
pub const ENV_DRIVER_LIB_DIR: &str = "CLOUDMUX_DRIVER_LIB_DIR";
pub const ENV_LOG_LEVEL: &str = "CLOUDMUX_LOG_LEVEL";
pub const ENV_STORE: &str = "CLOUDMUX_STORE";

/// cloudmux config directory, created on first use
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("cloudmux");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// Locates the settings file, if any
pub fn find_settings_file() -> Result<Option<PathBuf>> {
    if let Ok(config_path) = std::env::var(ENV_CONFIG_PATH) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(Some(path));
        }
        tracing::warn!("{} points to missing file {}", ENV_CONFIG_PATH, path.display());
    }

    let local = std::env::current_dir()?.join(CONFIG_FILE);
    if local.exists() {
        return Ok(Some(local));
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global = config_dir.join("cloudmux").join(CONFIG_FILE);
        if global.exists() {
            return Ok(Some(global));
        }
    }

    Ok(None)
}

/// Where the control plane keeps its key/value store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Lost when the process exits
    Memory,
    #[default]
    File,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            _ => Err(ConfigError::InvalidValue {
                key: "store".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::File => write!(f, "file"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Store directory; the config dir when unset
    pub data_dir: Option<PathBuf>,
    /// Directory searched for shared-library drivers
    pub driver_lib_dir: Option<PathBuf>,
    pub store: StoreBackend,
    /// `tracing` filter directive used when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: None,
            driver_lib_dir: None,
            store: StoreBackend::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Settings file (if found) with environment overrides applied
    pub fn load() -> Result<Self> {
        let mut settings = match find_settings_file()? {
            Some(path) => {
                tracing::debug!("Loading settings from {}", path.display());
                Self::from_file(&path)?
            }
            None => Self::default(),
        };
        settings.apply_env()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(dir) = env_value(ENV_DATA_DIR) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = env_value(ENV_DRIVER_LIB_DIR) {
            self.driver_lib_dir = Some(PathBuf::from(dir));
        }
        if let Some(level) = env_value(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(store) = env_value(ENV_STORE) {
            self.store = store.parse()?;
        }
        Ok(())
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => get_config_dir(),
        }
    }

    pub fn driver_lib_dir(&self) -> Result<PathBuf> {
        match &self.driver_lib_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(get_config_dir()?.join("drivers")),
        }
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
