use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Port to listen on
    pub port: u16,
    /// Path to the SQLite database
    pub database_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            port: 3000,
            database_path: data_dir.join("studytrack").join("studytrack.db"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{0}': {1}")]
    Read(PathBuf, std::io::Error),
    #[error("Failed to parse config file '{0}': {1}")]
    Parse(PathBuf, serde_yaml::Error),
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults.
    ///
    /// The config file location itself can be overridden with
    /// `STUDYTRACK_CONFIG`.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let path = config_path
            .or_else(|| std::env::var("STUDYTRACK_CONFIG").map(PathBuf::from).ok())
            .unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents =
                std::fs::read_to_string(&path).map_err(|e| ConfigError::Read(path.clone(), e))?;
            config =
                serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse(path.clone(), e))?;
        }

        if let Some(port) = std::env::var("STUDYTRACK_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
        {
            config.port = port;
        }
        if let Ok(db_path) = std::env::var("STUDYTRACK_DATABASE_PATH") {
            config.database_path = PathBuf::from(db_path);
        }

        Ok(config)
    }

    /// Default config file path: `<config_dir>/studytrack/config.yaml`.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("studytrack")
            .join("config.yaml")
    }
}
