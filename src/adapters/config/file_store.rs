use crate::ports::{AppConfig, ConfigError, ConfigResult, ConfigStore};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigFile {
    data_file: Option<PathBuf>,
    log_level: Option<String>,
    default_color: Option<usize>,
}

pub struct FileConfigStore {
    config_path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> ConfigResult<Self> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            ConfigError::ReadError("Cannot determine config directory".to_string())
        })?;

        Ok(Self::at(config_dir.join("todo-tui").join("config.json")))
    }

    pub fn at(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    async fn ensure_config_dir(&self) -> ConfigResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }
        Ok(())
    }
}

fn parse_level(level: &str) -> ConfigResult<tracing::Level> {
    level
        .trim()
        .parse::<tracing::Level>()
        .map_err(|_| ConfigError::InvalidFormat(format!("unknown log level '{level}'")))
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    async fn exists(&self) -> bool {
        fs::try_exists(&self.config_path).await.unwrap_or(false)
    }

    async fn load_config(&self) -> ConfigResult<AppConfig> {
        let content = match fs::read_to_string(&self.config_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(AppConfig::default());
            }
            Err(e) => return Err(ConfigError::ReadError(e.to_string())),
        };

        let config_file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;

        let defaults = AppConfig::default();
        let log_level = match config_file.log_level.as_deref() {
            Some(level) => parse_level(level)?,
            None => defaults.log_level,
        };

        Ok(AppConfig {
            data_file: config_file.data_file,
            log_level,
            default_color: config_file.default_color.unwrap_or(defaults.default_color),
        })
    }

    async fn save_config(&self, config: &AppConfig) -> ConfigResult<()> {
        self.ensure_config_dir().await?;

        let config_file = ConfigFile {
            data_file: config.data_file.clone(),
            log_level: Some(config.log_level.to_string().to_lowercase()),
            default_color: Some(config.default_color),
        };

        let content = serde_json::to_string_pretty(&config_file)
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        fs::write(&self.config_path, content)
            .await
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }
}
