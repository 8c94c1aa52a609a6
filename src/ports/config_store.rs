use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    ReadError(String),

    #[error("Failed to write configuration: {0}")]
    WriteError(String),

    #[error("Invalid configuration format: {0}")]
    InvalidFormat(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Store file; `None` means the platform data directory.
    pub data_file: Option<PathBuf>,
    pub log_level: tracing::Level,
    /// Palette index preselected for new tasks.
    pub default_color: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_file: None,
            log_level: tracing::Level::INFO,
            default_color: 0,
        }
    }
}

#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn exists(&self) -> bool;
    async fn load_config(&self) -> ConfigResult<AppConfig>;
    async fn save_config(&self, config: &AppConfig) -> ConfigResult<()>;
}
