use crate::domain::{DomainError, TaskId};
use crate::ports::{ConfigError, StoreError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("{0}")]
    Validation(#[from] DomainError),

    #[error("Task {0} not found")]
    NotFound(TaskId),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Application error: {0}")]
    Application(String),
}

pub type AppResult<T> = Result<T, AppError>;
