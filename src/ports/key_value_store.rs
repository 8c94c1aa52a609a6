use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Failed to read store: {0}")]
    Read(String),

    #[error("Failed to write store: {0}")]
    Write(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable string-valued key/value storage private to this application.
///
/// A successful `set` must survive a restart; a later `get` on the same key
/// returns the value written. Callers issue one operation at a time.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;
}
