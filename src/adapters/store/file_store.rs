use crate::ports::{KeyValueStore, StoreError, StoreResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

const APP_DIR: &str = "todo-tui";
const STORE_FILE: &str = "TodoData.json";

/// Key/value store kept as one JSON object on disk.
///
/// The file is read once on open. Every `set` rewrites the whole object via
/// a temporary sibling file and a rename, and the in-memory copy is only
/// updated after the rename succeeds.
pub struct FileKeyValueStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileKeyValueStore {
    pub fn default_path() -> StoreResult<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| StoreError::Read("Cannot determine data directory".to_string()))?;
        Ok(data_dir.join(APP_DIR).join(STORE_FILE))
    }

    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                StoreError::Serialization(format!("{}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(StoreError::Read(format!("{}: {e}", path.display()))),
        };

        tracing::info!("Opened store {} ({} keys)", path.display(), entries.len());

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Opens the store, moving an unparsable file aside to `<name>.corrupt`
    /// and starting empty instead of failing.
    pub async fn open_or_recover(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        match Self::open(&path).await {
            Err(StoreError::Serialization(reason)) => {
                let mut aside = path.clone().into_os_string();
                aside.push(".corrupt");
                let aside = PathBuf::from(aside);
                tracing::warn!(
                    "Store file is unreadable ({}), moving it to {}",
                    reason,
                    aside.display()
                );
                fs::rename(&path, &aside)
                    .await
                    .map_err(|e| StoreError::Write(format!("{}: {e}", aside.display())))?;
                Self::open(path).await
            }
            other => other,
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| STORE_FILE.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn write_entries(&self, entries: &BTreeMap<String, String>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StoreError::Write(e.to_string()))?;
            }
        }

        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let temp = self.temp_path();
        let mut file = fs::File::create(&temp)
            .await
            .map_err(|e| StoreError::Write(format!("{}: {e}", temp.display())))?;
        file.write_all(content.as_bytes())
            .await
            .map_err(|e| StoreError::Write(e.to_string()))?;
        file.sync_all()
            .await
            .map_err(|e| StoreError::Write(e.to_string()))?;
        drop(file);

        fs::rename(&temp, &self.path)
            .await
            .map_err(|e| StoreError::Write(format!("{}: {e}", self.path.display())))?;

        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut entries = self.entries.write().await;
        let mut updated = entries.clone();
        updated.insert(key.to_string(), value.to_string());

        self.write_entries(&updated).await?;
        *entries = updated;

        tracing::debug!("Stored key {} ({} bytes)", key, value.len());
        Ok(())
    }
}
