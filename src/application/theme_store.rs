use super::AppResult;
use crate::domain::Theme;
use crate::ports::{KeyValueStore, StoreError};
use std::sync::Arc;

/// Store key holding the dark-theme flag.
pub const THEME_KEY: &str = "isDarkTheme";

/// Persists the light/dark preference next to the task list.
pub struct ThemeStore {
    store: Arc<dyn KeyValueStore>,
}

impl ThemeStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Stored flag, or `false` (light) when unset or unreadable.
    pub async fn load_theme_flag(&self) -> bool {
        match self.store.get(THEME_KEY).await {
            Ok(Some(raw)) => serde_json::from_str::<bool>(raw.trim()).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable theme flag {:?}: {}", raw, e);
                false
            }),
            Ok(None) => false,
            Err(e) => {
                tracing::warn!("Failed to read theme flag: {}", e);
                false
            }
        }
    }

    pub async fn save_theme_flag(&self, is_dark: bool) -> AppResult<()> {
        let value = serde_json::to_string(&is_dark)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.store.set(THEME_KEY, &value).await?;
        tracing::info!("Saved theme flag dark={}", is_dark);
        Ok(())
    }

    pub async fn load_theme(&self) -> Theme {
        Theme::from_flag(self.load_theme_flag().await)
    }

    pub async fn save_theme(&self, theme: Theme) -> AppResult<()> {
        self.save_theme_flag(theme.is_dark()).await
    }
}
