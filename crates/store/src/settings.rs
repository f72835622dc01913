//! Editor settings management
//!
//! This module provides settings persistence, loading, and updating
//! for the letter editor.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main editor settings container
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EditorSettings {
    /// Spell-check pipeline settings
    #[serde(default)]
    pub spellcheck: SpellcheckSettings,
    /// Defaults for new tables
    #[serde(default)]
    pub tables: TableSettings,
}

/// Spell-check settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpellcheckSettings {
    /// Whether misspellings are flagged at all
    pub enabled: bool,
    /// Quiet period after the last edit before checking, in milliseconds
    pub debounce_ms: u64,
    /// Number of checked texts whose results are kept
    pub cache_capacity: usize,
    /// Dictionary language code (e.g., "en-US", "en-GB")
    pub language: String,
    /// Extra words, one per line
    pub word_list: Option<PathBuf>,
}

impl Default for SpellcheckSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: 1000,
            cache_capacity: 32,
            language: "en-US".to_string(),
            word_list: None,
        }
    }
}

/// Table settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TableSettings {
    pub default_rows: usize,
    pub default_columns: usize,
    /// Whether new tables start with a header row
    pub header_row: bool,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            default_rows: 2,
            default_columns: 2,
            header_row: false,
        }
    }
}

/// Settings manager for loading, saving, and updating editor settings
pub struct SettingsManager {
    /// Path to the settings file
    settings_path: PathBuf,
    /// Current settings (cached)
    current: EditorSettings,
}

impl SettingsManager {
    /// Create a new settings manager with the given data directory
    pub fn new(data_dir: PathBuf) -> Self {
        Self::with_path(data_dir.join("settings.json"))
    }

    /// Create a settings manager for an explicit settings file
    pub fn with_path(settings_path: PathBuf) -> Self {
        Self {
            settings_path,
            current: EditorSettings::default(),
        }
    }

    /// Get the path to the settings file
    pub fn settings_path(&self) -> &PathBuf {
        &self.settings_path
    }

    /// Load settings from disk, or return defaults if file doesn't exist
    pub async fn load(&mut self) -> Result<&EditorSettings> {
        if self.settings_path.exists() {
            let content = tokio::fs::read_to_string(&self.settings_path).await?;
            match serde_json::from_str::<EditorSettings>(&content) {
                Ok(settings) => {
                    self.current = settings;
                }
                Err(e) => {
                    tracing::warn!("Failed to parse settings file, using defaults: {}", e);
                    self.current = EditorSettings::default();
                }
            }
        } else {
            self.current = EditorSettings::default();
        }
        Ok(&self.current)
    }

    /// Save current settings to disk
    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.settings_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(&self.current)?;
        tokio::fs::write(&self.settings_path, content).await?;
        Ok(())
    }

    /// Get current settings
    pub fn get(&self) -> &EditorSettings {
        &self.current
    }

    /// Update settings and save to disk
    pub async fn update(&mut self, settings: EditorSettings) -> Result<()> {
        self.current = settings;
        self.save().await
    }

    /// Reset settings to defaults and save
    pub async fn reset(&mut self) -> Result<&EditorSettings> {
        self.current = EditorSettings::default();
        self.save().await?;
        Ok(&self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = EditorSettings::default();

        assert!(settings.spellcheck.enabled);
        assert_eq!(settings.spellcheck.debounce_ms, 1000);
        assert_eq!(settings.spellcheck.cache_capacity, 32);
        assert_eq!(settings.spellcheck.language, "en-US");
        assert!(settings.spellcheck.word_list.is_none());

        assert_eq!(settings.tables.default_rows, 2);
        assert_eq!(settings.tables.default_columns, 2);
        assert!(!settings.tables.header_row);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let settings: EditorSettings =
            serde_json::from_str(r#"{"spellcheck":{"debounce_ms":250}}"#).unwrap();
        assert_eq!(settings.spellcheck.debounce_ms, 250);
        assert!(settings.spellcheck.enabled);
        assert_eq!(settings.tables, TableSettings::default());
    }

    #[tokio::test]
    async fn test_settings_manager_async() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = SettingsManager::new(temp_dir.path().to_path_buf());

        // Load defaults
        let settings = manager.load().await.unwrap();
        assert_eq!(settings, &EditorSettings::default());

        // Update
        let mut new_settings = EditorSettings::default();
        new_settings.spellcheck.language = "en-GB".to_string();
        new_settings.tables.default_columns = 3;
        manager.update(new_settings).await.unwrap();

        // Verify
        let mut manager2 = SettingsManager::new(temp_dir.path().to_path_buf());
        let loaded = manager2.load().await.unwrap();
        assert_eq!(loaded.spellcheck.language, "en-GB");
        assert_eq!(loaded.tables.default_columns, 3);

        // Reset should restore defaults
        let settings = manager2.reset().await.unwrap();
        assert_eq!(settings.tables.default_columns, 2);
    }

    #[tokio::test]
    async fn test_invalid_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = SettingsManager::new(temp_dir.path().to_path_buf());
        tokio::fs::write(manager.settings_path(), "{ broken").await.unwrap();

        let settings = manager.load().await.unwrap();
        assert_eq!(settings, &EditorSettings::default());
    }
}
