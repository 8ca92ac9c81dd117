use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Quality levels accepted by the catalog vendor
pub const VALID_QUALITIES: [u8; 9] = [0, 4, 8, 9, 10, 11, 12, 13, 14];
pub const DEFAULT_QUALITY: u8 = 9;

const CONFIG_VERSION: &str = "2.0.0";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub quality: u8,
    pub last_download_dir: PathBuf,
    pub version: String,

    #[serde(skip)]
    config_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            last_download_dir: default_download_dir(),
            version: CONFIG_VERSION.to_string(),
            config_path: PathBuf::new(),
        }
    }
}

fn default_download_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join("Music").join("Downloads"))
        .unwrap_or_else(|| PathBuf::from("./downloads"))
}

impl AppConfig {
    pub fn load() -> Self {
        Self::load_from(Self::default_path())
    }

    /// Loads the config document, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load_from(path: PathBuf) -> Self {
        let mut config = if path.exists() {
            match std::fs::read_to_string(&path)
                .map_err(crate::errors::AppError::from)
                .and_then(|content| Ok(serde_json::from_str::<AppConfig>(&content)?))
            {
                Ok(config) => config,
                Err(e) => {
                    warn!("Failed to load config, using defaults: {}", e);
                    AppConfig::default()
                }
            }
        } else {
            AppConfig::default()
        };
        config.config_path = path;
        config
    }

    pub fn save(&self) -> Result<()> {
        if let Some(config_dir) = self.config_path.parent() {
            if !config_dir.exists() {
                std::fs::create_dir_all(config_dir)?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&self.config_path, content)?;
        Ok(())
    }

    fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tunegrab")
            .join("config.json")
    }

    /// Returns the configured quality, correcting an out-of-ladder stored
    /// value back to the default.
    pub fn quality(&mut self) -> u8 {
        if !VALID_QUALITIES.contains(&self.quality) {
            self.quality = DEFAULT_QUALITY;
            if let Err(e) = self.save() {
                warn!("Failed to persist corrected quality: {}", e);
            }
        }
        self.quality
    }

    pub fn set_quality(&mut self, quality: u8) -> Result<()> {
        self.quality = quality;
        self.save()
    }

    pub fn set_last_download_dir(&mut self, dir: impl AsRef<Path>) -> Result<()> {
        self.last_download_dir = dir.as_ref().to_path_buf();
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(dir.path().join("config.json"));
        assert_eq!(config.quality, DEFAULT_QUALITY);
        assert_eq!(config.version, CONFIG_VERSION);
    }

    #[test]
    fn test_defaults_when_file_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        let config = AppConfig::load_from(path);
        assert_eq!(config.quality, DEFAULT_QUALITY);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = AppConfig::load_from(path.clone());
        config.set_quality(14).unwrap();
        config.set_last_download_dir(dir.path().join("music")).unwrap();

        let mut reloaded = AppConfig::load_from(path);
        assert_eq!(reloaded.quality(), 14);
        assert_eq!(reloaded.last_download_dir, dir.path().join("music"));
    }

    #[test]
    fn test_invalid_quality_corrected_on_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = AppConfig::load_from(path.clone());
        config.set_quality(7).unwrap();
        assert_eq!(config.quality(), DEFAULT_QUALITY);

        // The correction is persisted
        let mut reloaded = AppConfig::load_from(path);
        assert_eq!(reloaded.quality(), DEFAULT_QUALITY);
    }
}
