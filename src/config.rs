//! Application configuration management.

use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::Result;
use serde::{Deserialize, Serialize};

use crate::client::api::DEFAULT_ENDPOINT;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Library configuration
    #[serde(default)]
    pub library: LibraryConfig,

    /// Metadata lookup configuration
    #[serde(default)]
    pub lookup: LookupConfig,

    /// Player configuration
    #[serde(default)]
    pub player: PlayerConfig,

    /// UI configuration
    #[serde(default)]
    pub ui: UiConfig,
}

/// Library file and scanning configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Library JSON file (defaults to the platform data directory)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// File extensions picked up by a directory scan
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Descend into subdirectories when scanning
    #[serde(default = "default_true")]
    pub recursive: bool,
}

/// Metadata lookup configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Search endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Look up metadata when a track is selected, not only when played
    #[serde(default = "default_true")]
    pub on_select: bool,
}

/// Player configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Volume level (0-100)
    #[serde(default = "default_volume")]
    pub volume: u8,

    /// Seek step in seconds
    #[serde(default = "default_seek_step")]
    pub seek_step: u32,
}

/// UI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Show cover art (requires sixel/kitty support)
    #[serde(default = "default_true")]
    pub show_album_art: bool,

    /// Seconds between slideshow images
    #[serde(default = "default_slideshow_secs")]
    pub slideshow_secs: u64,
}

fn default_extensions() -> Vec<String> {
    ["mp3", "flac", "ogg", "wav", "m4a"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_endpoint() -> String {
    String::from(DEFAULT_ENDPOINT)
}

fn default_volume() -> u8 {
    80
}

fn default_seek_step() -> u32 {
    10
}

fn default_slideshow_secs() -> u64 {
    3
}

fn default_true() -> bool {
    true
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            path: None,
            extensions: default_extensions(),
            recursive: true,
        }
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            on_select: true,
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            volume: default_volume(),
            seek_step: default_seek_step(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            show_album_art: true,
            slideshow_secs: default_slideshow_secs(),
        }
    }
}

impl Config {
    /// Get the default configuration file path.
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| color_eyre::eyre::eyre!("Could not determine config directory"))?;

        Ok(config_dir.join("trackshelf").join("config.toml"))
    }

    /// Load configuration from a file. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(contents)?;

        // Clamp volume to valid range (0-100)
        config.player.volume = config.player.volume.min(100);

        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;

        Ok(())
    }

    /// Resolved library file path.
    pub fn library_path(&self) -> PathBuf {
        self.library.path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("trackshelf")
                .join("library.json")
        })
    }

    pub fn slideshow_interval(&self) -> Duration {
        Duration::from_secs(self.ui.slideshow_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.lookup.endpoint, "https://itunes.apple.com/search");
        assert!(config.lookup.on_select);
        assert_eq!(config.player.volume, 80);
        assert_eq!(config.slideshow_interval(), Duration::from_secs(3));
        assert!(config.library.extensions.iter().any(|e| e == "mp3"));
        assert!(config.library_path().ends_with("trackshelf/library.json"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::parse(
            r#"
            [library]
            path = "/tmp/lib.json"

            [player]
            volume = 250

            [lookup]
            on_select = false
            "#,
        )
        .unwrap();

        assert_eq!(config.library_path(), PathBuf::from("/tmp/lib.json"));
        assert!(config.library.recursive);
        assert_eq!(config.player.volume, 100);
        assert_eq!(config.player.seek_step, 10);
        assert!(!config.lookup.on_select);
        assert_eq!(config.lookup.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.ui.slideshow_secs, 3);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("conf").join("config.toml");

        let mut config = Config::default();
        config.ui.slideshow_secs = 5;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.ui.slideshow_secs, 5);
        assert!(Config::load_from(&dir.path().join("missing.toml")).is_ok());
    }
}
