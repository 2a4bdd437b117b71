use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://saavn.dev/api";
pub const DEFAULT_VOLUME: f32 = 0.8;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Maximum number of results per search. The API default applies when unset.
    pub limit: Option<u32>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            limit: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DownloadConfig {
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default = "default_volume")]
    pub volume: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            volume: default_volume(),
        }
    }
}

impl PlaybackConfig {
    pub fn clamped_volume(&self) -> f32 {
        self.volume.clamp(0.0, 1.0)
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_volume() -> f32 {
    DEFAULT_VOLUME
}

fn config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home)
        .join(".config")
        .join("saavnplay")
        .join("config.toml")
}

pub fn load_config() -> Config {
    let path = config_path();
    if !path.exists() {
        return Config::default();
    }
    match std::fs::read_to_string(&path) {
        Ok(content) => parse_config(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "ignoring invalid config file");
            Config::default()
        }),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "config file unreadable");
            Config::default()
        }
    }
}

pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).context("config file is not valid TOML")
}

pub fn save_config(config: &Config) -> Result<()> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(&path, content)?;
    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.api.limit, None);
        assert!(cfg.download.directory.is_none());
        assert_eq!(cfg.playback.volume, DEFAULT_VOLUME);
    }

    #[test]
    fn test_partial_sections() {
        let cfg = parse_config(
            r#"
            [api]
            limit = 25

            [download]
            directory = "/tmp/music"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.api.limit, Some(25));
        assert_eq!(cfg.download.directory, Some(PathBuf::from("/tmp/music")));
    }

    #[test]
    fn test_volume_is_clamped() {
        let cfg = parse_config("[playback]\nvolume = 3.5").unwrap();
        assert_eq!(cfg.playback.clamped_volume(), 1.0);
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(parse_config("[api\nbase_url = ").is_err());
    }

    #[test]
    fn test_round_trip_through_toml() {
        let mut cfg = Config::default();
        cfg.api.base_url = "http://localhost:3000/api".to_string();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed = parse_config(&text).unwrap();
        assert_eq!(parsed.api.base_url, "http://localhost:3000/api");
    }
}
