use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::platform;

pub const DEFAULT_API_BASE: &str = "https://commute-learn-api.onrender.com/api";
pub const DEFAULT_AUDIO_BASE: &str = "https://commute-learn-api.onrender.com/audio";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Where the backend lives. Both URLs are fixed for the lifetime of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Serving path for `audio_file` names when a podcast carries no `audio_url`.
    #[serde(default = "default_audio_base")]
    pub audio_base: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// How long a completed status stays on screen before the player opens.
    #[serde(default = "default_completion_delay_ms")]
    pub completion_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    #[serde(default = "default_volume")]
    pub default_volume: f32,
    #[serde(default = "default_skip_secs")]
    pub skip_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_subject")]
    pub default_subject: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory for downloaded podcasts.
    /// Defaults to `~/notecast-downloads`.
    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            audio_base: default_audio_base(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            completion_delay_ms: default_completion_delay_ms(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            default_volume: default_volume(),
            skip_secs: default_skip_secs(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            default_subject: default_subject(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            downloads_dir: default_downloads_dir(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_audio_base() -> String {
    DEFAULT_AUDIO_BASE.to_string()
}

fn default_interval_secs() -> u64 {
    2
}

fn default_completion_delay_ms() -> u64 {
    1000
}

fn default_volume() -> f32 {
    0.8
}

fn default_skip_secs() -> f64 {
    10.0
}

fn default_subject() -> String {
    "Physics".to_string()
}

fn default_downloads_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("notecast-downloads")
}

impl Config {
    /// Load from the default location, writing a default file on first run.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(config_path: &Path) -> anyhow::Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.polling.interval_secs.max(1))
    }

    pub fn completion_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.polling.completion_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, DEFAULT_API_BASE);
        assert_eq!(config.polling.interval_secs, 2);
        assert_eq!(config.polling.completion_delay_ms, 1000);
        assert!((config.player.default_volume - 0.8).abs() < f32::EPSILON);
        assert_eq!(config.upload.default_subject, "Physics");
        assert!(config.paths.downloads_dir.ends_with("notecast-downloads"));
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            [api]
            base_url = "http://127.0.0.1:8000/api"

            [polling]
            interval_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.api.base_url, "http://127.0.0.1:8000/api");
        assert_eq!(config.api.audio_base, DEFAULT_AUDIO_BASE);
        assert_eq!(config.polling.interval_secs, 5);
        assert_eq!(config.polling.completion_delay_ms, 1000);
        assert!((config.player.skip_secs - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_load_from_writes_defaults_on_first_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.api.base_url, DEFAULT_API_BASE);

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.polling.interval_secs, config.polling.interval_secs);
    }

    #[test]
    fn test_zero_interval_is_floored() {
        let mut config = Config::default();
        config.polling.interval_secs = 0;
        assert_eq!(config.poll_interval(), std::time::Duration::from_secs(1));
    }
}
