// Global configuration management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: DefaultsConfig,

    #[serde(default)]
    pub encoder: EncoderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Default reduction percentage for new jobs
    #[serde(default = "default_reduction")]
    pub reduction: u32,

    /// Default mode: "size" (two-pass bitrate target) or "quality" (CRF)
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Default video codec passed to ffmpeg
    #[serde(default = "default_codec")]
    pub codec: String,

    /// Extra ffmpeg arguments appended to real-output invocations
    #[serde(default)]
    pub extra_args: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Explicit path to the ffmpeg binary; PATH discovery is used when unset
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,
}

fn default_reduction() -> u32 {
    20
}

fn default_mode() -> String {
    "size".to_string()
}

fn default_codec() -> String {
    "libx264".to_string()
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            reduction: default_reduction(),
            mode: default_mode(),
            codec: default_codec(),
            extra_args: String::new(),
        }
    }
}

impl Config {
    /// Path of the config file (platform config dir + vidopt/config.toml)
    pub fn config_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().context("Could not determine config directory")?;
        Ok(dir.join("vidopt").join("config.toml"))
    }

    /// Load the config, or defaults when no file exists yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Write the config, creating the directory if needed. Returns the path
    /// written.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}
