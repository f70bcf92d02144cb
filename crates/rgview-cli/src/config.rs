//! CLI configuration.

use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_rg_path")]
    pub rg_path: PathBuf,
    /// Maximum cached sessions; 0 disables eviction.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    /// Extra arguments prepended to every search invocation.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_rg_path() -> PathBuf {
    PathBuf::from("rg")
}

fn default_max_sessions() -> usize {
    8
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rg_path: default_rg_path(),
            max_sessions: default_max_sessions(),
            extra_args: Vec::new(),
        }
    }
}

impl Config {
    /// Load config from a specific file path.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load config from the default location or fall back to defaults.
    pub fn load() -> Result<Self> {
        let config_path = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rgview")
            .join("config.toml");
        if config_path.exists() {
            return Self::load_from(&config_path);
        }
        Ok(Config::default())
    }

    /// Session cache capacity, with 0 meaning unbounded.
    pub fn capacity(&self) -> Option<usize> {
        if self.max_sessions == 0 {
            None
        } else {
            Some(self.max_sessions)
        }
    }
}
