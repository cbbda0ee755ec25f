//! Configuration management for tandem.
//!
//! Configuration is loaded from multiple sources with precedence:
//! 1. Environment variables (TANDEM_*)
//! 2. Config file (`$TANDEM_CONFIG` or the platform data dir `config.toml`)
//! 3. Default values

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tandem_core::ManagerConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Session and invite lifetimes
    #[serde(default)]
    pub manager: ManagerConfig,

    /// Bot behaviour
    #[serde(default)]
    pub bot: BotConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Channel matches are started in
    #[serde(default = "default_channel")]
    pub channel: String,

    /// Let a user challenge themselves (useful for solo testing)
    #[serde(default)]
    pub allow_self_challenge: bool,

    /// Seconds before a user may repeat the same command; 0 disables
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

fn default_channel() -> String {
    "lobby".to_string()
}

fn default_cooldown_secs() -> u64 {
    2
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            channel: default_channel(),
            allow_self_challenge: false,
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("dev", "tandem", "tandem") {
        proj_dirs.data_dir().to_path_buf()
    } else {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".tandem")
    }
}

impl Config {
    /// Load configuration from file and environment.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env(|name| std::env::var(name).ok())?;
        config.manager.validate().context("Invalid manager configuration")?;
        Ok(config)
    }

    /// Load configuration from a file, falling back to defaults if missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Apply `TANDEM_*` overrides looked up through `var`.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = var("TANDEM_SESSION_TTL_SECS") {
            self.manager.session_ttl_secs = value
                .trim()
                .parse()
                .context("TANDEM_SESSION_TTL_SECS must be a number of seconds")?;
        }
        if let Some(value) = var("TANDEM_INVITE_TTL_SECS") {
            self.manager.invite_ttl_secs = value
                .trim()
                .parse()
                .context("TANDEM_INVITE_TTL_SECS must be a number of seconds")?;
        }
        if let Some(value) = var("TANDEM_COOLDOWN_SECS") {
            self.bot.cooldown_secs = value
                .trim()
                .parse()
                .context("TANDEM_COOLDOWN_SECS must be a number of seconds")?;
        }
        if let Some(channel) = var("TANDEM_CHANNEL") {
            self.bot.channel = channel;
        }
        Ok(())
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Get the config file path.
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("TANDEM_CONFIG") {
            PathBuf::from(path)
        } else {
            default_data_dir().join("config.toml")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.manager.session_ttl_secs, 1800);
        assert_eq!(config.manager.invite_ttl_secs, 60);
        assert_eq!(config.bot.channel, "lobby");
        assert!(!config.bot.allow_self_challenge);
        assert_eq!(config.bot.cooldown_secs, 2);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.manager, ManagerConfig::default());
    }

    #[test]
    fn test_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[manager]\nsession_ttl_secs = 300\n\n[bot]\nchannel = \"chess\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.manager.session_ttl_secs, 300);
        assert_eq!(config.manager.invite_ttl_secs, 60);
        assert_eq!(config.bot.channel, "chess");
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "manager = 3").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("TANDEM_SESSION_TTL_SECS", "90"),
            ("TANDEM_INVITE_TTL_SECS", " 15 "),
            ("TANDEM_COOLDOWN_SECS", "0"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env(|name| env.get(name).map(|value| value.to_string()))
            .unwrap();

        assert_eq!(config.manager.session_ttl_secs, 90);
        assert_eq!(config.manager.invite_ttl_secs, 15);
        assert_eq!(config.bot.cooldown_secs, 0);
        assert_eq!(config.bot.channel, "lobby");
    }

    #[test]
    fn test_bad_env_value() {
        let mut config = Config::default();
        let result = config.apply_env(|name| {
            (name == "TANDEM_INVITE_TTL_SECS").then(|| "soon".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_round_trips_through_toml() {
        let rendered = Config::default().to_toml().unwrap();
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.bot.channel, "lobby");
    }
}
