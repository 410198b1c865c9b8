use std::{path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::summary::DEFAULT_BILLABLE_RATE;

pub const CONFIG_FILE: &str = "config.toml";

/// Settings of the local installation, read from `config.toml` in the application directory.
/// Unlike [crate::store::entities::UserSettings] they are never synchronized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// User the commands act as when `--user` isn't given.
    pub user_id: Option<String>,
    pub billable_rate: f64,
    pub tick_interval_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            user_id: None,
            billable_rate: DEFAULT_BILLABLE_RATE,
            tick_interval_ms: 1000,
            poll_interval_ms: 2000,
        }
    }
}

impl AppConfig {
    /// Returns the default config if the file doesn't exist.
    pub fn load(app_dir: &Path) -> Result<Self> {
        let path = app_dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;
        Ok(config)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::Result;
    use tempfile::tempdir;

    use super::{AppConfig, CONFIG_FILE};

    #[test]
    fn test_missing_file_gives_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = AppConfig::load(dir.path())?;
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
        assert_eq!(config.poll_interval(), Duration::from_secs(2));
        Ok(())
    }

    #[test]
    fn test_partial_file() -> Result<()> {
        let dir = tempdir()?;
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "user_id = \"u1\"\nbillable_rate = 80.0\n",
        )?;

        let config = AppConfig::load(dir.path())?;

        assert_eq!(config.user_id.as_deref(), Some("u1"));
        assert_eq!(config.billable_rate, 80.);
        assert_eq!(config.tick_interval_ms, 1000);
        Ok(())
    }

    #[test]
    fn test_malformed_file_is_an_error() -> Result<()> {
        let dir = tempdir()?;
        std::fs::write(dir.path().join(CONFIG_FILE), "billable_rate = \"lots\"")?;
        assert!(AppConfig::load(dir.path()).is_err());
        Ok(())
    }
}
