use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct RatesConfig {
    pub base_url: String,
    pub pivot: String,
    pub ttl_secs: u64,
    pub timeout_secs: u64,
    pub retries: usize,
    pub retry_delay_ms: u64,
    pub retry_backoff_secs: u64,
}

impl Default for RatesConfig {
    fn default() -> Self {
        RatesConfig {
            base_url: "https://api.exchangerate-api.com/v4/latest".to_string(),
            pivot: "USD".to_string(),
            ttl_secs: 3600,
            timeout_secs: 10,
            retries: 2,
            retry_delay_ms: 500,
            retry_backoff_secs: 30,
        }
    }
}

impl RatesConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    pub precision: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig { precision: 6 }
    }
}

fn default_persist_rates() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub rates: RatesConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default = "default_persist_rates")]
    pub persist_rates: bool,
    pub data_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            rates: RatesConfig::default(),
            display: DisplayConfig::default(),
            persist_rates: default_persist_rates(),
            data_path: None,
        }
    }
}

impl AppConfig {
    /// Loads the config from the default location, falling back to the
    /// built-in defaults when no file exists there.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(path = %config_path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "convkit", "convkit")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("io", "convkit", "convkit")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
rates:
  base_url: "http://example.com/rates"
  pivot: "EUR"
  ttl_secs: 600
display:
  precision: 4
persist_rates: false
data_path: "/tmp/convkit"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.rates.base_url, "http://example.com/rates");
        assert_eq!(config.rates.pivot, "EUR");
        assert_eq!(config.rates.ttl(), Duration::from_secs(600));
        // unspecified keys keep their defaults
        assert_eq!(config.rates.timeout_secs, 10);
        assert_eq!(config.rates.retries, 2);
        assert_eq!(config.display.precision, 4);
        assert!(!config.persist_rates);
        assert_eq!(
            config.default_data_path().unwrap(),
            PathBuf::from("/tmp/convkit")
        );
    }

    #[test]
    fn test_empty_sections_use_defaults() {
        let config: AppConfig = serde_yaml::from_str("data_path: ~\n").unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(config.persist_rates);
        assert_eq!(config.rates.pivot, "USD");
        assert_eq!(config.rates.ttl(), Duration::from_secs(3600));
        assert_eq!(config.display.precision, 6);
    }

    #[test]
    fn test_load_from_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = AppConfig::load_from_path(dir.path().join("missing.yaml"));
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }
}
