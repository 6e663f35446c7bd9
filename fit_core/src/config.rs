//! Configuration file support for Fit.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/fit/config.toml`.

use crate::{Error, Result, SessionTimings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub session: SessionTimings,

    #[serde(default)]
    pub profile: ProfileConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// User profile values used by the calorie estimate
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct ProfileConfig {
    /// Body weight in kilograms
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
}

fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| home_dir().join(".local/share"));
    base.join("fit")
}

fn home_dir() -> PathBuf {
    dirs::home_dir()
        .or_else(|| std::env::var_os("HOME").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Check values serde cannot check
    pub fn validate(&self) -> Result<()> {
        self.session.validate()?;
        if let Some(weight) = self.profile.weight_kg {
            if !weight.is_finite() || weight <= 0.0 {
                return Err(Error::Config(format!(
                    "profile.weight_kg must be positive, got {}",
                    weight
                )));
            }
        }
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| home_dir().join(".config"));
        base.join("fit").join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.session, SessionTimings::default());
        assert!(config.profile.weight_kg.is_none());
        assert!(config.data.data_dir.ends_with("fit"));
    }

    #[test]
    fn test_config_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("fit").join("config.toml");

        let mut config = Config::default();
        config.profile.weight_kg = Some(72.5);
        config.session.break_seconds = 20;
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();

        let parsed = Config::load_from(&path).unwrap();
        assert_eq!(parsed.profile.weight_kg, Some(72.5));
        assert_eq!(parsed.session.break_seconds, 20);
        assert_eq!(parsed.session.countdown_seconds, 3);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[session]
break_seconds = 30
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.session.break_seconds, 30);
        assert_eq!(config.session.countdown_seconds, 3); // default
        assert_eq!(config.session.default_exercise_seconds, 180); // default
    }

    #[test]
    fn test_invalid_values_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");

        std::fs::write(&path, "[profile]\nweight_kg = -3.0\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));

        std::fs::write(&path, "[session]\nbreak_seconds = 0\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }
}
