//! Configuration file support for the planner.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/lift/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub progression: ProgressionConfig,
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

/// How a deload weight is rounded
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightRounding {
    /// Nearest whole weight unit (120 × 0.85 → 102)
    NearestWhole,
    /// Nearest multiple of the exercise's weight increment (→ 100 at increment 5)
    NearestIncrement,
    /// Largest multiple of the increment not above the raw value
    DownToIncrement,
}

/// Where the week after a deload resumes from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostDeload {
    /// Resume at the weight and sets prescribed before the deload
    PreDeloadLineage,
    /// Keep the reduced deload weight, restore pre-deload sets
    ContinueFromDeload,
}

/// Progression policy parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgressionConfig {
    #[serde(default = "default_deload_weight_factor")]
    pub deload_weight_factor: f64,

    #[serde(default = "default_deload_set_factor")]
    pub deload_set_factor: f64,

    #[serde(default = "default_deload_rounding")]
    pub deload_rounding: WeightRounding,

    #[serde(default = "default_post_deload")]
    pub post_deload: PostDeload,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            deload_weight_factor: default_deload_weight_factor(),
            deload_set_factor: default_deload_set_factor(),
            deload_rounding: default_deload_rounding(),
            post_deload: default_post_deload(),
        }
    }
}

impl ProgressionConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("deload_weight_factor", self.deload_weight_factor),
            ("deload_set_factor", self.deload_set_factor),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(Error::Config(format!(
                    "{} must be in (0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|| PathBuf::from("."))
    });
    base.join("lift")
}

fn default_deload_weight_factor() -> f64 {
    0.85
}

fn default_deload_set_factor() -> f64 {
    0.5
}

fn default_deload_rounding() -> WeightRounding {
    WeightRounding::NearestWhole
}

fn default_post_deload() -> PostDeload {
    PostDeload::PreDeloadLineage
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
        config.progression.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|| PathBuf::from("."))
        });
        base.join("lift").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
