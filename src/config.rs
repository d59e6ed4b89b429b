// Configuration module for the bracket assessor
// Supports YAML configuration files for norms location, pool size and bracket editing behaviour

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::selection::ResetPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub norms: NormsSettings,
    #[serde(default)]
    pub assessment: AssessmentSettings,
    #[serde(default)]
    pub bracket: BracketSettings,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Load configuration from file if it exists, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> Self {
        match path {
            Some(p) => Self::from_file(p).unwrap_or_else(|e| {
                log::warn!("{}; using default configuration", e);
                Self::default()
            }),
            None => {
                // Try default locations
                for default_path in ["bracket.yaml", "bracket.yml", ".bracket-assess.yaml"] {
                    if Path::new(default_path).exists() {
                        match Self::from_file(default_path) {
                            Ok(config) => {
                                log::info!("Loaded configuration from {}", default_path);
                                return config;
                            }
                            Err(e) => log::warn!("Ignoring {}: {}", default_path, e),
                        }
                    }
                }
                Self::default()
            }
        }
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;
        Ok(())
    }
}

/// Where the historical datasets live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormsSettings {
    /// Directory holding one `pool_<size>` folder per pool size
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for NormsSettings {
    fn default() -> Self {
        NormsSettings { data_dir: default_data_dir() }
    }
}

fn default_data_dir() -> PathBuf { PathBuf::from("data") }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentSettings {
    /// Number of entries in the user's pool
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

impl Default for AssessmentSettings {
    fn default() -> Self {
        AssessmentSettings { pool_size: default_pool_size() }
    }
}

fn default_pool_size() -> u32 { 100 }

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BracketSettings {
    /// "clear_dependents" or "preserve"
    #[serde(default)]
    pub reset_policy: ResetPolicy,
}

/// Generate a sample configuration file
pub fn generate_sample_config() -> String {
    r#"# Bracket Assessor Configuration
# All values shown are defaults - uncomment and modify as needed

# Historical norms
norms:
  # Directory containing pool_<size>/optimal_upset_strategy.csv and friends.
  # Missing datasets fall back to the built-in table; malformed rows make the assessment fail.
  data_dir: data

# Assessment settings
assessment:
  # Number of entries in your pool (10, 25, 50, 100, 500, ...)
  pool_size: 100

# Bracket editing
bracket:
  # What happens to later picks when an earlier pick changes:
  # "clear_dependents" = clear later games still holding the replaced team
  # "preserve" = keep them; they show as pending until re-picked
  reset_policy: clear_dependents
"#
    .to_string()
}
