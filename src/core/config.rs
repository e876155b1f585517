/// Engine configuration, read from a RON file. Every field has a default,
/// so an empty `()` file is a valid configuration.
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Which checks run after each generated episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationToggles {
    pub consistency: bool,
    pub style: bool,
}

impl Default for ValidationToggles {
    fn default() -> Self {
        ValidationToggles {
            consistency: true,
            style: true,
        }
    }
}

impl ValidationToggles {
    pub fn off() -> Self {
        ValidationToggles {
            consistency: false,
            style: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory archived scripts are written to.
    pub output_dir: PathBuf,
    /// Ledger file.
    pub state_file: PathBuf,
    pub story_file: Option<PathBuf>,
    /// RON overrides merged over the built-in rule tables.
    pub rules_file: Option<PathBuf>,
    pub protagonist: String,
    pub validation: ValidationToggles,
    /// Default filter for binaries when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            output_dir: PathBuf::from("output"),
            state_file: PathBuf::from("data/state.json"),
            story_file: None,
            rules_file: None,
            protagonist: "陆念离".to_string(),
            validation: ValidationToggles::default(),
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn load_from_ron(path: &Path) -> Result<EngineConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<EngineConfig, ConfigError> {
        let config: EngineConfig = ron::from_str(input)?;
        Ok(config)
    }
}
