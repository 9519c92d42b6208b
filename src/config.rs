//! Chain configuration

use serde::{Deserialize, Serialize};

use crate::constants::CUTOFF_AGE;
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Blocks whose parent is more than this many heights below the tip are rejected,
    /// and state this far below the tip is evicted
    pub cutoff_age: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            cutoff_age: CUTOFF_AGE,
        }
    }
}

impl ChainConfig {
    pub fn with_cutoff_age(cutoff_age: u64) -> Self {
        Self { cutoff_age }
    }

    /// Parse from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cutoff_age == 0 {
            return Err(ConfigError::Invalid(
                "cutoff_age must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
