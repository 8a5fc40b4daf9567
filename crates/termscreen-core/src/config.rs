//! Session configuration.

use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::geometry::Dimensions;

/// Configuration for a terminal session.
///
/// Loadable from YAML; every field has a sensible default so partial files
/// are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SessionConfig {
    /// Grid rows
    pub rows: u16,
    /// Grid columns
    pub cols: u16,
    /// Maximum number of scrollback lines retained (FIFO eviction)
    pub scrollback_capacity: usize,
    /// Pending damage regions kept before collapsing to full-screen damage
    pub max_pending_damage: usize,
    /// Upper bound on cell-run query length, in UTF-16 units
    pub max_run_length: u16,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rows: 24,
            cols: 80,
            scrollback_capacity: 1000,
            max_pending_damage: 100,
            max_run_length: 256,
        }
    }
}

impl SessionConfig {
    /// Configuration with the given grid size and default limits.
    pub fn new(rows: u16, cols: u16) -> Self {
        Self {
            rows,
            cols,
            ..Default::default()
        }
    }

    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> crate::Result<Self> {
        let config: SessionConfig = serde_yaml::from_str(yaml)
            .map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> crate::Result<()> {
        if self.rows == 0 || self.cols == 0 {
            return Err(crate::Error::InvalidDimensions {
                rows: self.rows,
                cols: self.cols,
            });
        }
        if self.max_pending_damage == 0 {
            return Err(crate::Error::Config(
                "max_pending_damage must be > 0".to_string(),
            ));
        }
        if self.max_run_length == 0 {
            return Err(crate::Error::Config(
                "max_run_length must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Grid dimensions.
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.rows, self.cols)
    }
}
