use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::dates::DEFAULT_COVERAGE_YEARS;
use crate::gaps::MIN_REPORTED_GAP_DAYS;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CheckConfig {
    #[serde(default)]
    pub coverage: CoverageConfig,
    #[serde(default)]
    pub removal: RemovalConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageConfig {
    #[serde(default = "default_coverage_years")]
    pub years: u32,
    #[serde(default = "default_min_gap_days")]
    pub min_gap_days: i64,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            years: default_coverage_years(),
            min_gap_days: default_min_gap_days(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalConfig {
    /// Ask before removing a saved, named reference.
    #[serde(default = "default_true")]
    pub confirm: bool,
}

impl Default for RemovalConfig {
    fn default() -> Self {
        Self {
            confirm: default_true(),
        }
    }
}

/// Load `<root>/.refcheck/config.toml`, falling back to the user config
/// directory and then to defaults.
pub fn load_config(root: &Path) -> Result<CheckConfig> {
    let path = root.join(".refcheck/config.toml");
    if path.exists() {
        return read_config(&path);
    }

    let Some(config_dir) = dirs::config_dir() else {
        return Ok(CheckConfig::default());
    };
    let user_path = config_dir.join("refcheck/config.toml");
    if user_path.exists() {
        return read_config(&user_path);
    }

    Ok(CheckConfig::default())
}

fn read_config(path: &Path) -> Result<CheckConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let config = toml::from_str::<CheckConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    tracing::debug!(path = %path.display(), ?config, "loaded config");
    Ok(config)
}

const fn default_true() -> bool {
    true
}

const fn default_coverage_years() -> u32 {
    DEFAULT_COVERAGE_YEARS
}

const fn default_min_gap_days() -> i64 {
    MIN_REPORTED_GAP_DAYS
}
