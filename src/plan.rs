//! Plan and config files for the CLI

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use logval_logs::ValidatorConfig;
use logval_types::ServiceRequest;

/// Top level of the config file
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub validator: ValidatorConfig,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

/// Steps executed in order against one session
#[derive(Debug, Deserialize)]
pub struct Plan {
    #[serde(rename = "Steps", alias = "steps")]
    pub steps: Vec<ServiceRequest>,
}

impl Plan {
    /// Load a plan; `.json` files are JSON, anything else is TOML
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read plan {}", path.display()))?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        Self::parse(&content, is_json)
            .with_context(|| format!("Failed to parse plan {}", path.display()))
    }

    pub fn parse(content: &str, is_json: bool) -> Result<Self> {
        if is_json {
            Ok(serde_json::from_str(content)?)
        } else {
            Ok(toml::from_str(content)?)
        }
    }
}
