//! Configuration loading and validation

mod schema;

pub use schema::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Example configuration written by `chiptone init`
pub const EXAMPLE_CONFIG: &str = include_str!("../../chiptone.example.yaml");

/// Load configuration from a YAML file
pub fn load_config(path: &Path) -> Result<ChiptoneConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {:?}", path))?;
    let config: ChiptoneConfig = serde_yaml::from_str(&contents)
        .with_context(|| format!("failed to parse config file: {:?}", path))?;
    config.validate()?;
    Ok(config)
}
