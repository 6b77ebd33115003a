//! Command implementations

pub mod config;
pub mod demo;
pub mod replay;

use anyhow::{Context, Result};
use cadence_core::RateConfig;
use std::path::Path;

/// Load the rate configuration, or defaults when no file is given
pub fn load_config(path: Option<&Path>) -> Result<RateConfig> {
    match path {
        Some(path) => RateConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(RateConfig::default()),
    }
}
