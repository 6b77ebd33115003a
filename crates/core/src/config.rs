//! Rate configuration loaded from TOML
//!
//! ```toml
//! [debounce]
//! delay_ms = 100
//!
//! [throttle]
//! window_ms = 100
//! ```
//!
//! Missing sections and keys default to zero.

use crate::wait::Wait;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default delay / window for wrappers built from configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateConfig {
    pub debounce: DebounceConfig,
    pub throttle: ThrottleConfig,
}

/// `[debounce]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebounceConfig {
    /// Quiet period after the last call before the target runs
    pub delay_ms: f64,
}

/// `[throttle]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Cooldown after each leading call
    pub window_ms: f64,
}

impl RateConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| Error::configuration("rate config", e.message().to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration("rate config", format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Check every value converts to a valid `Wait`
    pub fn validate(&self) -> Result<()> {
        self.debounce_delay()?;
        self.throttle_window()?;
        Ok(())
    }

    /// Configured debounce delay
    pub fn debounce_delay(&self) -> Result<Wait> {
        Wait::checked("debounce.delay_ms", self.debounce.delay_ms)
    }

    /// Configured throttle window
    pub fn throttle_window(&self) -> Result<Wait> {
        Wait::checked("throttle.window_ms", self.throttle.window_ms)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::configuration("rate config", e.to_string()))
    }
}

/// Example configuration file with comments
pub fn example_config() -> &'static str {
    r#"# Cadence rate configuration

[debounce]
# Quiet period (ms) after the last call before the target runs.
# 0 still defers to the next timer turn.
delay_ms = 100

[throttle]
# Cooldown (ms) after each leading call. Calls during the cooldown are
# dropped. 0 disables throttling.
window_ms = 100
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_defaults_are_zero() {
        let config = RateConfig::from_toml_str("").unwrap();
        assert_eq!(config, RateConfig::default());
        assert!(config.debounce_delay().unwrap().is_zero());
        assert!(config.throttle_window().unwrap().is_zero());
    }

    #[test]
    fn test_example_parses() {
        let config = RateConfig::from_toml_str(example_config()).unwrap();
        assert_eq!(config.debounce_delay().unwrap(), Wait::from_millis(100));
        assert_eq!(config.throttle_window().unwrap(), Wait::from_millis(100));
    }

    #[test]
    fn test_partial_sections() {
        let config = RateConfig::from_toml_str("[throttle]\nwindow_ms = 70\n").unwrap();
        assert!(config.debounce_delay().unwrap().is_zero());
        assert_eq!(
            config.throttle_window().unwrap().as_duration(),
            Duration::from_millis(70)
        );
    }

    #[test]
    fn test_negative_value_rejected() {
        let err = RateConfig::from_toml_str("[debounce]\ndelay_ms = -5\n").unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("debounce.delay_ms"), "{err}");
    }

    #[test]
    fn test_non_numeric_value_rejected() {
        let err = RateConfig::from_toml_str("[throttle]\nwindow_ms = \"soon\"\n").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_load_from_file() -> anyhow::Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let path = temp_dir.path().join("cadence.toml");
        std::fs::write(&path, "[debounce]\ndelay_ms = 250.5\n")?;

        let config = RateConfig::load(&path)?;
        assert_eq!(
            config.debounce_delay()?.as_duration(),
            Duration::from_micros(250_500)
        );

        let missing = RateConfig::load(&temp_dir.path().join("missing.toml"));
        assert!(missing.unwrap_err().is_configuration());
        Ok(())
    }

    #[test]
    fn test_roundtrip_through_toml() {
        let mut config = RateConfig::default();
        config.debounce.delay_ms = 40.0;
        let text = config.to_toml_string().unwrap();
        assert_eq!(RateConfig::from_toml_str(&text).unwrap(), config);
    }
}
