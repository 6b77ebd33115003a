//! Scenario files: a scripted timeline of calls against one wrapper kind

use anyhow::{Context, Result};
use cadence_core::{RateConfig, Wait};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Instance name used when a call doesn't name one
pub const DEFAULT_INSTANCE: &str = "main";

/// Context used when a call doesn't supply one
pub const DEFAULT_CONTEXT: &str = "global";

/// Which wrapper a scenario exercises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Debounce,
    Throttle,
}

/// A wait given either as milliseconds or as text (`"100ms"`, `"1.5s"`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WaitSpec {
    Millis(f64),
    Text(String),
}

/// One scripted call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedCall {
    /// When the call is made, relative to the start of the replay
    pub at_ms: u64,
    /// Wrapper instance the call goes to
    #[serde(default = "default_instance")]
    pub instance: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_context")]
    pub context: String,
}

/// A replayable scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    pub kind: Kind,
    /// Delay or window; falls back to the rate configuration
    #[serde(default, alias = "wait")]
    pub wait_ms: Option<WaitSpec>,
    /// Total invocations the replay should produce
    #[serde(default)]
    pub expect_invocations: Option<usize>,
    #[serde(default, rename = "call")]
    pub calls: Vec<ScriptedCall>,
}

fn default_instance() -> String {
    DEFAULT_INSTANCE.to_string()
}

fn default_context() -> String {
    DEFAULT_CONTEXT.to_string()
}

impl Scenario {
    /// Parse a scenario from TOML
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse scenario")
    }

    /// Read and parse a scenario file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("In {}", path.display()))
    }

    /// Resolve the wait, falling back to the configured default for the kind
    pub fn wait(&self, config: &RateConfig) -> cadence_core::Result<Wait> {
        match &self.wait_ms {
            Some(WaitSpec::Millis(ms)) => Wait::try_from(*ms),
            Some(WaitSpec::Text(text)) => text.parse(),
            None => match self.kind {
                Kind::Debounce => config.debounce_delay(),
                Kind::Throttle => config.throttle_window(),
            },
        }
    }

    /// Calls in replay order: by time, ties kept in file order
    pub fn ordered_calls(&self) -> Vec<&ScriptedCall> {
        let mut calls: Vec<_> = self.calls.iter().collect();
        calls.sort_by_key(|call| call.at_ms);
        calls
    }

    /// Instance names in order of first appearance
    pub fn instances(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for call in &self.calls {
            if !names.contains(&call.instance.as_str()) {
                names.push(&call.instance);
            }
        }
        names
    }

    /// Display name, falling back to the kind
    pub fn title(&self) -> String {
        if self.name.is_empty() {
            format!("{:?} scenario", self.kind).to_lowercase()
        } else {
            self.name.clone()
        }
    }
}
