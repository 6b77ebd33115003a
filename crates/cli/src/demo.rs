//! Built-in scenarios shipped with the binary

use crate::scenario::Scenario;
use anyhow::{Context, Result};

/// (file name, TOML source) of every built-in scenario
pub const BUILTIN: &[(&str, &str)] = &[
    ("debounce_burst.toml", include_str!("../scenarios/debounce_burst.toml")),
    ("debounce_separated.toml", include_str!("../scenarios/debounce_separated.toml")),
    ("throttle_window.toml", include_str!("../scenarios/throttle_window.toml")),
    ("throttle_zero.toml", include_str!("../scenarios/throttle_zero.toml")),
    ("throttle_instances.toml", include_str!("../scenarios/throttle_instances.toml")),
];

/// Parse every built-in scenario
pub fn builtin_scenarios() -> Result<Vec<Scenario>> {
    BUILTIN
        .iter()
        .map(|(file, source)| {
            Scenario::from_toml_str(source).with_context(|| format!("Built-in scenario {}", file))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::replay_virtual;
    use cadence_core::RateConfig;

    #[test]
    fn test_builtins_parse_and_declare_expectations() {
        let scenarios = builtin_scenarios().unwrap();
        assert_eq!(scenarios.len(), BUILTIN.len());
        assert!(scenarios.iter().all(|s| s.expect_invocations.is_some()));
    }

    #[test]
    fn test_builtins_meet_expectations() {
        for scenario in builtin_scenarios().unwrap() {
            let timeline = replay_virtual(&scenario, &RateConfig::default()).unwrap();
            assert!(
                timeline.meets_expectation(),
                "{}: expected {:?}, got {}",
                timeline.name,
                timeline.expected,
                timeline.invocations()
            );
        }
    }
}
