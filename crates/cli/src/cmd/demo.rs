//! Built-in scenario demo command

use super::replay::{print_timeline, replay};
use anyhow::Result;
use cadence_cli::demo::builtin_scenarios;
use cadence_core::RateConfig;
use owo_colors::OwoColorize;

/// Replay every built-in scenario and summarise expectations
pub async fn run(config: &RateConfig, realtime: bool) -> Result<()> {
    let mut failed = 0;

    for scenario in builtin_scenarios()? {
        let timeline = replay(&scenario, config, realtime).await?;
        print_timeline(&timeline);

        if timeline.meets_expectation() {
            println!("  {}\n", "✓ expectation met".green());
        } else {
            failed += 1;
            println!(
                "  {} expected {}, got {}\n",
                "✗".red(),
                timeline.expected.unwrap_or_default(),
                timeline.invocations()
            );
        }
    }

    if failed > 0 {
        anyhow::bail!("{} built-in scenario(s) missed their expectation", failed);
    }
    Ok(())
}
