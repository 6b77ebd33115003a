//! Scenario replay command

use anyhow::{Context, Result};
use cadence_cli::{replay_realtime, replay_virtual, Outcome, Scenario, Timeline};
use cadence_core::RateConfig;
use owo_colors::OwoColorize;
use std::path::Path;

/// Replay one scenario file and print its timeline
pub async fn run(path: &Path, config: &RateConfig, realtime: bool, json: bool) -> Result<()> {
    let scenario = Scenario::load(path)?;
    let timeline = replay(&scenario, config, realtime).await?;

    if json {
        let rendered = serde_json::to_string_pretty(&timeline)
            .context("Failed to serialize timeline")?;
        println!("{}", rendered);
    } else {
        print_timeline(&timeline);
    }

    if !timeline.meets_expectation() {
        anyhow::bail!(
            "Expected {} invocations, got {}",
            timeline.expected.unwrap_or_default(),
            timeline.invocations()
        );
    }
    Ok(())
}

/// Replay on the chosen clock
pub async fn replay(scenario: &Scenario, config: &RateConfig, realtime: bool) -> Result<Timeline> {
    if realtime {
        replay_realtime(scenario, config).await
    } else {
        replay_virtual(scenario, config)
    }
}

/// Print a timeline, one event per line
pub fn print_timeline(timeline: &Timeline) {
    println!(
        "{} {}",
        timeline.name.bold(),
        format!("({:?}, wait {}ms)", timeline.kind, timeline.wait_ms).dimmed()
    );

    for event in &timeline.events {
        let stamp = format!("[{:>5}ms]", event.at_ms);
        let outcome = match event.outcome {
            Outcome::Invoked => "invoked ".green().to_string(),
            Outcome::Deferred => "deferred".dimmed().to_string(),
            Outcome::Dropped => "dropped ".yellow().to_string(),
        };
        println!(
            "  {} {} {} args=[{}] context={}",
            stamp.dimmed(),
            event.instance.cyan(),
            outcome,
            event.args.join(", "),
            event.context
        );
    }

    println!("  {} invocation(s)", timeline.invocations());
}
