//! Configuration display command

use anyhow::Result;
use cadence_core::config::{example_config, RateConfig};
use owo_colors::OwoColorize;

/// Print the effective configuration, or the example file
pub fn run(config: &RateConfig, example: bool) -> Result<()> {
    if example {
        print!("{}", example_config());
        return Ok(());
    }

    println!("{}", "Rate Configuration".bold());

    println!("\n{}", "[debounce]".yellow());
    println!(
        "  {} = {} {}",
        "delay_ms".cyan(),
        config.debounce.delay_ms,
        format!("({})", config.debounce_delay()?).dimmed()
    );

    println!("\n{}", "[throttle]".yellow());
    println!(
        "  {} = {} {}",
        "window_ms".cyan(),
        config.throttle.window_ms,
        format!("({})", config.throttle_window()?).dimmed()
    );

    Ok(())
}
