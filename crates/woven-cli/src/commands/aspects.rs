//! Aspects command implementation.

use anyhow::{Context, Result};
use std::path::Path;

/// Runs the aspects command.
pub fn run(path: &Path, config_path: Option<&Path>) -> Result<()> {
    let config = super::config(path, config_path)?;
    let aspects = config.aspect_set().context("Invalid aspects")?;

    if aspects.is_empty() {
        println!("No aspects configured.");
        return Ok(());
    }

    println!(
        "{:<4} {:<20} {:<8} {:<15} {:<35} Pointcut",
        "#", "Name", "Priority", "Kind", "Advice"
    );
    println!("{}", "-".repeat(100));
    for (index, aspect) in aspects.iter().enumerate() {
        println!(
            "{:<4} {:<20} {:<8} {:<15} {:<35} {}",
            index + 1,
            aspect.name,
            aspect.priority,
            aspect.kind.to_string(),
            aspect.advice.as_str(),
            aspect.expression
        );
    }
    println!("\nThe first aspect is outermost at every join point it selects.");
    Ok(())
}
