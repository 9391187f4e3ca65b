//! Terminal output helpers

use colored::Colorize;
use serde::Serialize;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn success(message: impl AsRef<str>) {
    println!("{} {}", "✓".green(), message.as_ref());
}

pub fn empty(what: &str) {
    println!("{}", format!("No {} registered", what).dimmed());
}

/// Bold header row followed by a rule
pub fn header(columns: &str) {
    println!("{}", columns.bold());
    println!("{}", "─".repeat(columns.len().max(40)).dimmed());
}
