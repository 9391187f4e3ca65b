use crate::output;
use cloudmux_core::ControlPlane;
use colored::Colorize;
use std::io::{self, BufRead, Write};

fn confirm(connection: &str) -> anyhow::Result<bool> {
    print!(
        "{} Delete every mapped resource on {}? [y/N] ",
        "!".yellow().bold(),
        connection.cyan()
    );
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

pub async fn handle(plane: &ControlPlane, connection: &str, yes: bool, json: bool) -> anyhow::Result<()> {
    if !yes && !confirm(connection)? {
        println!("{}", "Cancelled".dimmed());
        return Ok(());
    }

    let destroyed = plane.destroy(connection).await?;
    if json {
        output::print_json(&destroyed)?;
    } else {
        for kind in &destroyed.per_kind {
            if kind.deleted.is_empty() && kind.remained_errors.is_empty() {
                continue;
            }
            println!("{}", kind.kind.to_string().bold());
            for name in &kind.deleted {
                println!("  {} {}", "✓".green(), name);
            }
            for remained in &kind.remained_errors {
                println!("  {} {}: {}", "✗".red(), remained.name, remained.error.dimmed());
            }
        }
    }

    if destroyed.all_destroyed {
        if !json {
            output::success(format!("Destroyed every resource on {}", connection.cyan()));
        }
        Ok(())
    } else {
        anyhow::bail!("some resources on {} were not deleted", connection)
    }
}
