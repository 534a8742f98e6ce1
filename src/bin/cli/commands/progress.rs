use anyhow::{Context, Result};

use crate::app::App;
use crate::render::terminal::render_level_bar;
use crate::OutputFormat;

pub async fn run(app: &App, format: &OutputFormat, use_color: bool) -> Result<()> {
    let progress = app.progress().await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&progress)?);
        }
        OutputFormat::Plain => {
            println!("{}  level {}", progress.user_id, progress.level);
            println!("{}", render_level_bar(&progress, app.config.levels(), use_color));
            if progress.xp_to_next_level > 0 {
                println!("{} XP to level {}", progress.xp_to_next_level, progress.level + 1);
            }
        }
    }

    Ok(())
}

pub fn run_leaderboard(
    app: &App,
    limit: usize,
    format: &OutputFormat,
    _use_color: bool,
) -> Result<()> {
    let entries = app
        .tracker
        .leaderboard(limit)
        .context("Failed to read progress records")?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        OutputFormat::Plain => {
            if entries.is_empty() {
                println!("No progress recorded yet.");
                return Ok(());
            }

            let max_name_len = entries.iter().map(|e| e.user_id.len()).max().unwrap_or(4).max(4);

            println!("  # {:<width$} Level     XP", "User", width = max_name_len);
            println!("{}", "\u{2500}".repeat(max_name_len + 18));
            for entry in &entries {
                println!(
                    "{:>3} {:<width$} {:>5} {:>6}",
                    entry.rank,
                    entry.user_id,
                    entry.level,
                    entry.xp_total,
                    width = max_name_len
                );
            }
        }
    }

    Ok(())
}
