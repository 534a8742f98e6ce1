use anyhow::Result;

use studyquest_lib::techniques::catalog;

use crate::app::App;
use crate::render::terminal::{paint, Color};
use crate::OutputFormat;

pub async fn run(app: &App, format: &OutputFormat, use_color: bool) -> Result<()> {
    let progress = app.progress().await?;
    let techniques = catalog();

    match format {
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = techniques
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "id": t.id,
                        "name": t.name,
                        "description": t.description,
                        "requiredLevel": t.required_level,
                        "unlocked": t.id.is_unlocked_at(progress.level),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Level {} ({} XP)\n", progress.level, progress.xp_total);
            for technique in &techniques {
                let status = if technique.id.is_unlocked_at(progress.level) {
                    paint("unlocked", Color::GREEN, use_color)
                } else {
                    paint(
                        &format!("level {}", technique.required_level),
                        Color::GRAY,
                        use_color,
                    )
                };
                println!(
                    "{:<18} {:<22} {}",
                    technique.id.as_str(),
                    technique.name,
                    status
                );
                println!("  {}", paint(technique.description, Color::DIM, use_color));
            }
        }
    }

    Ok(())
}
