use anyhow::Result;

use studyquest_lib::xp::roster;

use crate::render::terminal::{paint, Color};
use crate::OutputFormat;

pub fn run(format: &OutputFormat, use_color: bool) -> Result<()> {
    let characters = roster();

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&characters)?);
        }
        OutputFormat::Plain => {
            for character in &characters {
                let specialties: Vec<&str> =
                    character.specialties.iter().map(|t| t.as_str()).collect();
                println!(
                    "{:<8} {:<20} x{} on {}",
                    paint(&character.name, Color::BOLD, use_color),
                    character.style.as_deref().unwrap_or(""),
                    character.bonus_multiplier,
                    specialties.join(", ")
                );
            }
        }
    }

    Ok(())
}
