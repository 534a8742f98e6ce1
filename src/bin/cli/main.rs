mod app;
mod commands;
mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "studyquest-cli", about = "Study flashcards, earn XP and unlock techniques", version)]
struct Cli {
    /// Config file (default: {config_dir}/studyquest/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Study as this user (default: backend.user_id from the config)
    #[arg(long, global = true)]
    user: Option<String>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// List study techniques and whether they are unlocked
    Techniques,

    /// List the characters and their specialties
    Characters,

    /// Show XP, level and progress to the next level
    Progress,

    /// Rank locally known users by XP
    Leaderboard {
        /// Maximum entries
        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Run an interactive study session
    Study {
        /// Topic to generate cards for
        #[arg(long)]
        topic: String,
        /// Technique, e.g. "flashcards" or "spaced-repetition"
        #[arg(long, default_value = "flashcards")]
        technique: String,
        /// Character name (case-insensitive)
        #[arg(long)]
        character: Option<String>,
        /// Number of cards (default: session.default_card_count)
        #[arg(long)]
        count: Option<usize>,
        /// Ignore the configured study service and keep progress on disk
        #[arg(long)]
        offline: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let use_color = !cli.no_color && atty_check();
    let app = app::App::new(cli.config.as_deref(), cli.user.as_deref())?;

    match cli.command {
        Command::Techniques => {
            commands::techniques::run(&app, &cli.format, use_color).await?;
        }
        Command::Characters => {
            commands::characters::run(&cli.format, use_color)?;
        }
        Command::Progress => {
            commands::progress::run(&app, &cli.format, use_color).await?;
        }
        Command::Leaderboard { limit } => {
            commands::progress::run_leaderboard(&app, limit, &cli.format, use_color)?;
        }
        Command::Study { topic, technique, character, count, offline } => {
            let options = commands::study::StudyOptions {
                topic,
                technique,
                character,
                count,
                offline,
            };
            commands::study::run(&app, options, &cli.format, use_color).await?;
        }
    }

    Ok(())
}

/// Check if stdout is a terminal (for color support)
fn atty_check() -> bool {
    unsafe { libc_isatty(1) != 0 }
}

extern "C" {
    #[link_name = "isatty"]
    fn libc_isatty(fd: i32) -> i32;
}
