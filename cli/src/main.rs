//! Letter Editor - command-line host for the letter editing core
//!
//! Opens letters stored as HTML plus an endnote sidecar, runs edit scripts
//! through the editing engine, and spell-checks letters offline.

mod commands;
mod script;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use store::SettingsManager;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(version, about = "Edit and check immigration letters", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Settings file (default: .letter-editor/settings.json)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty letter
    New {
        /// Letter HTML file
        path: PathBuf,
    },
    /// List a letter's endnotes
    Endnotes {
        /// Letter HTML file
        path: PathBuf,
    },
    /// Spell-check a letter
    Check {
        /// Letter HTML file
        path: PathBuf,

        /// Replace each flagged word with its first suggestion and save
        #[arg(long)]
        fix: bool,
    },
    /// Run a JSON edit script against a letter
    Edit {
        /// Letter HTML file
        path: PathBuf,

        /// Script file: a JSON array of steps
        #[arg(long)]
        script: PathBuf,

        /// Where to save the result (default: overwrite the letter)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Print the effective settings
    Settings,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut manager = match cli.settings {
        Some(path) => SettingsManager::with_path(path),
        None => SettingsManager::new(PathBuf::from(".letter-editor")),
    };
    let settings_path = manager.settings_path().display().to_string();
    let settings = manager
        .load()
        .await
        .with_context(|| format!("failed to load {}", settings_path))?
        .clone();
    tracing::debug!("Settings loaded from {}", settings_path);

    match cli.command {
        Commands::New { path } => commands::new_letter(&path).await?,
        Commands::Endnotes { path } => commands::list_endnotes(&path).await?,
        Commands::Check { path, fix } => commands::check_letter(&path, &settings, fix).await?,
        Commands::Edit {
            path,
            script,
            output,
        } => commands::edit_letter(&path, &script, output.as_deref(), &settings).await?,
        Commands::Settings => println!("{}", serde_json::to_string_pretty(&settings)?),
    }

    Ok(())
}
