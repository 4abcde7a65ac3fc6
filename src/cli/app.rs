//! Main CLI application structure

use clap::{Parser, Subcommand};
use anyhow::Result;

use super::output::{Output, OutputFormat};
use super::{batch, query, recipe, vessel};
use crate::storage::{Config, Project};

#[derive(Parser)]
#[command(name = "stillroom")]
#[command(author, version, about = "Local-first production tracking for craft distilleries")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config setting)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new stillroom project
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,
    },

    /// Manage vessels (mash tuns, fermenters, stills, tanks, barrels)
    #[command(subcommand)]
    Vessel(vessel::VesselCommands),

    /// Manage production batches
    #[command(subcommand)]
    Batch(batch::BatchCommands),

    /// Manage recipes
    #[command(subcommand)]
    Recipe(recipe::RecipeCommands),

    /// Show distillery status overview
    Status,

    /// Show spirits on hand (wine and proof gallons per vessel)
    Report,
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // --format wins; otherwise fall back to the global config default
    let format = cli.format.unwrap_or_else(|| {
        Config::load()
            .map(|c| c.global.default_format.into())
            .unwrap_or_default()
    });
    let output = Output::new(format, cli.verbose);

    output.verbose("Stillroom starting");

    match cli.command {
        Commands::Init { path } => {
            output.verbose_ctx("init", &format!("Initializing project at: {}", path));
            let project = Project::init(&path)?;
            output.verbose_ctx(
                "init",
                &format!("Created .stillroom directory at: {}", project.stillroom_dir().display()),
            );
            output.success(&format!(
                "Initialized stillroom project at {}",
                project.root().display()
            ));
        }

        Commands::Vessel(cmd) => vessel::run(cmd, &output)?,
        Commands::Batch(cmd) => batch::run(cmd, &output)?,
        Commands::Recipe(cmd) => recipe::run(cmd, &output)?,

        Commands::Status => {
            output.verbose("Gathering distillery status");
            query::status(&output)?
        }
        Commands::Report => {
            output.verbose("Building spirits-on-hand report");
            query::report(&output)?
        }
    }

    output.verbose("Command completed successfully");
    Ok(())
}
