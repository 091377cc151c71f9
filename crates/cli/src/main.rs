//! Switchyard CLI: the main entry point.
//!
//! Commands:
//! - `onboard`   : Write the default config and profiles directory
//! - `status`    : Show configuration and registry status
//! - `profiles`  : List, show or validate profile documents
//! - `route`     : Classify, resolve and compose one request
//! - `serve`     : Start the HTTP gateway

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "switchyard",
    about = "Switchyard: route tasks to specialist profiles and compose their guidance",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration and the profiles directory
    Onboard,

    /// Show configuration and registry status
    Status,

    /// Inspect the profile registry
    Profiles {
        #[command(subcommand)]
        action: ProfilesAction,
    },

    /// Route a task description through the pipeline and print the result
    Route {
        /// Free-form task description
        description: String,

        /// Domain tag or profile id to force (repeatable)
        #[arg(long = "hint")]
        hints: Vec<String>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[derive(Subcommand)]
enum ProfilesAction {
    /// List registered profiles in registry order
    List,

    /// Show one profile as TOML
    Show { id: String },

    /// Validate a profile document (.toml or .json)
    Validate { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Status => commands::status::run().await?,
        Commands::Profiles { action } => match action {
            ProfilesAction::List => commands::profiles::list().await?,
            ProfilesAction::Show { id } => commands::profiles::show(&id).await?,
            ProfilesAction::Validate { file } => commands::profiles::validate(&file).await?,
        },
        Commands::Route {
            description,
            hints,
            json,
        } => commands::route::run(description, hints, json).await?,
        Commands::Serve { port } => commands::serve::run(port).await?,
    }

    Ok(())
}
