//! careerswarm CLI, the main entry point.
//!
//! Commands:
//! - `onboard`   Write a default config file
//! - `run`       Run the agent swarm for one user and one week
//! - `show`      Print a user's swarm state
//! - `toggle`    Flip a task between pending and completed
//! - `reset`     Return a user to the uninitialized state
//! - `generate`  One-off text, JSON, or streamed generation
//! - `serve`     Start the HTTP gateway
//! - `doctor`    Diagnose configuration and connectivity

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "careerswarm",
    about = "careerswarm: a swarm of career agents that plans your job search week by week",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Read configuration from this file instead of ~/.careerswarm/config.toml
    #[arg(long, global = true, env = "CAREERSWARM_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Onboard,

    /// Run the swarm for one week and persist the result
    Run {
        /// User id the state is stored under
        #[arg(short, long)]
        user: String,

        /// Path to the user's profile JSON
        #[arg(short, long)]
        profile: PathBuf,
    },

    /// Show the user's current swarm state
    Show {
        #[arg(short, long)]
        user: String,

        /// Print the raw state document
        #[arg(long)]
        json: bool,
    },

    /// Toggle a task in the current weekly plan
    Toggle {
        #[arg(short, long)]
        user: String,

        /// Task id, e.g. week-2-task-1
        #[arg(short, long)]
        task: String,
    },

    /// Delete the user's swarm state
    Reset {
        #[arg(short, long)]
        user: String,
    },

    /// Send one prompt to the generative endpoint
    Generate {
        #[arg(short, long)]
        prompt: String,

        /// Parse the reply as JSON
        #[arg(long, conflicts_with = "stream")]
        json: bool,

        /// Print chunks as they arrive
        #[arg(long)]
        stream: bool,

        /// Override the configured model
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Diagnose configuration, store, and endpoint health
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Onboard => commands::onboard::run(config_path).await?,
        Commands::Run { user, profile } => {
            commands::run::run(config_path, &user, &profile).await?
        }
        Commands::Show { user, json } => commands::show::run(config_path, &user, json).await?,
        Commands::Toggle { user, task } => {
            commands::toggle::run(config_path, &user, &task).await?
        }
        Commands::Reset { user } => commands::reset::run(config_path, &user).await?,
        Commands::Generate {
            prompt,
            json,
            stream,
            model,
        } => commands::generate::run(config_path, &prompt, json, stream, model).await?,
        Commands::Serve { port } => commands::serve::run(config_path, port).await?,
        Commands::Doctor => commands::doctor::run(config_path).await?,
    }

    Ok(())
}
