//! Plan advisor - telecom plan recommendations from your plan database

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{ask_command, chat_command, init_command, status_command};

/// Plan advisor - find the right telecom plan
#[derive(Parser)]
#[command(name = "advisor")]
#[command(about = "Telecom plan advisor backed by a hosted model and a plan database")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config and data directories
    Init,
    /// Ask a single question
    Ask {
        /// Question to ask
        #[arg(short, long)]
        message: String,
    },
    /// Chat with the advisor
    Chat {
        /// Session ID to resume or create
        #[arg(short, long)]
        session: Option<String>,
        /// Save the transcript under ~/.advisor/sessions
        #[arg(long)]
        persist: bool,
    },
    /// Show configuration and database status
    Status,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init => {
            if let Err(e) = init_command().await {
                error!("Init failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Commands::Ask { message } => {
            if let Err(e) = ask_command(message).await {
                error!("Error: {:#}", e);
                std::process::exit(1);
            }
        }
        Commands::Chat { session, persist } => {
            if let Err(e) = chat_command(session, persist).await {
                error!("Error: {:#}", e);
                std::process::exit(1);
            }
        }
        Commands::Status => {
            if let Err(e) = status_command().await {
                error!("Status failed: {:#}", e);
                std::process::exit(1);
            }
        }
    }
}
