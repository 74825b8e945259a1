//! Murmur CLI — the main entry point.
//!
//! Commands:
//! - `chat`     — Talk to the assistant in the terminal
//! - `serve`    — Start the browser front-end
//! - `init`     — Write a default config file
//! - `history`  — Inspect or clear the session history

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "murmur",
    about = "Murmur — a local conversational assistant",
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
    /// Chat in the terminal
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Speak replies aloud
        #[arg(short, long)]
        speak: bool,
    },

    /// Start the HTTP front-end
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Write a default configuration file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Inspect or clear the session history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// Print the most recent utterances
    Show {
        /// Number of utterances to print
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Forget the whole conversation
    Clear,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Chat output shares the terminal with logs, so keep it quiet by default.
    let filter = match (&cli.command, cli.verbose) {
        (_, true) => "debug",
        (Commands::Serve { .. }, false) => "info",
        _ => "warn",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Chat { message, speak } => commands::chat::run(message, speak).await?,
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Init { force } => commands::init::run(force)?,
        Commands::History { action } => match action {
            HistoryAction::Show { limit } => commands::history::show(limit)?,
            HistoryAction::Clear => commands::history::clear()?,
        },
    }

    Ok(())
}
