//! CLI interface for saba

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::agent::interactive::{run_console, ConsoleOptions};
use crate::config::Config;

#[derive(Parser)]
#[command(name = "saba")]
#[command(about = "Personal desktop assistant backed by a local chat model", long_about = None)]
#[command(version)]
struct Cli {
    /// Start with voice mode on (when no command is given)
    #[arg(short, long)]
    voice: bool,

    /// Do not listen for the global hotkey (when no command is given)
    #[arg(long)]
    no_hotkey: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the console assistant (default)
    Chat {
        /// Start with voice mode on
        #[arg(short, long)]
        voice: bool,
        /// Do not listen for the global hotkey
        #[arg(long)]
        no_hotkey: bool,
    },
    /// Start the browser backend
    Serve {
        /// Host to bind to (default: HOST or 0.0.0.0)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (default: PORT or 5000)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Ask one question and print the answer
    Ask {
        /// The question
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },
    /// Show the effective configuration
    Config,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    // Default to the console assistant if no command given
    match cli.command {
        None => {
            run_console(config, ConsoleOptions { voice: cli.voice, no_hotkey: cli.no_hotkey }).await?;
        }
        Some(Commands::Chat { voice, no_hotkey }) => {
            run_console(config, ConsoleOptions { voice, no_hotkey }).await?;
        }
        Some(Commands::Serve { host, port }) => {
            crate::server::start(&config, host, port).await?;
        }
        Some(Commands::Ask { message }) => {
            crate::agent::ask_once(&config, &message.join(" ")).await?;
        }
        Some(Commands::Config) => {
            crate::config::show_config(&config)?;
        }
    }

    Ok(())
}
