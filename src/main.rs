use clap::{Parser, Subcommand};
use log_groups::config::resolve_config_path;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "log-groups")]
#[command(about = "Request-grouped log shipping demo service", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the demo web app, shipping request and application logs
    Run,
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a starter config to the default location
    Init {
        /// Print the config instead of writing it
        #[arg(long)]
        stdout: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run) | None => {
            // Default behavior is to run
            let config_path = resolve_config_path(cli.config.as_deref());
            log_groups::cli::run::run(config_path)?;
        }
        Some(Commands::Config { action }) => match action {
            ConfigAction::Init { stdout } => {
                log_groups::cli::config::init(stdout)?;
            }
        },
    }

    Ok(())
}
