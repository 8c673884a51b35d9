use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use coinwatch::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for coinwatch::AppCommand {
    fn from(cmd: Commands) -> coinwatch::AppCommand {
        match cmd {
            Commands::Watch => coinwatch::AppCommand::Watch,
            Commands::Once => coinwatch::AppCommand::Once,
            Commands::History { asset } => coinwatch::AppCommand::History(asset),
            Commands::Compare => coinwatch::AppCommand::Compare,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Live dashboard, refreshed on a timer and on demand
    Watch,
    /// Fetch every price once and show the dashboard
    Once,
    /// Show stored price history with statistics and advice
    History {
        /// Asset id or symbol, e.g. bitcoin or BTC
        asset: Option<String>,
    },
    /// Show the asset with the highest latest price
    Compare,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => coinwatch::cli::setup::setup(),
        Some(cmd) => coinwatch::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
