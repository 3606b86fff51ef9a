use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fxconv::core::log::init_logging;

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

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// List all exchange rates
    Rates {
        /// Currency the rates are quoted against
        #[arg(short, long, default_value = "USD")]
        base: String,
    },
    /// Convert an amount between two currencies
    Convert {
        /// Amount to convert
        #[arg(default_value_t = 1.0, allow_negative_numbers = true)]
        amount: f64,
        /// Source currency code, defaults to the last used
        #[arg(short, long)]
        from: Option<String>,
        /// Target currency code, defaults to the last used
        #[arg(short, long)]
        to: Option<String>,
        /// Treat the amount as the target currency and solve for the source
        #[arg(short, long)]
        reverse: bool,
    },
    /// Print the exchange rate on every scheduled refresh
    Watch {
        /// Source currency code, defaults to the last used
        #[arg(short, long)]
        from: Option<String>,
        /// Target currency code, defaults to the last used
        #[arg(short, long)]
        to: Option<String>,
    },
}

impl From<Commands> for fxconv::AppCommand {
    fn from(cmd: Commands) -> fxconv::AppCommand {
        match cmd {
            Commands::Rates { base } => fxconv::AppCommand::Rates { base },
            Commands::Convert {
                amount,
                from,
                to,
                reverse,
            } => fxconv::AppCommand::Convert {
                amount,
                from,
                to,
                reverse,
            },
            Commands::Watch { from, to } => fxconv::AppCommand::Watch { from, to },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => fxconv::cli::setup::setup(),
        Some(cmd) => fxconv::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
