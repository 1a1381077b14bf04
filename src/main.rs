use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use convkit::core::log::init_logging;

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

impl From<Commands> for convkit::AppCommand {
    fn from(cmd: Commands) -> convkit::AppCommand {
        match cmd {
            Commands::Convert {
                category,
                from,
                to,
                amount,
            } => convkit::AppCommand::Convert {
                category,
                from,
                to,
                amount,
            },
            Commands::List { category } => convkit::AppCommand::List { category },
            Commands::Matrix { category } => convkit::AppCommand::Matrix { category },
            Commands::Rates => convkit::AppCommand::Rates,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Convert an amount between two units of a category
    Convert {
        /// Category id, e.g. length or currency
        category: String,
        /// Unit to convert from
        from: String,
        /// Unit to convert to
        to: String,
        /// Amount to convert
        #[arg(allow_hyphen_values = true)]
        amount: String,
    },
    /// List categories, or the units of one category
    List {
        /// Category id
        category: Option<String>,
    },
    /// Print every from/to conversion path of a category
    Matrix {
        /// Category id
        category: String,
    },
    /// Refresh and display currency exchange rates
    Rates,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => convkit::cli::setup::setup(),
        Some(cmd) => convkit::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
