use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, CommandFactory, Parser, Subcommand};
use dcasim::core::Frequency;
use dcasim::core::log::init_logging;

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

#[derive(Args)]
struct ScheduleOpts {
    /// Amount spent on each purchase
    #[arg(short, long)]
    amount: Option<f64>,

    /// Purchase frequency: daily, weekly or monthly
    #[arg(short, long)]
    frequency: Option<Frequency>,

    /// First day of the schedule (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last day of the schedule (YYYY-MM-DD), defaults to today
    #[arg(long)]
    end: Option<NaiveDate>,
}

impl From<ScheduleOpts> for dcasim::ScheduleArgs {
    fn from(opts: ScheduleOpts) -> Self {
        dcasim::ScheduleArgs {
            amount: opts.amount,
            frequency: opts.frequency,
            start: opts.start,
            end: opts.end,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Simulate a recurring purchase of one asset
    Simulate {
        /// BTC, Gold, Silver or any ticker symbol
        #[arg(long, default_value = "BTC")]
        asset: String,

        #[command(flatten)]
        schedule: ScheduleOpts,

        /// List every purchase
        #[arg(short, long)]
        transactions: bool,
    },
    /// Run the same schedule against several assets
    Compare {
        /// Asset to include; repeat for more. Defaults to the configured list
        #[arg(long = "asset")]
        assets: Vec<String>,

        #[command(flatten)]
        schedule: ScheduleOpts,
    },
    /// Look up ticker symbols through the relay
    Search { query: String },
    /// Serve the Yahoo Finance relay
    Relay {
        /// Address to listen on, e.g. 127.0.0.1:3001
        #[arg(short, long)]
        listen: Option<String>,
    },
}

impl From<Commands> for dcasim::AppCommand {
    fn from(cmd: Commands) -> dcasim::AppCommand {
        match cmd {
            Commands::Simulate {
                asset,
                schedule,
                transactions,
            } => dcasim::AppCommand::Simulate {
                asset,
                schedule: schedule.into(),
                show_transactions: transactions,
            },
            Commands::Compare { assets, schedule } => dcasim::AppCommand::Compare {
                assets,
                schedule: schedule.into(),
            },
            Commands::Search { query } => dcasim::AppCommand::Search { query },
            Commands::Relay { listen } => dcasim::AppCommand::Relay { listen },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => dcasim::cli::setup::setup_at_path(path),
            None => dcasim::cli::setup::setup(),
        },
        Some(cmd) => dcasim::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
