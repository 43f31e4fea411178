//! fil-terminator - Filecoin sector termination fee calculator
//!
//! Usage:
//!   fil-terminator calculate --miner f01234 --all --epoch 4500000
//!   fil-terminator batch --input miners.csv --output fees.csv
//!   fil-terminator strategy --input miners.csv --epoch 4500000 --threshold 7
//!   fil-terminator tools epoch-to-time --epoch 4500000 --timezone utc

mod commands;
mod config;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::Level;

#[derive(Parser)]
#[command(name = "fil-terminator")]
#[command(about = "Filecoin miner sector termination fee calculation tool", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging and per-sector output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Lotus API URL (overrides FULLNODE_API_INFO and the config file)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Calculate termination fees for one miner
    #[command(alias = "calc")]
    Calculate {
        /// Miner address
        #[arg(short, long)]
        miner: String,

        /// Sector numbers, comma separated (e.g. 1,2,3 or 1-10)
        #[arg(short, long, conflicts_with = "all")]
        sectors: Option<String>,

        /// Calculate all sectors
        #[arg(short, long)]
        all: bool,

        /// Target epoch, current height if not specified
        #[arg(short, long, default_value_t = 0)]
        epoch: i64,
    },

    /// Calculate termination fees for every miner in a CSV file
    Batch {
        /// Input CSV file (format: minerid,epoch)
        #[arg(short, long)]
        input: String,

        /// Output CSV file, print to terminal if not specified
        #[arg(short, long)]
        output: Option<String>,

        /// Number of concurrent workers
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Choose terminate or expire per sector to minimise total cost
    Strategy {
        /// CSV file with a minerid column, or a single miner ID
        #[arg(short, long)]
        input: String,

        /// Termination epoch for all miners
        #[arg(short, long, alias = "termination-epoch")]
        epoch: i64,

        /// Sectors expiring within this many days are left to expire (0 = terminate all)
        #[arg(short, long, alias = "expiration-threshold")]
        threshold: Option<u32>,

        /// Number of concurrent workers
        #[arg(short, long)]
        workers: Option<usize>,

        /// Output CSV file, print to terminal if not specified
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Epoch and time conversion, sector expiration statistics
    Tools {
        #[command(subcommand)]
        action: ToolsAction,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ToolsAction {
    /// Convert epoch to time
    #[command(alias = "e2t")]
    EpochToTime {
        /// Epoch number to convert
        #[arg(short, long)]
        epoch: i64,

        /// Output timezone: local, utc or a fixed offset such as +08:00
        #[arg(long, alias = "tz", default_value = "local")]
        timezone: String,

        /// Use the mainnet genesis time instead of asking the node
        #[arg(long)]
        offline: bool,
    },

    /// Convert time to epoch
    #[command(alias = "t2e")]
    TimeToEpoch {
        /// Time to convert (e.g. '2024-01-01 12:00:00')
        #[arg(short, long)]
        time: String,

        /// Use the mainnet genesis time instead of asking the node
        #[arg(long)]
        offline: bool,
    },

    /// Sector expiration distribution
    #[command(alias = "exp")]
    SectorExpiration {
        /// Single miner address
        #[arg(short, long, conflicts_with_all = ["miners", "file"])]
        miner: Option<String>,

        /// Comma-separated list of miner addresses
        #[arg(long, conflicts_with = "file")]
        miners: Option<String>,

        /// File with miner addresses (one per line, or CSV with a minerid/miner column)
        #[arg(short, long)]
        file: Option<String>,

        /// Reference epoch, current height if not specified
        #[arg(long, default_value_t = 0)]
        epoch: i64,

        /// Output CSV file
        #[arg(short, long)]
        output: Option<String>,

        /// Number of concurrent workers
        #[arg(short, long)]
        workers: Option<usize>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Initialize configuration
    Init {
        /// Config file path
        #[arg(long)]
        path: Option<String>,
    },

    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        key: ConfigKey,
        value: String,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
#[value(rename_all = "snake_case")]
enum ConfigKey {
    ApiUrl,
    ApiToken,
    Workers,
    ExpirationThresholdDays,
    OfflineGenesis,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    let Cli { verbose, config: config_path, api_url, command } = cli;
    let context = || -> anyhow::Result<commands::Context> {
        Ok(commands::Context {
            config: config::Config::load_or_default(config_path.as_deref())?,
            api_url: api_url.clone(),
            verbose,
        })
    };

    // Execute command
    match command {
        Commands::Calculate { miner, sectors, all, epoch } => {
            commands::calculate::handle(&context()?, miner, sectors, all, epoch).await?;
        }
        Commands::Batch { input, output, workers } => {
            commands::batch::handle(&context()?, input, output, workers).await?;
        }
        Commands::Strategy { input, epoch, threshold, workers, output } => {
            commands::strategy::handle(&context()?, input, epoch, threshold, workers, output)
                .await?;
        }
        Commands::Tools { action } => {
            commands::tools::handle(action, &context()?).await?;
        }
        Commands::Config { action } => {
            commands::config::handle(action, config_path.as_deref()).await?;
        }
    }

    Ok(())
}
