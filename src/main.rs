use clap::{Parser, Subcommand, builder::styling};
use eyre::Result;
use owo_colors::OwoColorize;
use warehouse_etl::cli::{self, HandlerResponse};

// CLI Styling
const STYLES: styling::Styles = styling::Styles::styled()
    .header(styling::AnsiColor::BrightWhite.on_default())
    .usage(styling::AnsiColor::BrightWhite.on_default())
    .literal(styling::AnsiColor::Green.on_default())
    .placeholder(styling::AnsiColor::Cyan.on_default());

/// Warehouse ETL: ingest the operational database, reshape it into a star schema and load the warehouse
#[derive(Parser)]
#[command(name = "wetl", version, styles = STYLES)]
struct Cli {
    /// The dotenv file to source credentials from, if it exists
    #[arg(short, long, global = true, default_value = ".env")]
    env: String,

    /// More verbose logging
    #[arg(long, global = true)]
    debug: bool,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract rows changed since the last run into the ingest bucket
    Ingest {
        /// Source table to ingest; repeat for several. Defaults to all eleven
        #[arg(short, long)]
        table: Vec<String>,
    },

    /// Build the star schema from the latest ingested snapshots
    Transform,

    /// Load the latest star-schema tables into the warehouse
    Load,

    /// Delete every warehouse row except the date dimension
    Reset,

    /// Ingest, transform and load in one go
    Run {
        /// Source table to ingest; repeat for several. Defaults to all eleven
        #[arg(short, long)]
        table: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let dotenv = dotenvy::from_filename(&cli.env);

    let log_level = match cli.debug {
        true => "debug",
        false => "info",
    };
    let env = env_logger::Env::default().filter_or("LOG_LEVEL", log_level);
    env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .init();

    match dotenv {
        Ok(path) => log::debug!("Sourced {}", path.display().bright_black()),
        Err(e) if e.not_found() => log::debug!("No dotenv file at {}", cli.env.bright_black()),
        Err(e) => log::warn!("Ignoring dotenv file {}: {}", cli.env.bright_black(), e),
    }

    let response: HandlerResponse = match cli.command {
        Commands::Ingest { table } => {
            log::info!("Running {} stage", "ingest".cyan());
            cli::ingest(&table).await
        }
        Commands::Transform => {
            log::info!("Running {} stage", "transform".cyan());
            cli::transform().await
        }
        Commands::Load => {
            log::info!("Running {} stage", "load".cyan());
            cli::load().await
        }
        Commands::Reset => {
            log::info!("Resetting the warehouse");
            cli::reset().await
        }
        Commands::Run { table } => {
            log::info!("Running {}", "ingest → transform → load".cyan());
            cli::run(&table).await
        }
    };

    println!("{}", serde_json::to_string_pretty(&response)?);

    if !response.is_success() {
        log::error!("Finished with status {}", response.status_code.red());
        std::process::exit(1);
    }
    Ok(())
}
