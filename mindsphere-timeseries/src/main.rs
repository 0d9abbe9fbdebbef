use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use mindsphere_core::{codec, time::Timestamp};
use mindsphere_timeseries::{ClientConfig, TimeSeriesService};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// MindSphere time-series CLI
#[derive(Parser)]
#[command(name = "mindsphere-ts")]
#[command(about = "Read, write and delete MindSphere aspect time-series")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (YAML); defaults to CONFIG_PATH or config/mindsphere.yaml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct Target {
    /// Tenant whose token is used
    #[arg(long)]
    tenant: String,

    /// Asset identifier
    #[arg(long)]
    asset: String,

    /// Aspect name
    #[arg(long)]
    aspect: String,
}

#[derive(Args)]
struct Range {
    /// Range start, RFC 3339 or epoch milliseconds
    #[arg(long, value_parser = parse_time)]
    from: i64,

    /// Range end, RFC 3339 or epoch milliseconds
    #[arg(long, value_parser = parse_time)]
    to: i64,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the latest value of every variable
    Last {
        #[command(flatten)]
        target: Target,
    },

    /// Print all values in a time range
    Get {
        #[command(flatten)]
        target: Target,

        #[command(flatten)]
        range: Range,
    },

    /// Write values from a JSON file of wire rows
    Put {
        #[command(flatten)]
        target: Target,

        /// File holding a row object or an array of rows
        #[arg(long)]
        file: PathBuf,
    },

    /// Delete all values in a time range
    Delete {
        #[command(flatten)]
        target: Target,

        #[command(flatten)]
        range: Range,
    },
}

fn parse_time(s: &str) -> Result<i64, String> {
    Timestamp::parse_arg(s)
        .map(|ts| ts.timestamp_millis())
        .map_err(|e| e.to_string())
}

fn default_log_directive(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging, RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_directive(cli.verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_ref().map(|p| p.to_string_lossy().into_owned());
    let config = match config_path {
        Some(path) => ClientConfig::load_with(Some(&path))?,
        None => ClientConfig::load()?,
    };
    info!("Loaded configuration: {:?}", config);

    let service = TimeSeriesService::from_config(&config)?;

    match cli.command {
        Commands::Last { target } => {
            let data = service
                .get_last_values(&target.tenant, &target.asset, &target.aspect)
                .await?;
            print_json(&data)?;
        }
        Commands::Get { target, range } => {
            let data = service
                .get_values(
                    &target.tenant,
                    &target.asset,
                    &target.aspect,
                    range.from,
                    range.to,
                )
                .await?;
            print_json(&data)?;
        }
        Commands::Put { target, file } => {
            let contents = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let rows: serde_json::Value = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", file.display()))?;
            let data = codec::decode(&rows);

            service
                .set_values(&target.tenant, &target.asset, &target.aspect, &data)
                .await?;
            info!(points = data.point_count(), "Write complete");
        }
        Commands::Delete { target, range } => {
            service
                .delete_values(
                    &target.tenant,
                    &target.asset,
                    &target.aspect,
                    range.from,
                    range.to,
                )
                .await?;
        }
    }

    info!("Requests: {:?}", service.stats());
    Ok(())
}
