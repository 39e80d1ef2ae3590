use anyhow::{Context, Result};
use chrono::Duration;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::sync::Arc;
use tits_core::{
    multi_current_measurements, ExtremumOptions, Granularity, Measurement, MeasurementRepository,
    NearestOptions, RangeOptions, ResourceId, ResourceSelection, StoreContext, Timestamp,
};
use tracing::{info, Level};

/// TITS measurement CLI
#[derive(Parser)]
#[command(name = "titsctl")]
#[command(about = "Write and query resource measurements stored in InfluxDB")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a measurement
    Add {
        id: ResourceId,
        value: f64,

        /// Time of the measurement (RFC 3339), defaults to now
        #[arg(long, value_parser = parse_timestamp)]
        at: Option<Timestamp>,
    },

    /// Most recent measurement of a resource
    Current { id: ResourceId },

    /// Measurement closest to a point in time
    At {
        id: ResourceId,

        #[arg(value_parser = parse_timestamp)]
        time: Timestamp,

        /// Accepted distance from TIME in seconds
        #[arg(long, default_value_t = tits_core::query::DEFAULT_TOLERANCE_SECS)]
        tolerance_secs: i64,
    },

    /// Bucketed means from a point in time until now
    Since {
        id: ResourceId,

        #[arg(value_parser = parse_timestamp)]
        start: Timestamp,

        /// Bucket width in seconds, one hour if omitted
        #[arg(long, value_parser = parse_granularity)]
        granularity_secs: Option<Granularity>,
    },

    /// Bucketed means over a time range
    Range {
        id: ResourceId,

        #[command(flatten)]
        bounds: Bounds,

        /// Bucket width in seconds
        #[arg(long, value_parser = parse_granularity, default_value = "3600")]
        granularity_secs: Granularity,
    },

    /// Largest value in a time range
    Max {
        id: ResourceId,

        #[command(flatten)]
        bounds: Bounds,
    },

    /// Smallest value in a time range
    Min {
        id: ResourceId,

        #[command(flatten)]
        bounds: Bounds,
    },

    /// Average value in a time range
    Avg {
        id: ResourceId,

        #[command(flatten)]
        bounds: Bounds,
    },

    /// Most recent measurement of several resources, or of all of them
    Latest { ids: Vec<ResourceId> },

    /// Delete every measurement of a resource
    DeleteSeries { id: ResourceId },

    /// Delete the whole database
    DropDatabase {
        /// Required, the database is gone afterwards
        #[arg(long)]
        yes: bool,
    },
}

#[derive(clap::Args)]
struct Bounds {
    /// Range start (RFC 3339), defaults to the epoch
    #[arg(long, value_parser = parse_timestamp)]
    start: Option<Timestamp>,

    /// Range end (RFC 3339), defaults to now
    #[arg(long, value_parser = parse_timestamp)]
    end: Option<Timestamp>,
}

impl From<Bounds> for ExtremumOptions {
    fn from(bounds: Bounds) -> Self {
        ExtremumOptions {
            start: bounds.start,
            end: bounds.end,
        }
    }
}

fn parse_timestamp(s: &str) -> Result<Timestamp, String> {
    Timestamp::from_rfc3339(s).map_err(|e| e.to_string())
}

fn parse_granularity(s: &str) -> Result<Granularity, String> {
    let secs = s
        .parse::<u64>()
        .map_err(|_| format!("Invalid granularity: {}", s))?;
    Granularity::from_secs(secs).map_err(|e| e.to_string())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

fn print_all(measurements: Option<Vec<Measurement>>) -> Result<()> {
    match measurements {
        Some(measurements) => measurements.iter().try_for_each(print_json),
        None => print_json(&Option::<Measurement>::None),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let context = Arc::new(StoreContext::from_env().context("Failed to set up store context")?);
    let result = run(cli.command, context.clone()).await;
    context.shutdown();
    result
}

async fn run(command: Commands, context: Arc<StoreContext>) -> Result<()> {
    let repository = |id: ResourceId| MeasurementRepository::new(context.clone(), id);

    match command {
        Commands::Add { id, value, at } => {
            let time = at.unwrap_or_else(Timestamp::now);
            repository(id.clone()).add_measurement_at(value, time).await?;
            print_json(&Measurement::new(id, value, time))?;
        }
        Commands::Current { id } => {
            print_json(&repository(id).current_measurement().await?)?;
        }
        Commands::At {
            id,
            time,
            tolerance_secs,
        } => {
            let options =
                NearestOptions::default().with_tolerance(Duration::seconds(tolerance_secs));
            print_json(&repository(id).measurement_with(time, options).await?)?;
        }
        Commands::Since {
            id,
            start,
            granularity_secs,
        } => {
            print_all(repository(id).measurements_since(start, granularity_secs).await?)?;
        }
        Commands::Range {
            id,
            bounds,
            granularity_secs,
        } => {
            let mut options = RangeOptions::default().granularity(granularity_secs);
            options.start = bounds.start;
            options.end = bounds.end;
            print_all(repository(id).measurements(options).await?)?;
        }
        Commands::Max { id, bounds } => {
            print_json(&repository(id).max_measurement(bounds.into()).await?)?;
        }
        Commands::Min { id, bounds } => {
            print_json(&repository(id).min_measurement(bounds.into()).await?)?;
        }
        Commands::Avg { id, bounds } => {
            print_json(&repository(id).avg_measurement(bounds.into()).await?)?;
        }
        Commands::Latest { ids } => {
            let selection = if ids.is_empty() {
                ResourceSelection::All
            } else {
                ResourceSelection::Only(ids)
            };
            for measurement in multi_current_measurements(&context, selection).await? {
                print_json(&measurement)?;
            }
        }
        Commands::DeleteSeries { id } => {
            context.delete_series(&id).await?;
            info!("Deleted series of resource {}", id);
        }
        Commands::DropDatabase { yes } => {
            if !yes {
                anyhow::bail!("Refusing to drop the database without --yes");
            }
            context.drop_database().await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_range_command() {
        let cli = Cli::parse_from([
            "titsctl",
            "range",
            "42",
            "--start",
            "2002-10-31T00:00:00Z",
            "--granularity-secs",
            "900",
        ]);

        match cli.command {
            Commands::Range {
                id,
                bounds,
                granularity_secs,
            } => {
                assert_eq!(id.as_str(), "42");
                assert_eq!(bounds.start.map(|t| t.timestamp()), Some(1_036_022_400));
                assert!(bounds.end.is_none());
                assert_eq!(granularity_secs.as_secs(), 900);
            }
            _ => panic!("Expected range command"),
        }
    }

    #[test]
    fn test_rejects_zero_granularity_and_bad_ids() {
        assert!(Cli::try_parse_from([
            "titsctl",
            "since",
            "1",
            "2002-10-31T00:00:00Z",
            "--granularity-secs",
            "0",
        ])
        .is_err());
        assert!(Cli::try_parse_from(["titsctl", "current", "1;drop"]).is_err());
    }
}
