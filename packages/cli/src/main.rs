#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for classifying sensor readings into districts.
//!
//! With a subcommand the tool runs non-interactively; without one it falls
//! back to a `dialoguer` menu. Log output goes through
//! [`sensor_map_cli_utils::init_logger`] so it never fights the spinner.

mod interactive;
mod pipeline;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sensor_map_cli_utils::{IndicatifProgress, MultiProgress};
use sensor_map_export::{COUNTS_FILE, POINTS_FILE};

use crate::pipeline::{DEFAULT_BOUNDARIES, DEFAULT_READINGS, Inputs};

#[derive(Parser)]
#[command(
    name = "sensor_map",
    about = "Classify sensor readings into districts and export map data"
)]
struct Cli {
    /// District boundaries (`GeoJSON` `FeatureCollection`)
    #[arg(long, global = true, default_value = DEFAULT_BOUNDARIES)]
    boundaries: PathBuf,
    /// Readings table (CSV with one latitude/longitude column pair per source)
    #[arg(long, global = true, default_value = DEFAULT_READINGS)]
    readings: PathBuf,
    /// Sensor source configuration (TOML). Uses the built-in sources if omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Comma-separated list of source IDs to use (overrides `SENSOR_MAP_SOURCES` env var)
    #[arg(long, global = true)]
    sources: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the per-district marker count table
    Counts {
        /// Output CSV path
        #[arg(long, default_value = COUNTS_FILE)]
        out: PathBuf,
    },
    /// Write classified sensor points as `GeoJSON`
    Points {
        /// Output `GeoJSON` path
        #[arg(long, default_value = POINTS_FILE)]
        out: PathBuf,
    },
    /// Write counts, points, district outlines and the map summary
    All {
        /// Output directory
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// List the configured sensor sources
    Sources,
}

fn main() -> ExitCode {
    let multi = sensor_map_cli_utils::init_logger();
    let cli = Cli::parse();

    match run(&multi, cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(multi: &MultiProgress, cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let inputs = Inputs {
        boundaries: cli.boundaries,
        readings: cli.readings,
        config: cli.config,
        sources: cli.sources,
    };

    let Some(command) = cli.command else {
        return interactive::run(multi, inputs);
    };

    match command {
        Commands::Sources => pipeline::print_sources(&pipeline::load_config(&inputs)?),
        Commands::Counts { out } => {
            let classified = classify(multi, &inputs)?;
            pipeline::write_counts(&classified, &out)?;
            pipeline::print_report(&classified);
        }
        Commands::Points { out } => {
            let classified = classify(multi, &inputs)?;
            pipeline::write_points(&classified, &out)?;
            pipeline::print_report(&classified);
        }
        Commands::All { out_dir } => {
            let classified = classify(multi, &inputs)?;
            for path in pipeline::write_all(&classified, &out_dir)? {
                log::info!("Wrote {}", path.display());
            }
            pipeline::print_report(&classified);
        }
    }

    Ok(())
}

fn classify(
    multi: &MultiProgress,
    inputs: &Inputs,
) -> Result<pipeline::Classified, Box<dyn std::error::Error>> {
    let progress = IndicatifProgress::readings_spinner(multi, "Classifying sensor readings");
    pipeline::classify(inputs, &progress)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_surface_their_message() {
        let cli = Cli::try_parse_from([
            "sensor_map",
            "--boundaries",
            "no/such/districts.geojson",
            "counts",
            "--out",
            "no/such/out.csv",
        ])
        .unwrap();

        let err = run(&MultiProgress::new(), cli).unwrap_err();
        assert!(
            err.to_string()
                .starts_with("Failed to read boundary file no/such/districts.geojson"),
            "{err}"
        );
        assert!(!std::path::Path::new("no/such/out.csv").exists());
    }
}
