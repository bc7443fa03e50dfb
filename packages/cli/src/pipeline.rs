//! Load, classify and export steps shared by the subcommands and the
//! interactive menu.
//!
//! Every export runs only after the whole classification pass succeeded,
//! so a failed pass never leaves partial output behind.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use sensor_map_export::{
    COUNTS_FILE, DISTRICTS_FILE, POINTS_FILE, SUMMARY_FILE, counts, create_output, features,
    summary::{self, MapSummary},
};
use sensor_map_ingest::progress::ProgressCallback;
use sensor_map_ingest::{PassResult, classify_file, registry};
use sensor_map_sensor_models::SensorConfig;
use sensor_map_spatial::BoundaryStore;

/// Boundary file read when none is given.
pub const DEFAULT_BOUNDARIES: &str = "up_districts.geojson";

/// Readings table read when none is given.
pub const DEFAULT_READINGS: &str = "data.csv";

/// Input locations and source selection for one run.
#[derive(Debug, Clone)]
pub struct Inputs {
    /// District boundaries `GeoJSON`.
    pub boundaries: PathBuf,
    /// Readings CSV.
    pub readings: PathBuf,
    /// Optional TOML replacing the built-in sources.
    pub config: Option<PathBuf>,
    /// Comma-separated source ids; overrides `SENSOR_MAP_SOURCES`.
    pub sources: Option<String>,
}

/// A finished pass together with what produced it.
pub struct Classified {
    /// Configuration after the source filter.
    pub config: SensorConfig,
    /// Boundaries the readings were classified against.
    pub store: BoundaryStore,
    /// Aggregate and pass counters.
    pub result: PassResult,
}

/// Loads the sensor configuration and applies the source filter.
///
/// # Errors
///
/// Returns an error if the config file cannot be read or parsed, or if the
/// filtered configuration is invalid.
pub fn load_config(inputs: &Inputs) -> Result<SensorConfig, Box<dyn std::error::Error>> {
    let config = registry::load_config(inputs.config.as_deref())?;
    let config = registry::enabled_sources(config, inputs.sources.clone());
    config.validate()?;
    Ok(config)
}

/// Loads boundaries and runs one classification pass over the readings.
///
/// # Errors
///
/// Returns an error if the configuration, the boundary file or the
/// readings table cannot be loaded, or if the pass aborts.
pub fn classify(
    inputs: &Inputs,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<Classified, Box<dyn std::error::Error>> {
    let start = Instant::now();

    let config = load_config(inputs)?;
    let store = BoundaryStore::load(&inputs.boundaries, &config.name_attributes)?;
    let result = classify_file(&store, &inputs.readings, &config.sources, progress)?;

    log::info!(
        "Classified {} readings in {:.2}s",
        result.stats.events,
        start.elapsed().as_secs_f64()
    );

    Ok(Classified {
        config,
        store,
        result,
    })
}

/// Writes the per-district count table to `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_counts(classified: &Classified, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    counts::write_counts_csv(
        create_output(path)?,
        &classified.result.aggregate,
        &classified.config.sources,
    )?;
    log::info!("Counts written to {}", path.display());
    Ok(())
}

/// Writes the classified points collection to `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_points(classified: &Classified, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let collection = features::points_feature_collection(
        &classified.result.aggregate,
        &classified.config.sources,
    );
    features::write_feature_collection(create_output(path)?, &collection)?;
    log::info!("Points written to {}", path.display());
    Ok(())
}

/// Writes every export into `out_dir` under its default file name and
/// returns the paths written.
///
/// # Errors
///
/// Returns an error if any file cannot be written.
pub fn write_all(
    classified: &Classified,
    out_dir: &Path,
) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let counts_path = out_dir.join(COUNTS_FILE);
    write_counts(classified, &counts_path)?;

    let points_path = out_dir.join(POINTS_FILE);
    write_points(classified, &points_path)?;

    let districts_path = out_dir.join(DISTRICTS_FILE);
    let districts = features::districts_feature_collection(&classified.store);
    features::write_feature_collection(create_output(&districts_path)?, &districts)?;

    let summary_path = out_dir.join(SUMMARY_FILE);
    let map_summary = MapSummary::new(
        &classified.store,
        &classified.result.aggregate,
        &classified.config.sources,
    );
    summary::write_summary(create_output(&summary_path)?, &map_summary)?;

    Ok(vec![counts_path, points_path, districts_path, summary_path])
}

/// Prints the pass counters and the districts holding sensors.
pub fn print_report(classified: &Classified) {
    let stats = &classified.result.stats;
    let aggregate = &classified.result.aggregate;

    println!(
        "{} rows, {} readings: {} in a district, {} outside, {} invalid",
        stats.rows, stats.events, stats.classified, stats.out_of_region, stats.invalid
    );
    for source in &classified.config.sources {
        println!(
            "  {:<12} {}",
            source.label,
            aggregate.total_for_source(&source.id)
        );
    }

    let active = aggregate.active_regions();
    println!("{} districts with sensors:", active.len());
    for name in active {
        println!("  {name}");
    }
}

/// Prints the configured sources as a table.
pub fn print_sources(config: &SensorConfig) {
    println!("{:<12} {:<12} {:<10} {:<10} COLOR", "ID", "LABEL", "LAT", "LON");
    println!("{}", "-".repeat(56));
    for source in &config.sources {
        println!(
            "{:<12} {:<12} {:<10} {:<10} {}",
            source.id,
            source.label,
            source.latitude_column,
            source.longitude_column,
            source.color
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensor_map_ingest::progress::null_progress;

    const DISTRICTS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "district": "LUCKNOW" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[80.5, 26.5], [81.2, 26.5], [81.2, 27.1], [80.5, 27.1], [80.5, 26.5]]]
                }
            }
        ]
    }"#;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "sensor_map_cli_{name}_{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn inputs(dir: &Path, readings: &str) -> Inputs {
        let boundaries = dir.join("districts.geojson");
        std::fs::write(&boundaries, DISTRICTS).unwrap();
        let readings_path = dir.join("data.csv");
        std::fs::write(&readings_path, readings).unwrap();

        Inputs {
            boundaries,
            readings: readings_path,
            config: None,
            sources: None,
        }
    }

    #[test]
    fn write_all_produces_every_export() {
        let dir = scratch_dir("all");
        let inputs = inputs(&dir, "Lat1,Long1,Lat2,Long2\n26.85,80.95,26.9,81.0\n");

        let classified = classify(&inputs, &null_progress()).unwrap();
        let out_dir = dir.join("out");
        let written = write_all(&classified, &out_dir).unwrap();

        assert_eq!(written.len(), 4);
        assert!(written.iter().all(|p| p.exists()));
        let counts = std::fs::read_to_string(out_dir.join(COUNTS_FILE)).unwrap();
        assert_eq!(counts, "District,IMD,Rahat,Total\nLucknow,1,1,2\n");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn source_filter_limits_columns() {
        let dir = scratch_dir("filter");
        let mut inputs = inputs(&dir, "Lat1,Long1\n26.85,80.95\n");
        inputs.sources = Some("imd".to_string());

        let classified = classify(&inputs, &null_progress()).unwrap();
        assert_eq!(classified.config.source_ids(), vec!["imd"]);
        assert_eq!(classified.result.aggregate.count("Lucknow", "imd"), 1);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn failed_pass_writes_nothing() {
        let dir = scratch_dir("failed");
        let inputs = inputs(&dir, "Lat1,Long1\n26.85,80.95\n");

        let err = classify(&inputs, &null_progress()).err().unwrap();
        assert_eq!(
            err.to_string(),
            "Readings table is missing required columns: Lat2, Long2"
        );
        assert!(!dir.join("out").exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn unknown_source_filter_is_rejected() {
        let dir = scratch_dir("unknown");
        let mut inputs = inputs(&dir, "Lat1,Long1,Lat2,Long2\n");
        inputs.sources = Some("nope".to_string());

        assert!(load_config(&inputs).is_err());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
