#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Sensor reading ingestion, district classification and aggregation.
//!
//! One pass reads the readings table, classifies every present coordinate
//! pair against the [`BoundaryStore`], and folds the results into an
//! [`Aggregate`]. The pass is all-or-nothing: a missing column or a
//! malformed CSV record aborts it before any aggregate is returned.

pub mod aggregate;
pub mod progress;
pub mod readings;
pub mod registry;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sensor_map_sensor_models::{Aggregate, Classification, InvalidConfigError, SensorSource};
use sensor_map_spatial::{BoundaryStore, classify_coordinate};
use thiserror::Error;

use crate::aggregate::Aggregator;
use crate::progress::ProgressCallback;
use crate::readings::ReadingEvents;

/// Errors that can occur during an ingest pass.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The readings file could not be opened.
    #[error("Failed to open readings file {}: {source}", path.display())]
    Open {
        /// Path that was being opened.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file could not be read.
    #[error("Failed to read config file {}: {source}", path.display())]
    ReadConfig {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The readings table lacks configured coordinate columns.
    #[error("Readings table is missing required columns: {}", missing.join(", "))]
    MissingColumns {
        /// Every configured column not found in the header.
        missing: Vec<String>,
    },

    /// TOML parsing failed.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The configuration failed validation.
    #[error(transparent)]
    Config(#[from] InvalidConfigError),
}

/// Counters describing one ingest pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Data rows read.
    pub rows: u64,
    /// Coordinate pairs present across all rows and sources.
    pub events: u64,
    /// Pairs that landed inside a district.
    pub classified: u64,
    /// Valid pairs outside every district.
    pub out_of_region: u64,
    /// Pairs outside the latitude/longitude ranges.
    pub invalid: u64,
}

/// The finished aggregate plus pass counters.
#[derive(Debug, Clone)]
pub struct PassResult {
    /// Per-district, per-source points.
    pub aggregate: Aggregate,
    /// Pass counters.
    pub stats: PassStats,
}

/// Runs one classification pass over a CSV readings table.
///
/// # Errors
///
/// Returns [`IngestError::MissingColumns`] before reading any row if the
/// header lacks a configured column, or [`IngestError::Csv`] if a record is
/// malformed.
pub fn run_pass<R: Read>(
    store: &BoundaryStore,
    reader: R,
    sources: &[SensorSource],
    progress: &Arc<dyn ProgressCallback>,
) -> Result<PassResult, IngestError> {
    let mut events = ReadingEvents::new(reader, sources)?;
    let mut aggregator = Aggregator::new(store.region_names(), sources);
    let mut stats = PassStats::default();

    progress.set_message("Classifying sensor readings".to_string());

    for event in &mut events {
        let event = event?;
        let source = &sources[event.source];
        let classification = classify_coordinate(event.coordinate, store);

        stats.events += 1;
        match &classification {
            Classification::Region(_) => stats.classified += 1,
            Classification::OutOfRegion => stats.out_of_region += 1,
            Classification::InvalidCoordinate => stats.invalid += 1,
        }

        aggregator.record(&source.id, &classification, event.coordinate);
        progress.inc(1);
    }

    stats.rows = events.rows_read();

    log::info!(
        "Classified {} of {} coordinate pairs from {} rows ({} outside every district, {} invalid)",
        stats.classified,
        stats.events,
        stats.rows,
        stats.out_of_region,
        stats.invalid
    );
    progress.finish(format!(
        "classified {} of {} readings",
        stats.classified, stats.events
    ));

    Ok(PassResult {
        aggregate: aggregator.finalize(),
        stats,
    })
}

/// Opens a readings file and runs [`run_pass`] over it.
///
/// # Errors
///
/// Returns [`IngestError::Open`] if the file cannot be opened, plus every
/// error [`run_pass`] can return.
pub fn classify_file(
    store: &BoundaryStore,
    path: &Path,
    sources: &[SensorSource],
    progress: &Arc<dyn ProgressCallback>,
) -> Result<PassResult, IngestError> {
    let file = std::fs::File::open(path).map_err(|source| IngestError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    if let Ok(metadata) = file.metadata() {
        log::debug!("Reading {} ({} bytes)", path.display(), metadata.len());
    }

    run_pass(store, file, sources, progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::null_progress;
    use crate::registry::default_config;

    const LUCKNOW: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "DISTRICT": "LUCKNOW" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[80.5, 26.5], [81.2, 26.5], [81.2, 27.1], [80.5, 27.1], [80.5, 26.5]]]
                }
            },
            {
                "type": "Feature",
                "properties": { "DISTRICT": "agra" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[77.4, 26.8], [78.3, 26.8], [78.3, 27.4], [77.4, 27.4], [77.4, 26.8]]]
                }
            }
        ]
    }"#;

    fn store() -> BoundaryStore {
        BoundaryStore::from_geojson_str(LUCKNOW, &default_config().name_attributes).unwrap()
    }

    fn pass(csv: &str) -> Result<PassResult, IngestError> {
        run_pass(
            &store(),
            csv.as_bytes(),
            &default_config().sources,
            &null_progress(),
        )
    }

    #[test]
    fn single_reading_inside_lucknow() {
        let result = pass("Lat1,Long1,Lat2,Long2\n26.85,80.95,,\n").unwrap();
        let agg = &result.aggregate;

        assert_eq!(agg.count("Lucknow", "imd"), 1);
        assert_eq!(agg.count("Lucknow", "rahat"), 0);
        assert_eq!(agg.active_regions(), vec!["Lucknow"]);
        assert_eq!(result.stats.events, 1);
        assert_eq!(result.stats.rows, 1);
    }

    #[test]
    fn invalid_latitude_records_nothing() {
        let result = pass("Lat1,Long1,Lat2,Long2\n95,80.95,,\n").unwrap();

        assert_eq!(result.aggregate.total_for_source("imd"), 0);
        assert_eq!(result.stats.invalid, 1);
        assert_eq!(result.stats.classified, 0);
    }

    #[test]
    fn missing_source_a_does_not_affect_source_b() {
        let result = pass("Lat1,Long1,Lat2,Long2\n,,26.9,81.0\n,,27.0,78.0\n").unwrap();
        let agg = &result.aggregate;

        assert_eq!(agg.total_for_source("imd"), 0);
        assert_eq!(agg.count("Lucknow", "rahat"), 1);
        assert_eq!(agg.count("Agra", "rahat"), 1);
    }

    #[test]
    fn out_of_region_points_are_dropped() {
        let result = pass("Lat1,Long1,Lat2,Long2\n28.6,77.2,26.85,80.95\n").unwrap();

        assert_eq!(result.stats.out_of_region, 1);
        assert_eq!(result.aggregate.classified_points().len(), 1);
        assert_eq!(result.aggregate.total_for_source("imd"), 0);
    }

    #[test]
    fn stats_account_for_every_event_once() {
        let result = pass("Lat1,Long1,Lat2,Long2\n26.85,80.95,95,80\n28.6,77.2,27.0,78.0\n").unwrap();
        let stats = result.stats;

        assert_eq!(stats.events, 4);
        assert_eq!(stats.classified, 2);
        assert_eq!(stats.out_of_region, 1);
        assert_eq!(stats.invalid, 1);
        assert_eq!(
            stats.classified + stats.out_of_region + stats.invalid,
            stats.events
        );
        assert_eq!(
            result.aggregate.classified_points().len() as u64,
            stats.classified
        );
    }

    #[test]
    fn row_order_does_not_change_aggregate() {
        let rows = [
            "26.85,80.95,26.9,81.0",
            "27.0,78.0,,",
            "28.6,77.2,95,80",
            ",,26.6,80.6",
            "26.7,80.7,27.1,77.9",
        ];
        let header = "Lat1,Long1,Lat2,Long2\n";

        let forward = format!("{header}{}\n", rows.join("\n"));
        let mut reversed_rows = rows;
        reversed_rows.reverse();
        let reversed = format!("{header}{}\n", reversed_rows.join("\n"));

        let a = pass(&forward).unwrap();
        let b = pass(&reversed).unwrap();
        assert_eq!(a.aggregate, b.aggregate);
        assert_eq!(a.stats, b.stats);
    }

    #[test]
    fn missing_columns_abort_the_pass() {
        let err = pass("Lat1,Long1\n26.85,80.95\n").unwrap_err();
        match err {
            IngestError::MissingColumns { missing } => {
                assert_eq!(missing, vec!["Lat2", "Long2"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_utf8_record_aborts_the_pass() {
        let csv: &[u8] = b"Lat1,Long1,Lat2,Long2\n26.85,80.95,,\n\xff\xfe,80.95,,\n";
        let err = run_pass(&store(), csv, &default_config().sources, &null_progress())
            .unwrap_err();
        assert!(matches!(err, IngestError::Csv(_)), "{err}");
    }

    #[test]
    fn missing_readings_file_is_an_open_error() {
        let err = classify_file(
            &store(),
            Path::new("no/such/data.csv"),
            &default_config().sources,
            &null_progress(),
        )
        .unwrap_err();
        assert!(matches!(err, IngestError::Open { .. }));
    }
}
