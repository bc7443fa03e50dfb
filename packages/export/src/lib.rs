#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Exports for a finished classification pass.
//!
//! Writes the per-district count table as CSV, the classified points and
//! district outlines as `GeoJSON`, and a small JSON summary (map center and
//! the districts that hold at least one sensor) for map front-ends.

pub mod counts;
pub mod features;
pub mod summary;

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Default file name of the count table.
pub const COUNTS_FILE: &str = "district_marker_counts.csv";

/// Default file name of the classified points collection.
pub const POINTS_FILE: &str = "sensor_points.geojson";

/// Default file name of the district outlines collection.
pub const DISTRICTS_FILE: &str = "districts.geojson";

/// Default file name of the map summary.
pub const SUMMARY_FILE: &str = "map_summary.json";

/// Errors that can occur while writing exports.
#[derive(Debug, Error)]
pub enum ExportError {
    /// An output file could not be created or written.
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        /// Output path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// I/O error on a caller-provided writer.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Creates `path` (and its parent directories) for buffered writing.
///
/// # Errors
///
/// Returns [`ExportError::Write`] if the directory or file cannot be
/// created.
pub fn create_output(path: &Path) -> Result<BufWriter<File>, ExportError> {
    let wrap = |source: std::io::Error| ExportError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(wrap)?;
    }

    File::create(path).map(BufWriter::new).map_err(wrap)
}
