//! Map summary for front-ends: initial view and district dropdown.

use std::collections::BTreeMap;
use std::io::Write;

use sensor_map_sensor_models::{Aggregate, Coordinate, SensorSource};
use sensor_map_spatial::BoundaryStore;
use serde::Serialize;

use crate::ExportError;

/// Per-source totals shown in a map legend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSummary {
    /// Source identifier.
    pub id: String,
    /// Legend label.
    pub label: String,
    /// Marker color.
    pub color: String,
    /// Points classified into any district.
    pub total: u64,
}

/// What a map front-end needs before loading any features.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapSummary {
    /// Center of the districts' total bounds. `None` when the boundary
    /// file had no districts.
    pub center: Option<Coordinate>,
    /// Districts with at least one sensor, sorted by name.
    pub active_districts: Vec<String>,
    /// Totals per source, in configuration order.
    pub sources: Vec<SourceSummary>,
    /// Per-district totals across all sources, keyed by name.
    pub district_totals: BTreeMap<String, u64>,
}

impl MapSummary {
    /// Summarizes a finished pass for the given boundaries and sources.
    #[must_use]
    pub fn new(store: &BoundaryStore, aggregate: &Aggregate, sources: &[SensorSource]) -> Self {
        let sources = sources
            .iter()
            .map(|source| SourceSummary {
                id: source.id.clone(),
                label: source.label.clone(),
                color: source.color.clone(),
                total: aggregate.total_for_source(&source.id),
            })
            .collect();

        let district_totals = aggregate
            .regions()
            .map(|region| (region.to_string(), aggregate.region_total(region)))
            .collect();

        Self {
            center: store.center(),
            active_districts: aggregate
                .active_regions()
                .into_iter()
                .map(str::to_string)
                .collect(),
            sources,
            district_totals,
        }
    }
}

/// Writes `summary` as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`ExportError`] if serialization or writing fails.
pub fn write_summary<W: Write>(mut writer: W, summary: &MapSummary) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(&mut writer, summary)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
