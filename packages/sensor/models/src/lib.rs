#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Sensor source, coordinate, classification and aggregate types.
//!
//! These types are shared by the boundary store, the reading ingest pass
//! and the exporters. They carry no I/O of their own.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumIs};
use thiserror::Error;

/// Inclusive latitude bounds in degrees.
pub const LATITUDE_RANGE: (f64, f64) = (-90.0, 90.0);

/// Inclusive longitude bounds in degrees.
pub const LONGITUDE_RANGE: (f64, f64) = (-180.0, 180.0);

/// A WGS84 latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a coordinate from a latitude/longitude pair.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both components fall inside their inclusive ranges.
    ///
    /// `NaN` in either component is never valid.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        (LATITUDE_RANGE.0..=LATITUDE_RANGE.1).contains(&self.latitude)
            && (LONGITUDE_RANGE.0..=LONGITUDE_RANGE.1).contains(&self.longitude)
    }

    /// Total ordering by latitude, then longitude.
    #[must_use]
    pub fn total_cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.latitude
            .total_cmp(&other.latitude)
            .then_with(|| self.longitude.total_cmp(&other.longitude))
    }
}

/// Outcome of classifying a single coordinate against the district
/// boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumIs)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Classification {
    /// The coordinate falls inside the named (title-cased) district.
    Region(String),
    /// The coordinate is valid but no district contains it.
    OutOfRegion,
    /// The coordinate is outside the latitude/longitude ranges.
    InvalidCoordinate,
}

impl Classification {
    /// Returns the district name for [`Classification::Region`].
    #[must_use]
    pub fn region(&self) -> Option<&str> {
        match self {
            Self::Region(name) => Some(name),
            Self::OutOfRegion | Self::InvalidCoordinate => None,
        }
    }
}

/// One sensor network whose coordinates live in a pair of CSV columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorSource {
    /// Unique source identifier (e.g., `"imd"`).
    pub id: String,
    /// Human-readable label used in exports (e.g., "IMD").
    pub label: String,
    /// CSV column holding the latitude.
    pub latitude_column: String,
    /// CSV column holding the longitude.
    pub longitude_column: String,
    /// Marker color hint for map renderers.
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_color() -> String {
    "blue".to_string()
}

/// Top-level configuration: which sources to read and which boundary
/// attributes carry the district name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Candidate property names for the district name, tried in order.
    #[serde(default = "default_name_attributes")]
    pub name_attributes: Vec<String>,
    /// Sensor sources in reading order.
    pub sources: Vec<SensorSource>,
}

fn default_name_attributes() -> Vec<String> {
    vec!["district".to_string(), "DISTRICT".to_string()]
}

impl SensorConfig {
    /// Checks the structural constraints the ingest pass relies on.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidConfigError`] if there are no sources, a source id is
    /// empty or duplicated, a column name is empty, or no name attribute is
    /// given.
    pub fn validate(&self) -> Result<(), InvalidConfigError> {
        if self.sources.is_empty() {
            return Err(InvalidConfigError::NoSources);
        }
        if self.name_attributes.iter().all(|a| a.trim().is_empty()) {
            return Err(InvalidConfigError::NoNameAttributes);
        }

        let mut seen = std::collections::BTreeSet::new();
        for source in &self.sources {
            if source.id.trim().is_empty() {
                return Err(InvalidConfigError::EmptySourceId);
            }
            if !seen.insert(source.id.as_str()) {
                return Err(InvalidConfigError::DuplicateSourceId(source.id.clone()));
            }
            if source.latitude_column.trim().is_empty() || source.longitude_column.trim().is_empty()
            {
                return Err(InvalidConfigError::EmptyColumn(source.id.clone()));
            }
        }

        Ok(())
    }

    /// Returns the source ids in configuration order.
    #[must_use]
    pub fn source_ids(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.id.clone()).collect()
    }
}

/// Errors returned by [`SensorConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidConfigError {
    /// No sensor source is configured, or the source filter matched none.
    #[error("Invalid sensor config: at least one source is required")]
    NoSources,

    /// Every name attribute is blank.
    #[error("Invalid sensor config: at least one name attribute is required")]
    NoNameAttributes,

    /// A source has a blank id.
    #[error("Invalid sensor config: source has empty id")]
    EmptySourceId,

    /// Two sources share an id.
    #[error("Invalid sensor config: duplicate source id '{0}'")]
    DuplicateSourceId(String),

    /// A source has a blank latitude or longitude column.
    #[error("Invalid sensor config: source '{0}' has an empty coordinate column")]
    EmptyColumn(String),
}

/// A classified point tagged with its district and source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassifiedPoint<'a> {
    /// District name.
    pub region: &'a str,
    /// Source identifier.
    pub source: &'a str,
    /// Point location.
    pub coordinate: Coordinate,
}

/// Per-district, per-source point collections produced by one ingest pass.
///
/// Every region and every source passed at construction has an entry, even
/// when empty. Point lists are kept sorted so two aggregates built from the
/// same rows in a different order compare equal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregate {
    sources: Vec<String>,
    region_order: Vec<String>,
    cells: BTreeMap<String, BTreeMap<String, Vec<Coordinate>>>,
}

impl Aggregate {
    /// Builds an aggregate from already-grouped cells.
    ///
    /// Missing (region, source) cells are filled with empty lists and every
    /// list is sorted.
    #[must_use]
    pub fn new(
        sources: Vec<String>,
        region_order: Vec<String>,
        mut cells: BTreeMap<String, BTreeMap<String, Vec<Coordinate>>>,
    ) -> Self {
        for region in &region_order {
            let by_source = cells.entry(region.clone()).or_default();
            for source in &sources {
                by_source.entry(source.clone()).or_default();
            }
        }
        for by_source in cells.values_mut() {
            for points in by_source.values_mut() {
                points.sort_by(Coordinate::total_cmp);
            }
        }

        Self {
            sources,
            region_order,
            cells,
        }
    }

    /// Source ids in configuration order.
    #[must_use]
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// District names in boundary-file order.
    pub fn regions(&self) -> impl Iterator<Item = &str> {
        self.region_order.iter().map(String::as_str)
    }

    /// Number of points recorded for `(region, source)`.
    #[must_use]
    pub fn count(&self, region: &str, source: &str) -> u64 {
        self.points(region, source).len() as u64
    }

    /// Points recorded for `(region, source)`, sorted.
    #[must_use]
    pub fn points(&self, region: &str, source: &str) -> &[Coordinate] {
        self.cells
            .get(region)
            .and_then(|by_source| by_source.get(source))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Total points in `region` across all sources.
    #[must_use]
    pub fn region_total(&self, region: &str) -> u64 {
        self.sources.iter().map(|s| self.count(region, s)).sum()
    }

    /// Total points recorded for `source` across all regions.
    #[must_use]
    pub fn total_for_source(&self, source: &str) -> u64 {
        self.region_order
            .iter()
            .map(|region| self.count(region, source))
            .sum()
    }

    /// Districts holding at least one point, sorted by name.
    #[must_use]
    pub fn active_regions(&self) -> Vec<&str> {
        let mut active: Vec<&str> = self
            .region_order
            .iter()
            .filter(|r| self.region_total(r) > 0)
            .map(String::as_str)
            .collect();
        active.sort_unstable();
        active.dedup();
        active
    }

    /// Every recorded point, in region order then source order.
    #[must_use]
    pub fn classified_points(&self) -> Vec<ClassifiedPoint<'_>> {
        let mut out = Vec::new();
        for region in &self.region_order {
            for source in &self.sources {
                for coordinate in self.points(region, source) {
                    out.push(ClassifiedPoint {
                        region,
                        source,
                        coordinate: *coordinate,
                    });
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn imd() -> SensorSource {
        SensorSource {
            id: "imd".to_string(),
            label: "IMD".to_string(),
            latitude_column: "Lat1".to_string(),
            longitude_column: "Long1".to_string(),
            color: "green".to_string(),
        }
    }

    #[test]
    fn coordinate_range_is_inclusive() {
        assert!(Coordinate::new(90.0, 180.0).is_valid());
        assert!(Coordinate::new(-90.0, -180.0).is_valid());
        assert!(!Coordinate::new(90.0001, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, -180.5).is_valid());
    }

    #[test]
    fn nan_coordinate_is_invalid() {
        assert!(!Coordinate::new(f64::NAN, 10.0).is_valid());
        assert!(!Coordinate::new(10.0, f64::NAN).is_valid());
    }

    #[test]
    fn classification_exposes_region_name() {
        let c = Classification::Region("Lucknow".to_string());
        assert_eq!(c.region(), Some("Lucknow"));
        assert!(c.is_region());
        assert_eq!(c.as_ref(), "region");
        assert!(Classification::OutOfRegion.region().is_none());
        assert!(Classification::InvalidCoordinate.is_invalid_coordinate());
    }

    #[test]
    fn config_defaults_name_attributes() {
        let config: SensorConfig = toml::from_str(
            r#"
            [[sources]]
            id = "imd"
            label = "IMD"
            latitude_column = "Lat1"
            longitude_column = "Long1"
            "#,
        )
        .unwrap();
        assert_eq!(config.name_attributes, vec!["district", "DISTRICT"]);
        assert_eq!(config.sources[0].color, "blue");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_rejects_duplicate_source_ids() {
        let config = SensorConfig {
            name_attributes: default_name_attributes(),
            sources: vec![imd(), imd()],
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err, InvalidConfigError::DuplicateSourceId("imd".to_string()));
        assert_eq!(
            err.to_string(),
            "Invalid sensor config: duplicate source id 'imd'"
        );
    }

    #[test]
    fn config_rejects_empty_sources() {
        let config = SensorConfig {
            name_attributes: default_name_attributes(),
            sources: vec![],
        };
        assert_eq!(config.validate(), Err(InvalidConfigError::NoSources));
    }

    #[test]
    fn aggregate_fills_empty_cells_and_sorts_points() {
        let mut cells = BTreeMap::new();
        cells.insert(
            "Lucknow".to_string(),
            BTreeMap::from([(
                "imd".to_string(),
                vec![Coordinate::new(26.9, 80.9), Coordinate::new(26.8, 80.9)],
            )]),
        );
        let agg = Aggregate::new(
            vec!["imd".to_string(), "rahat".to_string()],
            vec!["Lucknow".to_string(), "Agra".to_string()],
            cells,
        );

        assert_eq!(agg.count("Lucknow", "imd"), 2);
        assert_eq!(agg.count("Lucknow", "rahat"), 0);
        assert_eq!(agg.count("Agra", "imd"), 0);
        assert_eq!(agg.points("Lucknow", "imd")[0], Coordinate::new(26.8, 80.9));
        assert_eq!(agg.active_regions(), vec!["Lucknow"]);
        assert_eq!(agg.total_for_source("imd"), 2);
        assert_eq!(agg.classified_points().len(), 2);
    }
}
