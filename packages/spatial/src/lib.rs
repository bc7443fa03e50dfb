#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory district boundary store.
//!
//! Loads named district polygons from a `GeoJSON` file once at startup,
//! builds an R-tree over their bounding boxes, and answers point-in-polygon
//! lookups for the classification pass.

pub mod classify;
pub mod crs;
pub mod names;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use geo::{Contains, MultiPolygon};
use geojson::{Feature, GeoJson};
use rstar::{AABB, RTree, RTreeObject};
use sensor_map_sensor_models::Coordinate;
use thiserror::Error;

pub use classify::{classify, classify_coordinate};

/// Errors that can occur while building a [`BoundaryStore`].
#[derive(Debug, Error)]
pub enum SpatialError {
    /// The boundary file could not be read.
    #[error("Failed to read boundary file {}: {source}", path.display())]
    Read {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The boundary file is not valid `GeoJSON`.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] Box<geojson::Error>),

    /// None of the candidate name attributes appear on any feature.
    #[error("No {} attribute found in boundary features", candidates.join(" or "))]
    NoNameAttribute {
        /// Attribute names that were tried.
        candidates: Vec<String>,
    },

    /// The collection declares a coordinate reference system we cannot
    /// convert to WGS84.
    #[error("Unsupported coordinate reference system: {name}")]
    UnsupportedCrs {
        /// CRS name as declared in the file.
        name: String,
    },

    /// No feature produced a usable named polygon.
    #[error("Boundary file contains no usable district polygons")]
    NoRegions,

    /// Data conversion error.
    #[error("Conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

impl From<geojson::Error> for SpatialError {
    fn from(e: geojson::Error) -> Self {
        Self::GeoJson(Box::new(e))
    }
}

/// Point-location contract shared by every boundary index.
///
/// Implementations must return the first region in load order whose
/// polygon contains the point, so swapping one index for another never
/// changes a classification.
pub trait RegionLookup {
    /// Returns the normalized name of the region containing the point.
    fn region_containing(&self, latitude: f64, longitude: f64) -> Option<&str>;
}

/// R-tree entry: a district's bounding box and its position in
/// [`BoundaryStore::districts`].
struct BoundaryEntry {
    /// Position in the boundary file; lower wins on overlap.
    index: usize,
    envelope: AABB<[f64; 2]>,
}

/// One named polygon as loaded.
struct District {
    name: String,
    polygon: MultiPolygon<f64>,
}

impl RTreeObject for BoundaryEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// A borrowed view of one stored district.
#[derive(Debug, Clone, Copy)]
pub struct Region<'a> {
    /// Title-cased district name.
    pub name: &'a str,
    /// District geometry in WGS84 (x = longitude, y = latitude).
    pub polygon: &'a MultiPolygon<f64>,
}

/// Read-only district boundaries with an R-tree index.
///
/// Constructed once per run and shared by reference with every
/// classification call. Lookups cost one R-tree envelope query plus an
/// exact containment test per candidate, and always agree with a linear
/// scan in file order.
pub struct BoundaryStore {
    tree: RTree<BoundaryEntry>,
    /// Distinct names in first-seen order.
    names: Vec<String>,
    /// Names and polygons in boundary-file order, indexed by the tree.
    districts: Vec<District>,
}

impl BoundaryStore {
    /// Reads a `GeoJSON` boundary file and builds the store.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError`] if the file cannot be read or parsed, if no
    /// name attribute is present, or if the declared CRS is unsupported.
    pub fn load(path: &Path, name_attributes: &[String]) -> Result<Self, SpatialError> {
        let contents = std::fs::read_to_string(path).map_err(|source| SpatialError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self::from_geojson_str(&contents, name_attributes)?;
        log::info!(
            "Loaded {} district polygons ({} distinct names) from {}",
            store.len(),
            store.names.len(),
            path.display()
        );
        Ok(store)
    }

    /// Builds the store from `GeoJSON` text.
    ///
    /// Accepts a `FeatureCollection` or a single `Feature`. Features with a
    /// missing name or a non-polygonal geometry are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError`] if the text is not `GeoJSON`, if no name
    /// attribute is present, if the declared CRS is unsupported, or if no
    /// feature yields a usable polygon.
    pub fn from_geojson_str(
        geojson_str: &str,
        name_attributes: &[String],
    ) -> Result<Self, SpatialError> {
        let geojson: GeoJson = geojson_str.parse()?;

        let (features, foreign_members) = match geojson {
            GeoJson::FeatureCollection(fc) => (fc.features, fc.foreign_members),
            GeoJson::Feature(f) => (vec![f], None),
            GeoJson::Geometry(_) => {
                return Err(SpatialError::Conversion {
                    message: "expected a FeatureCollection, found a bare geometry".to_string(),
                });
            }
        };

        let reference = crs::detect(foreign_members.as_ref())?;

        let name_attr = pick_name_attribute(&features, name_attributes).ok_or_else(|| {
            SpatialError::NoNameAttribute {
                candidates: name_attributes.to_vec(),
            }
        })?;
        log::debug!("Using '{name_attr}' as the district name attribute");

        let mut entries = Vec::new();
        for (i, feature) in features.into_iter().enumerate() {
            let Some(raw_name) = feature_name(&feature, name_attr) else {
                log::warn!("Skipping boundary feature {i}: no '{name_attr}' value");
                continue;
            };
            let Some(polygon) = feature_polygon(feature) else {
                log::warn!("Skipping boundary '{raw_name}': missing or non-polygonal geometry");
                continue;
            };

            entries.push((raw_name, reference.to_wgs84(polygon)));
        }

        Self::from_regions(entries)
    }

    /// Builds the store from already-projected WGS84 polygons.
    ///
    /// Names are title-cased here; two regions that normalize to the same
    /// name are both kept and resolve to that shared name.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::NoRegions`] if `regions` is empty.
    pub fn from_regions(
        regions: impl IntoIterator<Item = (String, MultiPolygon<f64>)>,
    ) -> Result<Self, SpatialError> {
        let mut seen = BTreeSet::new();
        let mut distinct = Vec::new();
        let mut districts = Vec::new();
        let mut entries = Vec::new();

        for (index, (raw_name, polygon)) in regions.into_iter().enumerate() {
            let name = names::title_case(&raw_name);
            if seen.insert(name.clone()) {
                distinct.push(name.clone());
            } else {
                log::warn!("Duplicate district name '{name}': polygons will be merged");
            }

            entries.push(BoundaryEntry {
                index,
                envelope: compute_envelope(&polygon),
            });
            districts.push(District { name, polygon });
        }

        if entries.is_empty() {
            return Err(SpatialError::NoRegions);
        }

        Ok(Self {
            tree: RTree::bulk_load(entries),
            names: distinct,
            districts,
        })
    }

    /// Number of stored polygons (duplicates counted separately).
    #[must_use]
    pub fn len(&self) -> usize {
        self.districts.len()
    }

    /// Whether the store holds no polygons. Never true for a constructed
    /// store.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.districts.is_empty()
    }

    /// Distinct district names in boundary-file order.
    #[must_use]
    pub fn region_names(&self) -> &[String] {
        &self.names
    }

    /// Every stored district in boundary-file order.
    pub fn regions(&self) -> impl Iterator<Item = Region<'_>> {
        self.districts.iter().map(|district| Region {
            name: &district.name,
            polygon: &district.polygon,
        })
    }

    /// Total bounds of all districts as `(south-west, north-east)` corners.
    #[must_use]
    pub fn bounds(&self) -> Option<(Coordinate, Coordinate)> {
        use geo::BoundingRect;

        self.districts
            .iter()
            .filter_map(|district| district.polygon.bounding_rect())
            .reduce(|a, b| {
                geo::Rect::new(
                    geo::coord! { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                    geo::coord! { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
                )
            })
            .map(|rect| {
                (
                    Coordinate::new(rect.min().y, rect.min().x),
                    Coordinate::new(rect.max().y, rect.max().x),
                )
            })
    }

    /// Midpoint of [`Self::bounds`], used as the initial map view.
    #[must_use]
    pub fn center(&self) -> Option<Coordinate> {
        self.bounds().map(|(sw, ne)| {
            Coordinate::new(
                f64::midpoint(sw.latitude, ne.latitude),
                f64::midpoint(sw.longitude, ne.longitude),
            )
        })
    }
}

impl RegionLookup for BoundaryStore {
    fn region_containing(&self, latitude: f64, longitude: f64) -> Option<&str> {
        let point = geo::Point::new(longitude, latitude);
        let query_env = AABB::from_point([longitude, latitude]);

        self.tree
            .locate_in_envelope_intersecting(&query_env)
            .map(|entry| entry.index)
            .filter(|&index| {
                self.districts
                    .get(index)
                    .is_some_and(|district| district.polygon.contains(&point))
            })
            .min()
            .and_then(|index| self.districts.get(index))
            .map(|district| district.name.as_str())
    }
}

/// Picks the first candidate attribute present on any feature.
fn pick_name_attribute<'a>(features: &[Feature], candidates: &'a [String]) -> Option<&'a str> {
    candidates
        .iter()
        .map(String::as_str)
        .find(|attr| features.iter().any(|f| f.contains_property(attr)))
}

/// Extracts a trimmed, non-empty string name from a feature.
fn feature_name(feature: &Feature, attr: &str) -> Option<String> {
    feature
        .property(attr)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Converts a feature's geometry into a [`MultiPolygon`].
/// Handles both `Polygon` and `MultiPolygon` geometry types.
fn feature_polygon(feature: Feature) -> Option<MultiPolygon<f64>> {
    let geom = feature.geometry?;
    let geo_geom: geo::Geometry<f64> = geom.try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    use geo::BoundingRect;

    mp.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}
