//! Point classification against a [`RegionLookup`].

use sensor_map_sensor_models::{Classification, Coordinate};

use crate::RegionLookup;

/// Classifies a latitude/longitude pair.
///
/// Out-of-range coordinates are [`Classification::InvalidCoordinate`]
/// without consulting the lookup. Valid coordinates that no region contains
/// are [`Classification::OutOfRegion`].
#[must_use]
pub fn classify<L: RegionLookup + ?Sized>(
    latitude: f64,
    longitude: f64,
    lookup: &L,
) -> Classification {
    classify_coordinate(Coordinate::new(latitude, longitude), lookup)
}

/// [`classify`] for an already-built [`Coordinate`].
#[must_use]
pub fn classify_coordinate<L: RegionLookup + ?Sized>(
    coordinate: Coordinate,
    lookup: &L,
) -> Classification {
    if !coordinate.is_valid() {
        return Classification::InvalidCoordinate;
    }

    lookup
        .region_containing(coordinate.latitude, coordinate.longitude)
        .map_or(Classification::OutOfRegion, |name| {
            Classification::Region(name.to_string())
        })
}
