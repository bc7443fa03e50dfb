//! Coordinate reference system detection and conversion to WGS84.
//!
//! RFC 7946 `GeoJSON` is always WGS84, but files exported by older GIS
//! tools still carry the 2008 `crs` member. Only the ones naming WGS84 or
//! spherical Web Mercator are accepted.

use geo::{MapCoords, MultiPolygon};
use geojson::JsonObject;

use crate::SpatialError;

/// Earth radius used by spherical Web Mercator (EPSG:3857), in meters.
const WEB_MERCATOR_RADIUS: f64 = 6_378_137.0;

/// Reference systems the boundary loader can consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    /// Longitude/latitude degrees (EPSG:4326 / CRS84).
    Wgs84,
    /// Spherical Web Mercator meters (EPSG:3857).
    WebMercator,
}

impl Reference {
    /// Re-projects a polygon into WGS84 degrees.
    #[must_use]
    pub fn to_wgs84(self, polygon: MultiPolygon<f64>) -> MultiPolygon<f64> {
        match self {
            Self::Wgs84 => polygon,
            Self::WebMercator => polygon.map_coords(|c| {
                let (lon, lat) = web_mercator_to_lon_lat(c.x, c.y);
                geo::coord! { x: lon, y: lat }
            }),
        }
    }

    /// Classifies a CRS name such as `EPSG:4326`,
    /// `urn:ogc:def:crs:OGC:1.3:CRS84` or `urn:ogc:def:crs:EPSG::3857`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let code = name.trim().rsplit(':').next().unwrap_or_default();
        match code.to_ascii_uppercase().as_str() {
            "CRS84" | "4326" => Some(Self::Wgs84),
            "3857" | "900913" | "3785" | "102100" => Some(Self::WebMercator),
            _ => None,
        }
    }
}

/// Inspects a `FeatureCollection`'s foreign members for a legacy `crs`
/// declaration.
///
/// # Errors
///
/// Returns [`SpatialError::UnsupportedCrs`] if a `crs` member is present
/// but does not name a supported system.
pub fn detect(foreign_members: Option<&JsonObject>) -> Result<Reference, SpatialError> {
    let Some(crs) = foreign_members.and_then(|m| m.get("crs")) else {
        return Ok(Reference::Wgs84);
    };
    if crs.is_null() {
        return Ok(Reference::Wgs84);
    }

    let name = crs
        .get("properties")
        .and_then(|p| p.get("name"))
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| SpatialError::UnsupportedCrs {
            name: crs.to_string(),
        })?;

    let reference = Reference::from_name(name).ok_or_else(|| SpatialError::UnsupportedCrs {
        name: name.to_string(),
    })?;

    if reference != Reference::Wgs84 {
        log::info!("Re-projecting boundaries from {name} to WGS84");
    }

    Ok(reference)
}

/// Inverse spherical Mercator.
fn web_mercator_to_lon_lat(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / WEB_MERCATOR_RADIUS).to_degrees();
    let lat = (2.0 * (y / WEB_MERCATOR_RADIUS).exp().atan() - std::f64::consts::FRAC_PI_2)
        .to_degrees();
    (lon, lat)
}
