//! `GeoJSON` collections for map renderers.

use std::io::Write;

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use sensor_map_sensor_models::{Aggregate, SensorSource};
use sensor_map_spatial::BoundaryStore;

use crate::ExportError;

/// Builds one `Point` feature per classified point.
///
/// Properties: `district`, `source` (id), `label` and `color` from the
/// matching [`SensorSource`]. Points whose source is not in `sources` are
/// left out.
#[must_use]
pub fn points_feature_collection(
    aggregate: &Aggregate,
    sources: &[SensorSource],
) -> FeatureCollection {
    let features = aggregate
        .classified_points()
        .into_iter()
        .filter_map(|point| {
            let source = sources.iter().find(|s| s.id == point.source)?;

            let mut properties = JsonObject::new();
            properties.insert("district".to_string(), point.region.into());
            properties.insert("source".to_string(), source.id.clone().into());
            properties.insert("label".to_string(), source.label.clone().into());
            properties.insert("color".to_string(), source.color.clone().into());

            Some(feature(
                Value::Point(vec![point.coordinate.longitude, point.coordinate.latitude]),
                properties,
            ))
        })
        .collect();

    collection(features)
}

/// Builds one feature per stored district polygon with its normalized
/// `district` name.
#[must_use]
pub fn districts_feature_collection(store: &BoundaryStore) -> FeatureCollection {
    let features = store
        .regions()
        .map(|region| {
            let mut properties = JsonObject::new();
            properties.insert("district".to_string(), region.name.into());
            feature(Value::from(region.polygon), properties)
        })
        .collect();

    collection(features)
}

/// Serializes a collection as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`ExportError`] if serialization or writing fails.
pub fn write_feature_collection<W: Write>(
    mut writer: W,
    collection: &FeatureCollection,
) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(&mut writer, collection)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    log::info!("Wrote {} features", collection.features.len());
    Ok(())
}

fn feature(value: Value, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

const fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
