//! Per-district, per-source accumulation of classified points.

use std::collections::BTreeMap;

use sensor_map_sensor_models::{Aggregate, Classification, Coordinate, SensorSource};

/// Accumulates classified points for a single ingest pass.
///
/// Lifecycle: [`Aggregator::new`], any number of [`Aggregator::record`]
/// calls, then [`Aggregator::finalize`], which consumes the aggregator.
#[derive(Debug)]
pub struct Aggregator {
    sources: Vec<String>,
    region_order: Vec<String>,
    cells: BTreeMap<String, BTreeMap<String, Vec<Coordinate>>>,
}

impl Aggregator {
    /// Creates an aggregator with an empty cell for every
    /// `(region, source)` combination.
    #[must_use]
    pub fn new(region_names: &[String], sources: &[SensorSource]) -> Self {
        let source_ids: Vec<String> = sources.iter().map(|s| s.id.clone()).collect();

        let mut region_order = Vec::with_capacity(region_names.len());
        let mut cells: BTreeMap<String, BTreeMap<String, Vec<Coordinate>>> = BTreeMap::new();
        for name in region_names {
            if cells.contains_key(name) {
                continue;
            }
            let by_source = source_ids
                .iter()
                .map(|id| (id.clone(), Vec::new()))
                .collect();
            cells.insert(name.clone(), by_source);
            region_order.push(name.clone());
        }

        Self {
            sources: source_ids,
            region_order,
            cells,
        }
    }

    /// Records one classified point. Only [`Classification::Region`]
    /// results are kept; the others are dropped. Counting the drops is the
    /// caller's job (see [`crate::PassStats`]).
    pub fn record(&mut self, source: &str, classification: &Classification, coordinate: Coordinate) {
        if let Classification::Region(name) = classification {
            self.cells
                .entry(name.clone())
                .or_default()
                .entry(source.to_string())
                .or_default()
                .push(coordinate);
        }
    }

    /// Consumes the aggregator and returns the finished [`Aggregate`].
    ///
    /// Regions recorded without being seeded are appended after the seeded
    /// ones in name order, so the result does not depend on row order.
    #[must_use]
    pub fn finalize(self) -> Aggregate {
        let Self {
            sources,
            mut region_order,
            cells,
        } = self;

        let extra: Vec<String> = cells
            .keys()
            .filter(|name| !region_order.contains(*name))
            .cloned()
            .collect();
        region_order.extend(extra);

        Aggregate::new(sources, region_order, cells)
    }
}
