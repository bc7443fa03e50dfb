//! Per-district count table.

use std::io::Write;

use sensor_map_sensor_models::{Aggregate, SensorSource};

use crate::ExportError;

/// Header of the district name column.
pub const DISTRICT_HEADER: &str = "District";

/// Header of the all-sources total column.
pub const TOTAL_HEADER: &str = "Total";

/// Writes one row per district (boundary-file order) with one count column
/// per source and a total.
///
/// # Errors
///
/// Returns [`ExportError`] if writing fails.
pub fn write_counts_csv<W: Write>(
    writer: W,
    aggregate: &Aggregate,
    sources: &[SensorSource],
) -> Result<(), ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header = Vec::with_capacity(sources.len() + 2);
    header.push(DISTRICT_HEADER.to_string());
    header.extend(sources.iter().map(|s| s.label.clone()));
    header.push(TOTAL_HEADER.to_string());
    csv_writer.write_record(&header)?;

    let mut rows = 0usize;
    for region in aggregate.regions() {
        let mut record = Vec::with_capacity(header.len());
        record.push(region.to_string());

        let mut total = 0u64;
        for source in sources {
            let count = aggregate.count(region, &source.id);
            total += count;
            record.push(count.to_string());
        }
        record.push(total.to_string());

        csv_writer.write_record(&record)?;
        rows += 1;
    }

    csv_writer.flush()?;
    log::info!("Wrote counts for {rows} districts");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::pass;
    use sensor_map_sensor_models::SensorConfig;

    fn sources() -> Vec<SensorSource> {
        let config: SensorConfig = sensor_map_ingest::registry::default_config();
        config.sources
    }

    #[test]
    fn writes_every_district_with_totals() {
        let result = pass();
        let mut out = Vec::new();
        write_counts_csv(&mut out, &result.aggregate, &sources()).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "District,IMD,Rahat,Total\n\
             Lucknow,2,1,3\n\
             Agra,0,0,0\n"
        );
    }

    #[test]
    fn follows_source_subset() {
        let result = pass();
        let rahat_only: Vec<SensorSource> = sources()
            .into_iter()
            .filter(|s| s.id == "rahat")
            .collect();
        let mut out = Vec::new();
        write_counts_csv(&mut out, &result.aggregate, &rahat_only).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("District,Rahat,Total\nLucknow,1,1\n"), "{text}");
    }
}
