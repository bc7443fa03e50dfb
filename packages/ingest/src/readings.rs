//! Lazy reading of paired sensor coordinates from CSV.
//!
//! Each row may carry one coordinate pair per configured source. A pair
//! with both values present yields one [`ReadingEvent`]; a pair with either
//! value missing yields nothing, independently of the other sources on the
//! same row.

use std::collections::VecDeque;
use std::io::Read;

use sensor_map_sensor_models::{Coordinate, SensorSource};

use crate::IngestError;

/// Field values treated as missing, compared case-insensitively.
const MISSING_MARKERS: &[&str] = &["na", "n/a", "#n/a", "nan", "null", "none", "-"];

/// One present coordinate pair from one row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadingEvent {
    /// 1-based data row number (the header is row 0).
    pub row: u64,
    /// Index of the source in the configuration passed to
    /// [`ReadingEvents::new`].
    pub source: usize,
    /// The raw, not yet validated, coordinate.
    pub coordinate: Coordinate,
}

/// Header positions of one source's latitude and longitude columns.
#[derive(Debug, Clone, Copy)]
struct ColumnPair {
    latitude: usize,
    longitude: usize,
}

/// Iterator over the [`ReadingEvent`]s of a CSV readings table.
///
/// The header is checked once in [`ReadingEvents::new`]; rows are only
/// read as the iterator is advanced.
pub struct ReadingEvents<R> {
    records: csv::StringRecordsIntoIter<R>,
    columns: Vec<ColumnPair>,
    row: u64,
    pending: VecDeque<ReadingEvent>,
}

impl<R: Read> ReadingEvents<R> {
    /// Reads the header row and resolves every source's columns.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::MissingColumns`] listing every configured
    /// column absent from the header, or [`IngestError::Csv`] if the header
    /// cannot be read.
    pub fn new(reader: R, sources: &[SensorSource]) -> Result<Self, IngestError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_owned())
            .collect();

        let position = |name: &str| headers.iter().position(|h| h == name);

        let mut missing: Vec<String> = Vec::new();
        let mut columns = Vec::with_capacity(sources.len());

        for source in sources {
            let latitude = position(source.latitude_column.as_str());
            let longitude = position(source.longitude_column.as_str());

            for (column, found) in [
                (&source.latitude_column, latitude),
                (&source.longitude_column, longitude),
            ] {
                if found.is_none() && !missing.contains(column) {
                    missing.push(column.clone());
                }
            }

            if let (Some(latitude), Some(longitude)) = (latitude, longitude) {
                columns.push(ColumnPair {
                    latitude,
                    longitude,
                });
            }
        }

        if !missing.is_empty() {
            return Err(IngestError::MissingColumns { missing });
        }

        Ok(Self {
            records: csv_reader.into_records(),
            columns,
            row: 0,
            pending: VecDeque::new(),
        })
    }

    /// Number of data rows consumed so far.
    #[must_use]
    pub const fn rows_read(&self) -> u64 {
        self.row
    }
}

impl<R: Read> Iterator for ReadingEvents<R> {
    type Item = Result<ReadingEvent, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }

            let record = match self.records.next()? {
                Ok(record) => record,
                Err(e) => return Some(Err(e.into())),
            };
            self.row += 1;

            for (source, pair) in self.columns.iter().enumerate() {
                let latitude = parse_field(record.get(pair.latitude), self.row);
                let longitude = parse_field(record.get(pair.longitude), self.row);

                if let (Some(latitude), Some(longitude)) = (latitude, longitude) {
                    self.pending.push_back(ReadingEvent {
                        row: self.row,
                        source,
                        coordinate: Coordinate::new(latitude, longitude),
                    });
                }
            }
        }
    }
}

/// Parses a coordinate field. Empty fields, missing-value markers, `NaN`
/// and unparseable text are all treated as missing.
fn parse_field(value: Option<&str>, row: u64) -> Option<f64> {
    let value = value?.trim();
    if value.is_empty()
        || MISSING_MARKERS
            .iter()
            .any(|m| value.eq_ignore_ascii_case(m))
    {
        return None;
    }

    match value.parse::<f64>() {
        Ok(parsed) if parsed.is_nan() => None,
        Ok(parsed) => Some(parsed),
        Err(e) => {
            log::debug!("Row {row}: treating unparseable coordinate '{value}' as missing ({e})");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::default_config;

    fn events(csv: &str) -> Vec<ReadingEvent> {
        ReadingEvents::new(csv.as_bytes(), &default_config().sources)
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn yields_one_event_per_present_pair() {
        let events = events("Lat1,Long1,Lat2,Long2\n26.85,80.95,26.9,81.3\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].source, 0);
        assert_eq!(events[0].coordinate, Coordinate::new(26.85, 80.95));
        assert_eq!(events[1].source, 1);
        assert_eq!(events[1].row, 1);
    }

    #[test]
    fn missing_pair_skips_only_that_source() {
        let events = events("Lat1,Long1,Lat2,Long2\n,,26.9,81.3\n26.85,NaN,26.7,81.2\n");
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.source == 1));
        assert_eq!(events[0].row, 1);
        assert_eq!(events[1].row, 2);
    }

    #[test]
    fn half_missing_pair_is_missing() {
        let events = events("Lat1,Long1,Lat2,Long2\n26.85,,NA,81.3\n");
        assert!(events.is_empty());
    }

    #[test]
    fn unparseable_fields_are_missing() {
        let events = events("Lat1,Long1,Lat2,Long2\nnorth,80.95,26.9,81.3\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].source, 1);
    }

    #[test]
    fn out_of_range_values_are_still_events() {
        let events = events("Lat1,Long1,Lat2,Long2\n95,80.95,,\n");
        assert_eq!(events.len(), 1);
        assert!((events[0].coordinate.latitude - 95.0).abs() < f64::EPSILON);
    }

    #[test]
    fn extra_columns_and_padding_are_tolerated() {
        let events = events("Station, Lat2 ,Long2,Lat1,Long1\nA, 26.9 , 81.3 ,26.85,80.95\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].source, 0);
        assert_eq!(events[0].coordinate, Coordinate::new(26.85, 80.95));
        assert_eq!(events[1].coordinate, Coordinate::new(26.9, 81.3));
    }

    #[test]
    fn short_rows_are_missing_trailing_pairs() {
        let events = events("Lat1,Long1,Lat2,Long2\n26.85,80.95\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].source, 0);
    }

    #[test]
    fn missing_columns_are_reported_before_any_row() {
        let err = ReadingEvents::new(
            "Lat1,Long1,Lat2\n26.85,80.95,26.9\n".as_bytes(),
            &default_config().sources,
        )
        .err()
        .unwrap();
        match err {
            IngestError::MissingColumns { missing } => assert_eq!(missing, vec!["Long2"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_input_is_missing_every_column() {
        let err = ReadingEvents::new("".as_bytes(), &default_config().sources)
            .err()
            .unwrap();
        assert!(
            matches!(err, IngestError::MissingColumns { ref missing } if missing.len() == 4),
            "{err}"
        );
    }

    #[test]
    fn counts_rows_read() {
        let mut reader = ReadingEvents::new(
            "Lat1,Long1,Lat2,Long2\n,,,\n26.85,80.95,,\n".as_bytes(),
            &default_config().sources,
        )
        .unwrap();
        assert_eq!(reader.by_ref().count(), 1);
        assert_eq!(reader.rows_read(), 2);
    }
}
