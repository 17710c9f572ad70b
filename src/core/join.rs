//! Geo-join between ridership rows and station locations
//!
//! Inner join on the normalized stop name. A ridership row without a station
//! is dropped; a station name that appears more than once resolves to the
//! entry with the smallest (latitude, longitude), whatever the table order.

use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use log::debug;
use serde::Serialize;

use crate::core::error::{Error, Result};
use crate::core::ridership::RidershipRecord;
use crate::core::stations::StationLocation;

/// A ridership row with exactly one coordinate pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedStop {
    pub record: RidershipRecord,
    pub latitude: f64,
    pub longitude: f64,
}

/// Result of a join; an empty `stops` list is a valid outcome
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinOutcome {
    pub stops: Vec<MatchedStop>,
    /// Ridership rows without a station
    pub unmatched: usize,
    /// Station entries ignored because another entry shares their name
    pub duplicate_stations: usize,
}

impl JoinOutcome {
    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }
}

/// Tie-break between stations sharing a name
fn canonical_order(a: &StationLocation, b: &StationLocation) -> Ordering {
    a.latitude
        .total_cmp(&b.latitude)
        .then_with(|| a.longitude.total_cmp(&b.longitude))
}

/// Join ridership rows with station coordinates, preserving ridership order
pub fn geo_join(records: &[RidershipRecord], stations: &[StationLocation]) -> Result<JoinOutcome> {
    let mut by_name: HashMap<&str, &StationLocation> = HashMap::with_capacity(stations.len());
    let mut duplicate_stations = 0;

    for station in stations {
        if !station.latitude.is_finite() || !station.longitude.is_finite() {
            return Err(Error::InvalidStation(format!(
                "station '{}' has a non-finite coordinate",
                station.stop_name
            )));
        }
        match by_name.entry(station.stop_key.as_str()) {
            Entry::Vacant(slot) => {
                slot.insert(station);
            }
            Entry::Occupied(mut slot) => {
                duplicate_stations += 1;
                if canonical_order(station, slot.get()) == Ordering::Less {
                    slot.insert(station);
                }
            }
        }
    }

    let stops: Vec<MatchedStop> = records
        .iter()
        .filter_map(|record| {
            by_name.get(record.stop_key.as_str()).map(|station| MatchedStop {
                record: record.clone(),
                latitude: station.latitude,
                longitude: station.longitude,
            })
        })
        .collect();

    let unmatched = records.len() - stops.len();
    debug!(
        "Geo-join matched {} rows, {} without station, {} duplicate station names",
        stops.len(),
        unmatched,
        duplicate_stations
    );

    Ok(JoinOutcome {
        stops,
        unmatched,
        duplicate_stations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::station;

    fn record(name: &str, order: i64) -> RidershipRecord {
        crate::core::test_support::record(name, order, 10.0)
    }

    #[test]
    fn test_join_normalizes_names_and_drops_unmatched() {
        let records = vec![record(" Seomyeon", 1), record("Nowhere", 2), record("NAMPO ", 3)];
        let stations = vec![station("seomyeon", 35.15, 129.05), station("Nampo", 35.09, 129.03)];

        let outcome = geo_join(&records, &stations).unwrap();
        assert_eq!(outcome.stops.len(), 2);
        assert_eq!(outcome.unmatched, 1);
        assert_eq!(outcome.stops[0].record.stop_order, 1);
        assert_eq!(outcome.stops[1].latitude, 35.09);
    }

    #[test]
    fn test_join_duplicate_station_resolves_to_smallest_coordinate() {
        let records = vec![record("Seomyeon", 1)];
        let stations = vec![
            station("seomyeon ", 35.5, 129.5),
            station("Seomyeon", 35.15, 129.07),
            station("SEOMYEON", 35.15, 129.05),
        ];

        let outcome = geo_join(&records, &stations).unwrap();
        assert_eq!(outcome.stops.len(), 1);
        assert_eq!(outcome.duplicate_stations, 2);
        assert_eq!(outcome.stops[0].latitude, 35.15);
        assert_eq!(outcome.stops[0].longitude, 129.05);
    }

    #[test]
    fn test_join_never_grows_rows() {
        let records = vec![record("A", 1), record("A", 2), record("B", 3)];
        let stations = vec![station("A", 35.1, 129.1), station("A", 35.2, 129.2), station("B", 35.3, 129.3)];

        let outcome = geo_join(&records, &stations).unwrap();
        assert!(outcome.stops.len() <= records.len());
        assert_eq!(outcome.stops.len(), 3);
    }

    #[test]
    fn test_join_is_order_independent() {
        let records = vec![record("A", 1), record("B", 2), record("C", 3), record("D", 4)];
        let stations = vec![
            station("D", 35.4, 129.4),
            station("A", 35.1, 129.1),
            station("B", 35.2, 129.2),
            station("a ", 35.9, 129.9),
        ];

        let forward = geo_join(&records, &stations).unwrap();

        let mut reversed_records = records.clone();
        reversed_records.reverse();
        let mut reversed_stations = stations.clone();
        reversed_stations.reverse();
        let reversed = geo_join(&reversed_records, &reversed_stations).unwrap();

        let mut rotated_stations = stations.clone();
        rotated_stations.rotate_left(2);
        let rotated = geo_join(&records, &rotated_stations).unwrap();

        let key = |stops: &[MatchedStop]| {
            let mut names: Vec<(String, String)> = stops
                .iter()
                .map(|s| (s.record.stop_name.clone(), format!("{},{}", s.latitude, s.longitude)))
                .collect();
            names.sort();
            names
        };
        assert_eq!(key(&forward.stops), key(&reversed.stops));
        assert_eq!(key(&forward.stops), key(&rotated.stops));
        assert_eq!(forward.stops[0].latitude, 35.1);
        assert_eq!(forward.unmatched, 1);
        assert_eq!(forward.duplicate_stations, 1);
    }

    #[test]
    fn test_join_empty_is_not_an_error() {
        let records = vec![record("A", 1)];
        let outcome = geo_join(&records, &[]).unwrap();
        assert!(outcome.is_empty());
        assert_eq!(outcome.unmatched, 1);
    }

    #[test]
    fn test_join_rejects_non_finite_station() {
        let stations = vec![station("A", f64::NAN, 129.0)];
        assert!(matches!(
            geo_join(&[record("A", 1)], &stations),
            Err(Error::InvalidStation(_))
        ));
    }
}
