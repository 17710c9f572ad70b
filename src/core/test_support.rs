//! Shared fixtures for unit tests

use std::cell::Cell;

use geojson::{Feature, FeatureCollection, Geometry};

use crate::core::directions::{DirectionsService, RouteGeometry};
use crate::core::error::{Error, Result};
use crate::core::join::MatchedStop;
use crate::core::ridership::{normalize_stop_name, RidershipRecord};
use crate::core::stations::StationLocation;

/// Directions fake that counts calls and echoes the waypoints back as a line
pub struct CountingDirections {
    pub calls: Cell<usize>,
    pub fail: bool,
    pub malformed: bool,
}

impl CountingDirections {
    pub fn new(fail: bool) -> Self {
        Self {
            calls: Cell::new(0),
            fail,
            malformed: false,
        }
    }

    /// Fake whose responses never carry a line geometry
    pub fn malformed() -> Self {
        Self {
            malformed: true,
            ..Self::new(false)
        }
    }
}

impl DirectionsService for CountingDirections {
    async fn directions(&self, coordinates: &[[f64; 2]], _api_key: &str) -> Result<RouteGeometry> {
        self.calls.set(self.calls.get() + 1);
        if self.fail {
            return Err(Error::NetworkError("connection refused".to_string()));
        }
        if self.malformed {
            return Err(Error::GeoJsonError("expected a FeatureCollection".to_string()));
        }
        let line = Geometry::new(geojson::Value::LineString(
            coordinates.iter().map(|c| c.to_vec()).collect(),
        ));
        Ok(RouteGeometry {
            collection: FeatureCollection {
                bbox: None,
                features: vec![Feature {
                    bbox: None,
                    geometry: Some(line),
                    id: None,
                    properties: None,
                    foreign_members: None,
                }],
                foreign_members: None,
            },
        })
    }
}

pub fn record(name: &str, order: i64, boarding: f64) -> RidershipRecord {
    RidershipRecord {
        route_id: "1001".to_string(),
        stop_name: name.to_string(),
        stop_key: normalize_stop_name(name),
        stop_order: order,
        boarding_total: boarding,
        alighting_total: 0.0,
        hourly_boardings: Vec::new(),
        date: None,
    }
}

pub fn station(name: &str, lat: f64, lon: f64) -> StationLocation {
    StationLocation {
        stop_name: name.to_string(),
        stop_key: normalize_stop_name(name),
        latitude: lat,
        longitude: lon,
    }
}

pub fn stop(name: &str, order: i64, lat: f64, lon: f64) -> MatchedStop {
    MatchedStop {
        record: record(name, order, 0.0),
        latitude: lat,
        longitude: lon,
    }
}
