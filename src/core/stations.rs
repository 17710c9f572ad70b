//! Station reference table
//!
//! Loads bus stop locations from a GeoJSON export of the station shapefile and
//! keeps the ones that fall inside the service area.

use std::io::Read;

use geojson::{FeatureCollection, GeoJson, JsonValue};
use log::{debug, warn};
use serde::Serialize;

use crate::core::error::{Error, Result};
use crate::core::ridership::normalize_stop_name;

/// Spherical mercator earth radius in meters
const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// One station with geographic (EPSG:4326) coordinates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationLocation {
    pub stop_name: String,
    /// Normalized stop name used for joining
    pub stop_key: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Attribute names in the station file
#[derive(Debug, Clone, PartialEq)]
pub struct StationFields {
    pub name: String,
    pub latitude: String,
    pub longitude: String,
}

impl Default for StationFields {
    fn default() -> Self {
        Self {
            name: "bstopnm".to_string(),
            latitude: "gpsy".to_string(),
            longitude: "gpsx".to_string(),
        }
    }
}

/// Plausible coordinate window; bounds are exclusive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl Default for BoundingBox {
    /// Busan metropolitan area
    fn default() -> Self {
        Self {
            min_lat: 34.0,
            max_lat: 36.0,
            min_lon: 128.0,
            max_lon: 130.0,
        }
    }
}

impl BoundingBox {
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        latitude > self.min_lat
            && latitude < self.max_lat
            && longitude > self.min_lon
            && longitude < self.max_lon
    }
}

/// Coordinate reference system declared by the station file
#[derive(Debug, Clone, Copy, PartialEq)]
enum SourceCrs {
    Wgs84,
    WebMercator,
}

/// Parse a GeoJSON FeatureCollection of stations.
///
/// Coordinates are read from the latitude/longitude attributes when present and
/// from the point geometry otherwise. Stations outside `bbox` are dropped.
pub fn load_stations<R: Read>(
    mut reader: R,
    fields: &StationFields,
    bbox: &BoundingBox,
) -> Result<Vec<StationLocation>> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    let collection = match text.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => collection,
        _ => {
            return Err(Error::InvalidStation(
                "expected a FeatureCollection".to_string(),
            ))
        }
    };
    let crs = declared_crs(&collection)?;

    let mut stations = Vec::with_capacity(collection.features.len());
    let mut unnamed = 0usize;
    let mut outside = 0usize;

    for feature in &collection.features {
        let properties = feature.properties.as_ref();
        let Some(name) = properties
            .and_then(|p| p.get(&fields.name))
            .and_then(json_string)
        else {
            unnamed += 1;
            continue;
        };

        let from_attributes = properties.and_then(|p| {
            Some((
                json_number(p.get(&fields.latitude)?)?,
                json_number(p.get(&fields.longitude)?)?,
            ))
        });
        let coords = match from_attributes {
            Some(coords) => Some(coords),
            None => point_coordinates(feature.geometry.as_ref(), crs),
        };

        let Some((latitude, longitude)) = coords else {
            outside += 1;
            continue;
        };
        if !bbox.contains(latitude, longitude) {
            outside += 1;
            continue;
        }

        stations.push(StationLocation {
            stop_key: normalize_stop_name(&name),
            stop_name: name,
            latitude,
            longitude,
        });
    }

    if unnamed > 0 {
        warn!("Skipped {unnamed} station features without a '{}' attribute", fields.name);
    }
    debug!(
        "Loaded {} stations, dropped {} outside the service area",
        stations.len(),
        outside
    );

    Ok(stations)
}

/// Read the legacy `crs` member; RFC 7946 files without one are WGS84
fn declared_crs(collection: &FeatureCollection) -> Result<SourceCrs> {
    let name = collection
        .foreign_members
        .as_ref()
        .and_then(|members| members.get("crs"))
        .and_then(|crs| crs.get("properties"))
        .and_then(|props| props.get("name"))
        .and_then(JsonValue::as_str);

    match name {
        None => Ok(SourceCrs::Wgs84),
        Some(name) if name.contains("4326") || name.contains("CRS84") => Ok(SourceCrs::Wgs84),
        Some(name) if name.contains("3857") || name.contains("900913") => {
            Ok(SourceCrs::WebMercator)
        }
        Some(name) => Err(Error::InvalidStation(format!(
            "unsupported coordinate reference system '{name}', reproject to EPSG:4326 first"
        ))),
    }
}

/// Latitude/longitude of a point geometry
fn point_coordinates(geometry: Option<&geojson::Geometry>, crs: SourceCrs) -> Option<(f64, f64)> {
    let geojson::Value::Point(position) = &geometry?.value else {
        return None;
    };
    let (x, y) = (*position.first()?, *position.get(1)?);
    Some(match crs {
        SourceCrs::Wgs84 => (y, x),
        SourceCrs::WebMercator => mercator_to_wgs84(x, y),
    })
}

/// Inverse spherical mercator, returns (latitude, longitude)
fn mercator_to_wgs84(x: f64, y: f64) -> (f64, f64) {
    let longitude = (x / EARTH_RADIUS_M).to_degrees();
    let latitude = (2.0 * (y / EARTH_RADIUS_M).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
    (latitude, longitude)
}

fn json_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) if !s.trim().is_empty() => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_number(value: &JsonValue) -> Option<f64> {
    let number = match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|v| v.is_finite())
}
