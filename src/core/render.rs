//! Renderer boundary
//!
//! Shapes the filtered rows and the routed path into what a chart or map
//! front-end consumes: per-stop totals, hourly totals, point markers and an
//! optional route overlay.

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue};
use serde::Serialize;

use crate::core::directions::{RouteGeometry, RouteSummary};
use crate::core::join::MatchedStop;
use crate::core::ridership::RidershipRecord;

/// Initial zoom level of the stop map
const MAP_ZOOM: u8 = 13;

/// Severity of a user-visible message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Message shown next to the charts and map
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TotalKind {
    Boarding,
    Alighting,
}

/// One bar of the per-stop chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopTotal {
    pub stop_name: String,
    pub kind: TotalKind,
    pub total: f64,
}

/// One point of the hourly boarding line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyTotal {
    pub hour: String,
    pub boarding: f64,
}

/// Circle marker for one matched stop
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub latitude: f64,
    pub longitude: f64,
    pub radius: f64,
    pub color: String,
    pub fill_opacity: f64,
    pub label: String,
}

impl Marker {
    fn for_stop(stop: &MatchedStop) -> Self {
        let record = &stop.record;
        Self {
            latitude: stop.latitude,
            longitude: stop.longitude,
            radius: 5.0 + record.boarding_total / 20.0,
            color: "blue".to_string(),
            fill_opacity: 0.7,
            label: format!(
                "{}\nboarding: {}\nalighting: {}",
                record.stop_name, record.boarding_total, record.alighting_total
            ),
        }
    }
}

/// Road-following line drawn under the markers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteOverlay {
    pub coordinates: Vec<[f64; 2]>,
    pub color: String,
    pub weight: f64,
    pub opacity: f64,
    pub summary: Option<RouteSummary>,
}

impl RouteOverlay {
    pub fn from_geometry(geometry: &RouteGeometry) -> Self {
        Self {
            coordinates: geometry.line_coordinates(),
            color: "red".to_string(),
            weight: 4.0,
            opacity: 0.7,
            summary: geometry.summary(),
        }
    }
}

/// Everything the map needs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapLayer {
    /// `[lat, lon]` mean of the matched stops
    pub center: [f64; 2],
    pub zoom: u8,
    pub markers: Vec<Marker>,
    pub route: Option<RouteOverlay>,
}

impl MapLayer {
    /// Markers for the matched stops; `None` when nothing matched
    pub fn from_stops(stops: &[MatchedStop]) -> Option<Self> {
        if stops.is_empty() {
            return None;
        }
        let n = stops.len() as f64;
        let lat = stops.iter().map(|s| s.latitude).sum::<f64>() / n;
        let lon = stops.iter().map(|s| s.longitude).sum::<f64>() / n;
        Some(Self {
            center: [lat, lon],
            zoom: MAP_ZOOM,
            markers: stops.iter().map(Marker::for_stop).collect(),
            route: None,
        })
    }

    /// Export markers as Points and the overlay as a LineString
    pub fn to_geojson(&self) -> FeatureCollection {
        let mut features: Vec<Feature> = Vec::with_capacity(self.markers.len() + 1);

        if let Some(route) = &self.route {
            let mut properties = JsonObject::new();
            properties.insert("kind".to_string(), JsonValue::from("route"));
            properties.insert("stroke".to_string(), JsonValue::from(route.color.as_str()));
            properties.insert("stroke-width".to_string(), JsonValue::from(route.weight));
            properties.insert("stroke-opacity".to_string(), JsonValue::from(route.opacity));
            if let Some(summary) = route.summary {
                properties.insert("distance".to_string(), JsonValue::from(summary.distance));
                properties.insert("duration".to_string(), JsonValue::from(summary.duration));
            }
            let line = route.coordinates.iter().map(|c| c.to_vec()).collect();
            features.push(feature(Geometry::new(geojson::Value::LineString(line)), properties));
        }

        for marker in &self.markers {
            let mut properties = JsonObject::new();
            properties.insert("kind".to_string(), JsonValue::from("stop"));
            properties.insert("label".to_string(), JsonValue::from(marker.label.as_str()));
            properties.insert("radius".to_string(), JsonValue::from(marker.radius));
            properties.insert("marker-color".to_string(), JsonValue::from(marker.color.as_str()));
            properties.insert("fill-opacity".to_string(), JsonValue::from(marker.fill_opacity));
            let point = geojson::Value::Point(vec![marker.longitude, marker.latitude]);
            features.push(feature(Geometry::new(point), properties));
        }

        FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }
}

fn feature(geometry: Geometry, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Boarding and alighting totals per stop, largest first
pub fn stop_chart(records: &[RidershipRecord]) -> Vec<StopTotal> {
    let mut bars: Vec<StopTotal> = records
        .iter()
        .flat_map(|r| {
            [
                StopTotal {
                    stop_name: r.stop_name.clone(),
                    kind: TotalKind::Boarding,
                    total: r.boarding_total,
                },
                StopTotal {
                    stop_name: r.stop_name.clone(),
                    kind: TotalKind::Alighting,
                    total: r.alighting_total,
                },
            ]
        })
        .collect();
    bars.sort_by(|a, b| b.total.total_cmp(&a.total));
    bars
}

/// Hourly boardings summed over the rows, in column order
pub fn hourly_chart(records: &[RidershipRecord], labels: &[String]) -> Vec<HourlyTotal> {
    labels
        .iter()
        .enumerate()
        .map(|(i, label)| HourlyTotal {
            hour: label.clone(),
            boarding: records
                .iter()
                .filter_map(|r| r.hourly_boardings.get(i))
                .sum(),
        })
        .collect()
}
