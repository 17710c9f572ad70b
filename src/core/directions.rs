//! Directions service client
//!
//! Talks to an openrouteservice-compatible directions endpoint and returns the
//! road-following path as GeoJSON.

use std::time::Duration;

use geojson::{FeatureCollection, GeoJson};
use log::debug;
use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::config::RoutingConfig;
use crate::core::error::{Error, Result};

/// Road-following path returned for a waypoint list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteGeometry {
    pub collection: FeatureCollection,
}

/// Distance and duration reported by the service
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    #[serde(default)]
    pub distance: f64,
    #[serde(default)]
    pub duration: f64,
}

impl RouteGeometry {
    /// All `[lon, lat]` positions of the line features, in order
    pub fn line_coordinates(&self) -> Vec<[f64; 2]> {
        let mut coords = Vec::new();
        for feature in &self.collection.features {
            let Some(geometry) = &feature.geometry else {
                continue;
            };
            let lines: Vec<&Vec<Vec<f64>>> = match &geometry.value {
                geojson::Value::LineString(line) => vec![line],
                geojson::Value::MultiLineString(lines) => lines.iter().collect(),
                _ => continue,
            };
            for line in lines {
                coords.extend(
                    line.iter()
                        .filter(|p| p.len() >= 2)
                        .map(|p| [p[0], p[1]]),
                );
            }
        }
        coords
    }

    /// Summary of the first route feature, when the service provides one
    pub fn summary(&self) -> Option<RouteSummary> {
        let properties = self.collection.features.first()?.properties.as_ref()?;
        serde_json::from_value(properties.get("summary")?.clone()).ok()
    }
}

/// Anything that can turn an ordered `[lon, lat]` list into a routed path
#[allow(async_fn_in_trait)]
pub trait DirectionsService {
    async fn directions(&self, coordinates: &[[f64; 2]], api_key: &str) -> Result<RouteGeometry>;
}

#[derive(Serialize)]
struct DirectionsRequest<'a> {
    coordinates: &'a [[f64; 2]],
}

/// openrouteservice directions client
pub struct OrsClient {
    client: Client,
    url: String,
}

impl OrsClient {
    pub fn new(config: &RoutingConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("ridership-map/{}", env!("RIDERSHIP_MAP_VERSION")))
            .build()?;
        Ok(Self {
            client,
            url: config.directions_url(),
        })
    }
}

impl DirectionsService for OrsClient {
    async fn directions(&self, coordinates: &[[f64; 2]], api_key: &str) -> Result<RouteGeometry> {
        debug!("Requesting directions for {} waypoints from {}", coordinates.len(), self.url);

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", api_key)
            .header("Accept", "application/geo+json, application/json")
            .json(&DirectionsRequest { coordinates })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Error::DirectionsFailed {
                status: status.as_u16(),
                message: service_error_message(&body)
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string()),
            });
        }

        match body.parse::<GeoJson>()? {
            GeoJson::FeatureCollection(collection) => Ok(RouteGeometry { collection }),
            _ => Err(Error::GeoJsonError(
                "directions response is not a FeatureCollection".to_string(),
            )),
        }
    }
}

/// Extract the message from `{"error": {"message": ..}}` or `{"error": ".."}`
fn service_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("error")? {
        Value::String(message) => Some(message.clone()),
        Value::Object(error) => error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}
