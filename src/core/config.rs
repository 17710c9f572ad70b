//! Configuration for the directions service and ridership columns
//!
//! Holds endpoint settings for openrouteservice-compatible routing and the
//! header names used by the ridership dataset.

use crate::core::error::{Error, Result};

/// Environment variable holding the directions API key
pub const API_KEY_ENV: &str = "ORS_API_KEY";

/// Environment variable overriding the directions base URL
pub const BASE_URL_ENV: &str = "ORS_BASE_URL";

/// Maximum number of waypoints sent in a single directions request
pub const MAX_WAYPOINTS: usize = 70;

/// Configuration for the directions service
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingConfig {
    /// Base URL of the openrouteservice-compatible API
    pub base_url: String,

    /// Travel profile, e.g. "driving-car"
    pub profile: String,

    /// API key, `None` when the environment does not provide one
    pub api_key: Option<String>,

    /// Waypoint cap for one request
    pub max_waypoints: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openrouteservice.org".to_string(),
            profile: "driving-car".to_string(),
            api_key: None,
            max_waypoints: MAX_WAYPOINTS,
        }
    }
}

impl RoutingConfig {
    /// Build a config from the process environment.
    ///
    /// An empty `ORS_API_KEY` is treated the same as an unset one.
    pub fn from_env() -> Self {
        let mut config = Self {
            api_key: std::env::var(API_KEY_ENV)
                .ok()
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty()),
            ..Self::default()
        };
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                config.base_url = url.trim().to_string();
            }
        }
        config
    }

    /// Credential for the directions service, or a configuration error
    pub fn credential(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| Error::MissingCredential(API_KEY_ENV.to_string()))
    }

    /// Full directions endpoint returning GeoJSON
    pub fn directions_url(&self) -> String {
        format!(
            "{}/v2/directions/{}/geojson",
            self.base_url.trim_end_matches('/'),
            self.profile
        )
    }
}

/// Header names of the ridership dataset
#[derive(Debug, Clone, PartialEq)]
pub struct Columns {
    pub route_id: String,
    pub stop_name: String,
    pub stop_order: String,
    pub boarding_total: String,
    pub alighting_total: String,

    /// Marker identifying hourly boarding columns
    pub hourly_marker: String,

    /// Marker excluding total columns from the hourly set
    pub total_marker: String,

    /// Suffix stripped from hourly headers to build chart labels
    pub hourly_suffix: String,

    /// Optional service date column (YYYY-MM-DD or YYYYMMDD)
    pub date: Option<String>,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            route_id: "노선번호".to_string(),
            stop_name: "정류장명".to_string(),
            stop_order: "정류장순서".to_string(),
            boarding_total: "승차합계".to_string(),
            alighting_total: "하차합계".to_string(),
            hourly_marker: "승차건수".to_string(),
            total_marker: "합계".to_string(),
            hourly_suffix: "_승차건수(선탑_후탑)".to_string(),
            date: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directions_url() {
        let config = RoutingConfig::default();
        assert_eq!(
            config.directions_url(),
            "https://api.openrouteservice.org/v2/directions/driving-car/geojson"
        );
        assert_eq!(config.max_waypoints, 70);
    }

    #[test]
    fn test_directions_url_trailing_slash() {
        let config = RoutingConfig {
            base_url: "http://localhost:8080/".to_string(),
            profile: "foot-walking".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.directions_url(),
            "http://localhost:8080/v2/directions/foot-walking/geojson"
        );
    }

    #[test]
    fn test_missing_credential() {
        let config = RoutingConfig::default();
        match config.credential() {
            Err(Error::MissingCredential(var)) => assert_eq!(var, API_KEY_ENV),
            other => panic!("Expected MissingCredential, got {other:?}"),
        }
    }

    #[test]
    fn test_present_credential() {
        let config = RoutingConfig {
            api_key: Some("secret".to_string()),
            ..Default::default()
        };
        assert_eq!(config.credential().unwrap(), "secret");
    }
}
