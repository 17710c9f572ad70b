//! Route construction
//!
//! Turns matched stops into an ordered, capped waypoint list and asks the
//! directions service for a routed path, at most once per distinct list.

use std::collections::HashMap;

use log::{debug, info, warn};

use crate::core::directions::{DirectionsService, RouteGeometry};
use crate::core::error::Error;
use crate::core::join::MatchedStop;

/// Decimal places kept in waypoint coordinates
const COORD_PRECISION: f64 = 1e6;

/// Ordered `[lon, lat]` waypoints for a single directions request
#[derive(Debug, Clone, PartialEq)]
pub struct WaypointPath {
    pub points: Vec<[f64; 2]>,
    /// Original point count when the list was cut down to the cap
    pub truncated_from: Option<usize>,
}

impl WaypointPath {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// A path needs at least two points
    pub fn is_routable(&self) -> bool {
        self.points.len() >= 2
    }
}

/// Sort stops by stop order and keep at most `cap` of them
pub fn build_waypoints(stops: &[MatchedStop], cap: usize) -> WaypointPath {
    let mut ordered: Vec<&MatchedStop> = stops.iter().collect();
    ordered.sort_by_key(|stop| stop.record.stop_order);

    let truncated_from = (ordered.len() > cap).then_some(ordered.len());
    let points = ordered
        .into_iter()
        .take(cap)
        .map(|stop| [round_coord(stop.longitude), round_coord(stop.latitude)])
        .collect();

    WaypointPath {
        points,
        truncated_from,
    }
}

fn round_coord(value: f64) -> f64 {
    (value * COORD_PRECISION).round() / COORD_PRECISION
}

/// Cache key: rounded coordinates in request order plus the credential
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    coords: Vec<(i64, i64)>,
    credential: String,
}

impl CacheKey {
    pub fn new(points: &[[f64; 2]], credential: &str) -> Self {
        Self {
            coords: points
                .iter()
                .map(|[lon, lat]| {
                    (
                        (lon * COORD_PRECISION).round() as i64,
                        (lat * COORD_PRECISION).round() as i64,
                    )
                })
                .collect(),
            credential: credential.to_string(),
        }
    }
}

/// Session-long memo of directions responses
#[derive(Debug, Default)]
pub struct RouteCache {
    entries: HashMap<CacheKey, RouteGeometry>,
}

impl RouteCache {
    pub fn get(&self, key: &CacheKey) -> Option<&RouteGeometry> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: CacheKey, geometry: RouteGeometry) {
        self.entries.insert(key, geometry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What happened to a routing attempt
#[derive(Debug)]
pub enum RouteOutcome {
    /// Geometry available, either fresh or from the cache
    Routed {
        geometry: RouteGeometry,
        cached: bool,
    },
    /// Fewer than two waypoints; nothing to route
    Skipped,
    /// The service call failed; the caller omits the overlay
    Failed(Error),
}

impl RouteOutcome {
    pub fn geometry(&self) -> Option<&RouteGeometry> {
        match self {
            RouteOutcome::Routed { geometry, .. } => Some(geometry),
            _ => None,
        }
    }
}

/// Builds waypoint paths and routes them through a directions service
pub struct RouteBuilder<D> {
    service: D,
    cache: RouteCache,
    max_waypoints: usize,
}

impl<D: DirectionsService> RouteBuilder<D> {
    pub fn new(service: D, max_waypoints: usize) -> Self {
        Self {
            service,
            cache: RouteCache::default(),
            max_waypoints,
        }
    }

    pub fn max_waypoints(&self) -> usize {
        self.max_waypoints
    }

    pub fn cache(&self) -> &RouteCache {
        &self.cache
    }

    pub fn service(&self) -> &D {
        &self.service
    }

    /// Waypoints for the given stops under this builder's cap
    pub fn waypoints(&self, stops: &[MatchedStop]) -> WaypointPath {
        let path = build_waypoints(stops, self.max_waypoints);
        if let Some(original) = path.truncated_from {
            info!(
                "Truncated waypoint list from {original} to {} points",
                self.max_waypoints
            );
        }
        path
    }

    /// Route a waypoint path, consulting the cache first
    pub async fn route(&mut self, path: &WaypointPath, api_key: &str) -> RouteOutcome {
        if !path.is_routable() {
            debug!("Skipping routing: {} waypoint(s)", path.len());
            return RouteOutcome::Skipped;
        }

        let key = CacheKey::new(&path.points, api_key);
        if let Some(geometry) = self.cache.get(&key) {
            debug!("Directions cache hit for {} waypoints", path.len());
            return RouteOutcome::Routed {
                geometry: geometry.clone(),
                cached: true,
            };
        }

        match self.service.directions(&path.points, api_key).await {
            Ok(geometry) => {
                self.cache.insert(key, geometry.clone());
                RouteOutcome::Routed {
                    geometry,
                    cached: false,
                }
            }
            Err(e) => {
                warn!("Directions request failed: {e}");
                RouteOutcome::Failed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::{stop, CountingDirections};

    fn many_stops(count: usize) -> Vec<MatchedStop> {
        (0..count)
            .map(|i| stop(&format!("stop{i}"), i as i64, 35.0 + i as f64 * 0.001, 129.0))
            .collect()
    }

    #[test]
    fn test_waypoints_sorted_by_stop_order() {
        let stops = vec![
            stop("stop3", 3, 35.3, 129.3),
            stop("stop1", 1, 35.1, 129.1),
            stop("stop2", 2, 35.2, 129.2),
        ];
        let path = build_waypoints(&stops, 70);
        assert_eq!(path.points, vec![[129.1, 35.1], [129.2, 35.2], [129.3, 35.3]]);
        assert_eq!(path.truncated_from, None);
    }

    #[test]
    fn test_waypoints_truncation_is_min_of_len_and_cap() {
        for len in [0, 1, 2, 69, 70, 71, 150] {
            let path = build_waypoints(&many_stops(len), 70);
            assert_eq!(path.len(), len.min(70), "length {len}");
            assert_eq!(path.truncated_from.is_some(), len > 70);
        }
    }

    #[test]
    fn test_waypoints_keep_lowest_stop_orders() {
        let mut stops = many_stops(80);
        stops.reverse();
        let path = build_waypoints(&stops, 70);
        assert_eq!(path.points[0], [129.0, 35.0]);
        assert_eq!(path.truncated_from, Some(80));
    }

    #[test]
    fn test_cache_key_rounds_to_six_decimals() {
        let a = CacheKey::new(&[[129.1234564, 35.0], [129.2, 35.1]], "key");
        let b = CacheKey::new(&[[129.1234561, 35.0000001], [129.2, 35.1]], "key");
        let c = CacheKey::new(&[[129.1234561, 35.0000001], [129.2, 35.1]], "other");
        let reversed = CacheKey::new(&[[129.2, 35.1], [129.1234564, 35.0]], "key");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, reversed);
    }

    #[tokio::test]
    async fn test_route_cached_on_second_call() {
        let mut builder = RouteBuilder::new(CountingDirections::new(false), 70);
        let first = WaypointPath {
            points: vec![[129.1234564, 35.1], [129.2, 35.2]],
            truncated_from: None,
        };
        let second = WaypointPath {
            points: vec![[129.1234561, 35.1000001], [129.2, 35.2]],
            truncated_from: None,
        };

        let a = builder.route(&first, "key").await;
        let b = builder.route(&second, "key").await;

        assert!(matches!(a, RouteOutcome::Routed { cached: false, .. }));
        assert!(matches!(b, RouteOutcome::Routed { cached: true, .. }));
        assert_eq!(a.geometry(), b.geometry());
        assert_eq!(builder.service().calls.get(), 1);
        assert_eq!(builder.cache().len(), 1);
    }

    #[tokio::test]
    async fn test_route_new_call_for_different_credential() {
        let mut builder = RouteBuilder::new(CountingDirections::new(false), 70);
        let path = build_waypoints(&many_stops(3), 70);

        builder.route(&path, "key-a").await;
        builder.route(&path, "key-b").await;
        assert_eq!(builder.service().calls.get(), 2);
    }

    #[tokio::test]
    async fn test_route_skips_single_point() {
        let mut builder = RouteBuilder::new(CountingDirections::new(false), 70);
        let path = builder.waypoints(&many_stops(1));

        let outcome = builder.route(&path, "key").await;
        assert!(matches!(outcome, RouteOutcome::Skipped));
        assert_eq!(builder.service().calls.get(), 0);
    }

    #[tokio::test]
    async fn test_route_failure_is_recoverable_and_not_cached() {
        let mut builder = RouteBuilder::new(CountingDirections::new(true), 70);
        let path = builder.waypoints(&many_stops(5));

        let first = builder.route(&path, "key").await;
        let second = builder.route(&path, "key").await;

        match first {
            RouteOutcome::Failed(e) => assert!(e.is_recoverable()),
            other => panic!("Expected Failed, got {other:?}"),
        }
        assert!(matches!(second, RouteOutcome::Failed(_)));
        assert_eq!(builder.service().calls.get(), 2);
        assert!(builder.cache().is_empty());
    }
}
