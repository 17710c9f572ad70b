//! Dashboard pipeline
//!
//! One call to [`Pipeline::run`] corresponds to one user interaction: filter,
//! chart, join, route, map. Only the route cache survives between calls.

use std::sync::Arc;

use chrono::NaiveDate;
use log::{info, warn};
use serde::Serialize;

use crate::core::config::RoutingConfig;
use crate::core::directions::DirectionsService;
use crate::core::error::Result;
use crate::core::join::geo_join;
use crate::core::render::{
    hourly_chart, stop_chart, HourlyTotal, MapLayer, Notice, RouteOverlay, StopTotal,
};
use crate::core::ridership::{Dataset, RidershipFilter};
use crate::core::route::{RouteBuilder, RouteOutcome};
use crate::core::stations::StationLocation;

/// Routing progress reported to the front-end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingEvent {
    Started { waypoints: usize },
    Finished,
}

/// Routing progress callback
pub type RoutingCallback = Arc<dyn Fn(RoutingEvent) + Send + Sync>;

/// Everything the renderer gets for one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub route: Option<String>,
    pub stop_search: String,
    pub order_range: Option<(i64, i64)>,
    pub date: Option<NaiveDate>,
    /// Rows left after filtering
    pub row_count: usize,
    /// Rows that found a station
    pub matched_count: usize,
    pub stop_chart: Vec<StopTotal>,
    pub hourly_chart: Vec<HourlyTotal>,
    pub map: Option<MapLayer>,
    pub notices: Vec<Notice>,
}

/// Re-invocable filter/join/route pipeline
pub struct Pipeline<D> {
    builder: RouteBuilder<D>,
    config: RoutingConfig,
    progress: Option<RoutingCallback>,
}

impl<D: DirectionsService> Pipeline<D> {
    pub fn new(service: D, config: RoutingConfig) -> Self {
        Self {
            builder: RouteBuilder::new(service, config.max_waypoints),
            config,
            progress: None,
        }
    }

    /// Report routing start/finish, e.g. to drive a spinner
    pub fn with_progress(mut self, progress: RoutingCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn route_builder(&self) -> &RouteBuilder<D> {
        &self.builder
    }

    /// Run the pipeline for one set of filter values.
    ///
    /// Only load-level failures (unknown route, malformed stations) are errors;
    /// everything the routing step can go through ends up as a notice.
    pub async fn run(
        &mut self,
        dataset: &Dataset,
        stations: &[StationLocation],
        filter: &RidershipFilter,
    ) -> Result<Dashboard> {
        let subset = dataset.filter(filter)?;
        let mut notices = Vec::new();

        if subset.is_empty() {
            notices.push(Notice::warning("No stops match the selected filters"));
        }

        let mut dashboard = Dashboard {
            route: filter.route.clone(),
            stop_search: filter.stop_search.clone(),
            order_range: filter.order_range,
            date: filter.date,
            row_count: subset.len(),
            matched_count: 0,
            stop_chart: stop_chart(&subset),
            hourly_chart: hourly_chart(&subset, &dataset.hourly_labels),
            map: None,
            notices: Vec::new(),
        };

        let joined = geo_join(&subset, stations)?;
        dashboard.matched_count = joined.stops.len();

        let Some(mut map) = MapLayer::from_stops(&joined.stops) else {
            notices.push(Notice::info(
                "No station location data for the selected filters",
            ));
            dashboard.notices = notices;
            return Ok(dashboard);
        };

        match self.config.credential() {
            Err(e) => {
                warn!("{e}");
                notices.push(Notice::error(e.to_string()));
            }
            Ok(api_key) => {
                let path = self.builder.waypoints(&joined.stops);
                if path.truncated_from.is_some() {
                    let cap = self.builder.max_waypoints();
                    notices.push(Notice::warning(format!(
                        "Routing supports at most {cap} stops; only the first {cap} are connected"
                    )));
                }

                if path.is_routable() {
                    self.emit(RoutingEvent::Started {
                        waypoints: path.len(),
                    });
                    let outcome = self.builder.route(&path, api_key).await;
                    self.emit(RoutingEvent::Finished);

                    match outcome {
                        RouteOutcome::Routed { geometry, cached } => {
                            info!(
                                "Route overlay ready ({} waypoints, cached: {cached})",
                                path.len()
                            );
                            map.route = Some(RouteOverlay::from_geometry(&geometry));
                        }
                        RouteOutcome::Failed(e) if e.is_recoverable() => {
                            notices.push(Notice::warning(format!("Route lookup failed: {e}")));
                        }
                        RouteOutcome::Failed(e) => {
                            warn!("Unusable directions response: {e}");
                            notices.push(Notice::error(format!(
                                "Route response could not be used: {e}"
                            )));
                        }
                        RouteOutcome::Skipped => {}
                    }
                }
            }
        }

        dashboard.map = Some(map);
        dashboard.notices = notices;
        Ok(dashboard)
    }

    fn emit(&self, event: RoutingEvent) {
        if let Some(progress) = &self.progress {
            progress(event);
        }
    }
}
