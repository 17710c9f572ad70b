//! # Ridership-map Library
//!
//! Turns a bus ridership table and a station reference table into dashboard
//! data: per-stop and hourly charts plus a stop map with a road-following
//! route overlay fetched from openrouteservice.
//!
//! ## Features
//!
//! - **Filtering**: route, stop-name fragment, stop order range, service date
//! - **Geo-join**: inner join on normalized stop names
//! - **Routing**: ordered, capped waypoint lists with a per-session response cache
//! - **Graceful degradation**: missing credentials and routing failures become notices
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use ridership_map::{Columns, RidershipFilter, RoutingConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dataset = ridership_map::open_ridership("ridership.csv", &Columns::default())?;
//!     let stations = ridership_map::open_stations("stations.geojson")?;
//!
//!     let mut pipeline = ridership_map::pipeline(RoutingConfig::from_env())?;
//!     let filter = RidershipFilter {
//!         route: dataset.route_ids().first().cloned(),
//!         ..Default::default()
//!     };
//!     let dashboard = pipeline.run(&dataset, &stations, &filter).await?;
//!     println!("{}", serde_json::to_string_pretty(&dashboard)?);
//!     Ok(())
//! }
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub use crate::core::config::{Columns, RoutingConfig, API_KEY_ENV, MAX_WAYPOINTS};
pub use crate::core::directions::{DirectionsService, OrsClient, RouteGeometry, RouteSummary};
pub use crate::core::error::{Error, Result};
pub use crate::core::join::{geo_join, JoinOutcome, MatchedStop};
pub use crate::core::pipeline::{Dashboard, Pipeline, RoutingCallback, RoutingEvent};
pub use crate::core::render::{MapLayer, Marker, Notice, NoticeLevel, RouteOverlay};
pub use crate::core::ridership::{
    load_ridership, normalize_stop_name, parse_date, Dataset, RidershipFilter, RidershipRecord,
};
pub use crate::core::route::{build_waypoints, RouteBuilder, RouteCache, RouteOutcome, WaypointPath};
pub use crate::core::stations::{load_stations, BoundingBox, StationFields, StationLocation};

// Internal modules
mod core;

/// Load a ridership CSV from disk
pub fn open_ridership<P: AsRef<Path>>(path: P, columns: &Columns) -> Result<Dataset> {
    let file = File::open(path)?;
    load_ridership(BufReader::new(file), columns)
}

/// Load a station GeoJSON file from disk with the default fields and service area
pub fn open_stations<P: AsRef<Path>>(path: P) -> Result<Vec<StationLocation>> {
    let file = File::open(path)?;
    load_stations(
        BufReader::new(file),
        &StationFields::default(),
        &BoundingBox::default(),
    )
}

/// Pipeline backed by the openrouteservice client
pub fn pipeline(config: RoutingConfig) -> Result<Pipeline<OrsClient>> {
    let client = OrsClient::new(&config)?;
    Ok(Pipeline::new(client, config))
}
