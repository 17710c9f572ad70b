//! CLI-specific progress handling for ridership-map
//!
//! Shows a spinner on stderr while the directions request is in flight.

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use ridership_map::{RoutingCallback, RoutingEvent};

/// Creates a spinner for CLI display
pub fn create_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb
}

/// Progress manager driving the routing spinner
pub struct ProgressManager {
    pub pb: ProgressBar,
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressManager {
    pub fn new() -> Self {
        Self {
            pb: create_spinner(),
        }
    }

    /// Callback for the pipeline's routing events
    pub fn routing_callback(&self) -> RoutingCallback {
        let pb = self.pb.clone();
        Arc::new(move |event: RoutingEvent| match event {
            RoutingEvent::Started { waypoints } => {
                pb.set_message(format!("🗺️  Routing {waypoints} stops..."));
                pb.enable_steady_tick(Duration::from_millis(100));
            }
            RoutingEvent::Finished => {
                pb.finish_and_clear();
            }
        })
    }
}
