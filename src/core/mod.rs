//! Core library modules for ridership-map
//!
//! Loading, filtering, geo-join, route construction and the renderer boundary.

pub mod config;
pub mod directions;
pub mod error;
pub mod join;
pub mod pipeline;
pub mod render;
pub mod ridership;
pub mod route;
pub mod stations;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export main types for internal use
pub use directions::OrsClient;
pub use pipeline::Pipeline;
