#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! OpenStreetMap data acquisition through the Overpass API.
//!
//! Provides the two remote queries the risk pipeline needs for each
//! volcano: the drivable road network inside the hazard buffer's bounding
//! box, and the points of interest of each service family. Both go through
//! the [`OsmSource`] trait so the orchestrator can be exercised against
//! in-memory fixtures.

pub mod overpass;
pub mod retry;
pub mod roads;
pub mod services;

use async_trait::async_trait;
use thiserror::Error;
use volcano_risk_osm_models::{RoadNetwork, ServiceCategory, ServicePoint};
use volcano_risk_volcano_models::BoundingBox;

pub use overpass::{OverpassConfig, OverpassSource};

/// Errors that can occur while querying OpenStreetMap data.
#[derive(Debug, Error)]
pub enum OsmError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an error status.
    #[error("HTTP status {status}: {message}")]
    Status {
        /// Status code.
        status: u16,
        /// Response body preview or retry summary.
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The server reported a runtime error in the query.
    #[error("Overpass error: {message}")]
    Remote {
        /// Remark returned by the server.
        message: String,
    },
}

/// Read-only access to road networks and points of interest.
#[async_trait]
pub trait OsmSource: Send + Sync {
    /// Fetches the drivable road network inside `bbox`, restricted to ways
    /// whose `highway` tag matches one of `classes`.
    ///
    /// Returns `Ok(None)` when no matching road lies inside the box.
    ///
    /// # Errors
    ///
    /// Returns [`OsmError`] on transport or response failures.
    async fn road_network(
        &self,
        bbox: &BoundingBox,
        classes: &[String],
    ) -> Result<Option<RoadNetwork>, OsmError>;

    /// Fetches the points of interest of one service family inside `bbox`.
    ///
    /// An empty vector means the query succeeded and found nothing.
    ///
    /// # Errors
    ///
    /// Returns [`OsmError`] on transport or response failures.
    async fn services(
        &self,
        bbox: &BoundingBox,
        category: ServiceCategory,
    ) -> Result<Vec<ServicePoint>, OsmError>;
}
