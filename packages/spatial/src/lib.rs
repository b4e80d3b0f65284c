#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Hazard buffers and population intersection.
//!
//! Builds fixed-radius buffers around volcanoes in a local azimuthal
//! equidistant projection, and selects the population centroids falling
//! inside them through an R-tree index shared by every volcano of a run.

pub mod buffer;
pub mod intersect;
pub mod projection;

pub use buffer::{DEFAULT_BUFFER_RADIUS_M, DEFAULT_BUFFER_SEGMENTS, HazardBuffer};
pub use intersect::{Intersection, PopulationIndex, intersect};
pub use projection::AzimuthalEquidistant;

use thiserror::Error;

/// Errors from projection and buffering.
#[derive(Debug, Error)]
pub enum SpatialError {
    /// Coordinate is non-finite or outside the WGS84 range.
    #[error("Invalid coordinate ({lon}, {lat})")]
    InvalidCoordinate {
        /// Longitude that was provided.
        lon: f64,
        /// Latitude that was provided.
        lat: f64,
    },

    /// Buffer radius is not a positive finite number.
    #[error("Invalid buffer radius: {radius_m} m")]
    InvalidRadius {
        /// Radius that was provided.
        radius_m: f64,
    },

    /// Too few vertices to form a polygon.
    #[error("Invalid buffer segment count: {segments} (need at least 3)")]
    InvalidSegments {
        /// Segment count that was provided.
        segments: usize,
    },

    /// The projection is undefined for the input.
    #[error("Projection error: {message}")]
    Projection {
        /// Description of what went wrong.
        message: String,
    },
}
