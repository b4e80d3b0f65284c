#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Volcano hazard pipeline.
//!
//! For every erupting or restless volcano this builds a hazard buffer,
//! selects the population inside it, fetches and scores the surrounding
//! road network, locates emergency and everyday services, and finally
//! writes the combined tabular and map-ready exports.
//!
//! [`run::run_pipeline`] is the single entry point used by the CLI and by
//! scheduled jobs alike.

pub mod analysis;
pub mod config;
pub mod export;
pub mod path;
pub mod progress;
pub mod run;
pub mod store;
pub mod style;

pub use analysis::{StageOutcome, VolcanoAnalysis, analyze_volcano};
pub use config::PipelineConfig;
pub use run::{PipelineInputs, RunSummary, VolcanoFailure, run_buffers, run_pipeline};

use thiserror::Error;
use volcano_risk_network::NetworkError;
use volcano_risk_osm::OsmError;
use volcano_risk_spatial::SpatialError;

/// Errors that can occur while running the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Filesystem I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file is not valid TOML.
    #[error("Config parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// Configuration could not be serialized.
    #[error("Config serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// Configuration value out of range.
    #[error("Invalid configuration: {message}")]
    Config {
        /// What is wrong.
        message: String,
    },

    /// Buffer or projection failure.
    #[error(transparent)]
    Spatial(#[from] SpatialError),

    /// OpenStreetMap query failure.
    #[error(transparent)]
    Osm(#[from] OsmError),

    /// Road graph scoring failure.
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// A volcano's analysis did not finish in time.
    #[error("Timed out after {secs} s")]
    Timeout {
        /// Configured limit.
        secs: u64,
    },

    /// A background task panicked or was cancelled.
    #[error("Task failed: {message}")]
    Task {
        /// Join error description.
        message: String,
    },
}
