#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Road network analysis for assembly-point selection.
//!
//! Turns a fetched [`volcano_risk_osm_models::RoadNetwork`] into a planar
//! directed graph, computes length-weighted betweenness centrality, joins
//! the nearest population centre onto every node and blends both into a
//! single score per node.

pub mod centrality;
pub mod graph;
pub mod join;
pub mod normalize;
pub mod score;

pub use centrality::betweenness_centrality;
pub use graph::{GraphEdge, GraphNode, RoadGraph};
pub use join::{PopulationJoin, nearest_population};
pub use normalize::{NEUTRAL_SCORE, min_max};
pub use score::{ScoreWeights, ScoredNode, score_network};

use thiserror::Error;
use volcano_risk_spatial::SpatialError;

/// Errors from building or scoring a road graph.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// A node or edge vertex could not be projected.
    #[error("Projection failed: {0}")]
    Projection(#[from] SpatialError),

    /// Score weights are negative, non-finite or both zero.
    #[error("Invalid score weights (centrality {centrality}, population {population})")]
    InvalidWeights {
        /// Centrality weight that was provided.
        centrality: f64,
        /// Population weight that was provided.
        population: f64,
    },
}
