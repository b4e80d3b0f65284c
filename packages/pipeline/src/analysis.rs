//! Analysis of a single volcano.
//!
//! Stages run in order: population exposure, road network, road scoring,
//! then the three service families. A failed road fetch aborts the
//! volcano; a failed service fetch only marks that family as failed.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use volcano_risk_network::{RoadGraph, ScoredNode, score_network};
use volcano_risk_osm::OsmSource;
use volcano_risk_osm_models::{RoadNetwork, ServiceCategory, ServicePoint};
use volcano_risk_spatial::{HazardBuffer, Intersection, PopulationIndex};
use volcano_risk_volcano_models::{BoundingBox, Volcano};

use crate::{PipelineConfig, PipelineError};

/// Result of an optional stage.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    /// The stage produced data.
    Ready(T),
    /// The stage succeeded but found nothing.
    Empty,
    /// The stage failed; the message says why.
    Failed(String),
}

impl<T> StageOutcome<T> {
    /// The data, if the stage produced any.
    #[must_use]
    pub const fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Empty | Self::Failed(_) => None,
        }
    }
}

impl StageOutcome<Vec<ServicePoint>> {
    fn from_services<E: std::fmt::Display>(result: Result<Vec<ServicePoint>, E>) -> Self {
        match result {
            Ok(points) if points.is_empty() => Self::Empty,
            Ok(points) => Self::Ready(points),
            Err(e) => Self::Failed(e.to_string()),
        }
    }

    /// Serializable summary of this outcome.
    #[must_use]
    pub fn status(&self) -> StageStatus {
        match self {
            Self::Ready(points) => StageStatus::Ready {
                count: points.len(),
            },
            Self::Empty => StageStatus::Empty,
            Self::Failed(message) => StageStatus::Failed {
                message: message.clone(),
            },
        }
    }
}

/// What the presentation layer needs to know about a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageStatus {
    /// Data available.
    Ready {
        /// Number of records.
        count: usize,
    },
    /// Nothing found.
    Empty,
    /// Could not be determined.
    Failed {
        /// Error description.
        message: String,
    },
}

/// Everything computed for one volcano.
#[derive(Debug, Clone)]
pub struct VolcanoAnalysis {
    /// The volcano.
    pub volcano: Volcano,
    /// Its hazard buffer.
    pub buffer: HazardBuffer,
    /// Population inside the buffer.
    pub intersection: Intersection,
    /// Road network in the buffer's bounding box; `None` if there is none.
    pub roads: Option<RoadNetwork>,
    /// Scored road nodes, empty when there is no road network.
    pub nodes: Vec<ScoredNode>,
    /// Service lookup per family.
    pub services: BTreeMap<ServiceCategory, StageOutcome<Vec<ServicePoint>>>,
}

/// Builds the hazard buffer for `volcano`.
///
/// # Errors
///
/// Returns [`PipelineError::Spatial`] for invalid coordinates or buffer
/// settings.
pub fn hazard_buffer(
    volcano: &Volcano,
    config: &PipelineConfig,
) -> Result<HazardBuffer, PipelineError> {
    Ok(HazardBuffer::new(
        volcano.longitude,
        volcano.latitude,
        config.buffer.radius_m,
        config.buffer.segments,
    )?)
}

/// Fetches and scores the road network around `bbox`.
async fn road_stage(
    source: &dyn OsmSource,
    volcano: &Volcano,
    bbox: &BoundingBox,
    population: &Arc<PopulationIndex>,
    config: &PipelineConfig,
) -> Result<(Option<RoadNetwork>, Vec<ScoredNode>), PipelineError> {
    let roads = source.road_network(bbox, &config.roads.classes).await?;

    let (roads, nodes) = match roads {
        Some(network) => {
            let retain_all = config.roads.retain_all;
            let weights = config.score;
            let population = Arc::clone(population);
            tokio::task::spawn_blocking(move || {
                let graph = RoadGraph::from_network(&network, retain_all)?;
                let nodes = score_network(&graph, &population, &weights)?;
                Ok::<_, PipelineError>((Some(network), nodes))
            })
            .await
            .map_err(|e| PipelineError::Task {
                message: e.to_string(),
            })??
        }
        None => {
            log::warn!("{} ({}): no roads in {bbox:?}", volcano.name, volcano.id);
            (None, Vec::new())
        }
    };
    log::debug!("{} ({}): scored {} road nodes", volcano.name, volcano.id, nodes.len());
    Ok((roads, nodes))
}

/// Runs every stage for one volcano.
///
/// The road stage is bounded by `run.volcano_timeout_secs` and each
/// service lookup by `run.service_timeout_secs`. A scoring task already
/// running on the blocking pool is not interrupted by the timeout; its
/// result is discarded.
///
/// # Errors
///
/// Returns [`PipelineError`] if the road network cannot be fetched or
/// scored in time. Service failures and timeouts are recorded in
/// [`VolcanoAnalysis::services`] instead.
pub async fn analyze_volcano(
    source: &dyn OsmSource,
    volcano: &Volcano,
    buffer: HazardBuffer,
    population: Arc<PopulationIndex>,
    config: &PipelineConfig,
) -> Result<VolcanoAnalysis, PipelineError> {
    let intersection = population.intersect(&buffer);
    log::info!(
        "{} ({}): {} population centres, {:.0} people within {} km",
        volcano.name,
        volcano.id,
        intersection.count,
        intersection.total_population,
        config.buffer.radius_m / 1_000.0
    );

    let bbox = buffer.bounding_box();
    let road_secs = config.run.volcano_timeout_secs;
    let (roads, nodes) = tokio::time::timeout(
        Duration::from_secs(road_secs),
        road_stage(source, volcano, &bbox, &population, config),
    )
    .await
    .map_err(|_| PipelineError::Timeout { secs: road_secs })??;

    let service_secs = config.run.service_timeout_secs;
    let mut services = BTreeMap::new();
    for category in ServiceCategory::all() {
        let lookup = source.services(&bbox, *category);
        let result = match tokio::time::timeout(Duration::from_secs(service_secs), lookup).await {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(_) => Err(format!("timed out after {service_secs} s")),
        };
        let outcome = StageOutcome::from_services(result);
        match &outcome {
            StageOutcome::Ready(points) => {
                log::debug!(
                    "{} ({}): {} {category} services",
                    volcano.name,
                    volcano.id,
                    points.len()
                );
            }
            StageOutcome::Empty => {
                log::info!("{} ({}): no {category} services", volcano.name, volcano.id);
            }
            StageOutcome::Failed(message) => {
                log::warn!(
                    "{} ({}): {category} services unavailable: {message}",
                    volcano.name,
                    volcano.id
                );
            }
        }
        services.insert(*category, outcome);
    }

    Ok(VolcanoAnalysis {
        volcano: volcano.clone(),
        buffer,
        intersection,
        roads,
        nodes,
        services,
    })
}
