//! Composite assembly-point score.
//!
//! Nodes that carry much through-traffic and sit close to large population
//! centres make good assembly points. Both signals are min-max normalized
//! per graph and blended with [`ScoreWeights`].

use serde::{Deserialize, Serialize};
use volcano_risk_spatial::PopulationIndex;

use crate::centrality::betweenness_centrality;
use crate::graph::RoadGraph;
use crate::join::nearest_population;
use crate::normalize::min_max;
use crate::NetworkError;

/// Relative weight of the two score components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    /// Weight of normalized betweenness centrality.
    pub centrality: f64,
    /// Weight of normalized nearest population.
    pub population: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            centrality: 0.5,
            population: 0.5,
        }
    }
}

impl ScoreWeights {
    /// Checks that both weights are finite, non-negative and not both zero.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::InvalidWeights`] otherwise.
    pub fn validate(&self) -> Result<(), NetworkError> {
        let valid = [self.centrality, self.population]
            .iter()
            .all(|w| w.is_finite() && *w >= 0.0)
            && self.centrality + self.population > 0.0;
        if valid {
            Ok(())
        } else {
            Err(NetworkError::InvalidWeights {
                centrality: self.centrality,
                population: self.population,
            })
        }
    }

    /// Weighted sum of two normalized components.
    ///
    /// With weights summing to 1 (the default) the result stays in
    /// `[0, 1]`; otherwise it ranges over `[0, centrality + population]`.
    #[must_use]
    pub fn combine(&self, centrality: f64, population: f64) -> f64 {
        self.centrality.mul_add(centrality, self.population * population)
    }
}

/// A road node with its score and the values it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredNode {
    /// OSM node id.
    pub id: i64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Raw betweenness centrality.
    pub centrality: f64,
    /// Population of the nearest centre, if any lies in the graph's box.
    pub population: Option<f64>,
    /// Distance to that centre in metres.
    pub distance_m: Option<f64>,
    /// Centrality rescaled to `[0, 1]`.
    pub centrality_norm: f64,
    /// Population rescaled to `[0, 1]`.
    pub population_norm: f64,
    /// Weighted sum of the normalized components.
    pub score: f64,
}

/// Scores every node of `graph`.
///
/// # Errors
///
/// Returns [`NetworkError::InvalidWeights`] if `weights` are unusable.
pub fn score_network(
    graph: &RoadGraph,
    population: &PopulationIndex,
    weights: &ScoreWeights,
) -> Result<Vec<ScoredNode>, NetworkError> {
    weights.validate()?;

    let centrality = betweenness_centrality(graph.graph(), |edge| edge.length_m);
    let joins = nearest_population(graph, population);

    let centrality_norm = min_max(&centrality.iter().copied().map(Some).collect::<Vec<_>>());
    let population_norm = min_max(&joins.iter().map(|j| j.population).collect::<Vec<_>>());

    let scored: Vec<ScoredNode> = graph
        .nodes()
        .zip(centrality)
        .zip(joins)
        .zip(centrality_norm.into_iter().zip(population_norm))
        .map(|(((node, centrality), join), (c_norm, p_norm))| ScoredNode {
            id: node.id,
            longitude: node.geographic.x,
            latitude: node.geographic.y,
            centrality,
            population: join.population,
            distance_m: join.distance_m,
            centrality_norm: c_norm,
            population_norm: p_norm,
            score: weights.combine(c_norm, p_norm),
        })
        .collect();

    log::debug!("Scored {} nodes", scored.len());
    Ok(scored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use volcano_risk_osm_models::{RoadEdge, RoadNetwork, RoadNode};
    use volcano_risk_volcano_models::{BoundingBox, PopulationPoint};

    #[test]
    fn combine_extremes() {
        let weights = ScoreWeights::default();
        assert!((weights.combine(1.0, 1.0) - 1.0).abs() < f64::EPSILON);
        assert!(weights.combine(0.0, 0.0).abs() < f64::EPSILON);
        assert!((weights.combine(1.0, 0.0) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn weights_are_not_rescaled() {
        let uneven = ScoreWeights {
            centrality: 0.75,
            population: 0.25,
        };
        assert!((uneven.combine(1.0, 1.0) - 1.0).abs() < 1e-12);
        assert!((uneven.combine(1.0, 0.0) - 0.75).abs() < 1e-12);

        let heavy = ScoreWeights {
            centrality: 0.7,
            population: 0.7,
        };
        assert!((heavy.combine(1.0, 1.0) - 1.4).abs() < 1e-12);

        let light = ScoreWeights {
            centrality: 0.2,
            population: 0.2,
        };
        assert!((light.combine(1.0, 1.0) - 0.4).abs() < 1e-12);
        assert!((light.combine(0.5, 0.0) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn rejects_invalid_weights() {
        let zero = ScoreWeights {
            centrality: 0.0,
            population: 0.0,
        };
        assert!(zero.validate().is_err());
        let negative = ScoreWeights {
            centrality: -1.0,
            population: 2.0,
        };
        assert!(negative.validate().is_err());
        assert!(ScoreWeights::default().validate().is_ok());
    }

    /// Three nodes along a two-way road, with a town next to the east end.
    fn line_network() -> RoadNetwork {
        let node = |id, lon| RoadNode {
            id,
            longitude: lon,
            latitude: 0.0,
        };
        let edge = |from, to, a: f64, b: f64| RoadEdge {
            from,
            to,
            way_id: 1,
            class: "secondary".into(),
            name: None,
            oneway: false,
            geometry: vec![[a, 0.0], [b, 0.0]],
        };
        RoadNetwork {
            bbox: BoundingBox::new(-0.1, -0.1, 0.1, 0.1),
            nodes: vec![node(1, -0.05), node(2, 0.0), node(3, 0.05)],
            edges: vec![edge(1, 2, -0.05, 0.0), edge(2, 3, 0.0, 0.05)],
        }
    }

    #[test]
    fn scores_follow_both_components() {
        let graph = RoadGraph::from_network(&line_network(), false).unwrap();
        let index = PopulationIndex::new(vec![
            PopulationPoint {
                id: "west".to_string(),
                longitude: -0.06,
                latitude: 0.0,
                population: 10.0,
            },
            PopulationPoint {
                id: "east".to_string(),
                longitude: 0.06,
                latitude: 0.0,
                population: 110.0,
            },
        ]);

        let scored = score_network(&graph, &index, &ScoreWeights::default()).unwrap();
        assert_eq!(scored.len(), 3);

        let middle = scored.iter().find(|n| n.id == 2).unwrap();
        assert!((middle.centrality_norm - 1.0).abs() < 1e-12);

        let east = scored.iter().find(|n| n.id == 3).unwrap();
        assert!(east.centrality_norm.abs() < 1e-12);
        assert!((east.population_norm - 1.0).abs() < 1e-12);
        assert!((east.score - 0.5).abs() < 1e-12);

        let west = scored.iter().find(|n| n.id == 1).unwrap();
        assert!(west.score.abs() < 1e-12);
        assert!(scored.iter().all(|n| (0.0..=1.0).contains(&n.score)));
    }

    #[test]
    fn missing_population_is_neutral() {
        let graph = RoadGraph::from_network(&line_network(), false).unwrap();
        let scored = score_network(&graph, &PopulationIndex::new(vec![]), &ScoreWeights::default())
            .unwrap();
        assert!(scored.iter().all(|n| (n.population_norm - 0.5).abs() < f64::EPSILON));
        assert!(scored.iter().all(|n| n.population.is_none()));
    }
}
