//! Nearest population centre for every road node.

use geo::Coord;
use rstar::RTree;
use rstar::primitives::GeomWithData;
use volcano_risk_spatial::PopulationIndex;

use crate::graph::RoadGraph;

/// Population value joined onto a road node.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationJoin {
    /// Id of the nearest population point.
    pub population_id: Option<String>,
    /// Its population.
    pub population: Option<f64>,
    /// Planar distance to it, in metres.
    pub distance_m: Option<f64>,
}

impl PopulationJoin {
    const NONE: Self = Self {
        population_id: None,
        population: None,
        distance_m: None,
    };
}

/// Finds the nearest population point of every graph node, in node index
/// order.
///
/// Population is first clipped to the graph's bounding box and measured in
/// the graph's projection. If nothing survives the clip, every node gets
/// an empty join.
#[must_use]
pub fn nearest_population(graph: &RoadGraph, population: &PopulationIndex) -> Vec<PopulationJoin> {
    let candidates = population.within_bbox(graph.bbox());
    let projection = graph.projection();

    let entries: Vec<GeomWithData<[f64; 2], usize>> = candidates
        .iter()
        .enumerate()
        .filter_map(|(i, point)| {
            let planar = projection
                .project(Coord {
                    x: point.longitude,
                    y: point.latitude,
                })
                .ok()?;
            Some(GeomWithData::new([planar.x, planar.y], i))
        })
        .collect();

    if entries.is_empty() {
        log::debug!("No population inside {:?}", graph.bbox());
        return vec![PopulationJoin::NONE; graph.node_count()];
    }

    let tree = RTree::bulk_load(entries);
    graph
        .nodes()
        .map(|node| {
            let query = [node.planar.x, node.planar.y];
            tree.nearest_neighbor(&query)
                .map_or(PopulationJoin::NONE, |nearest| {
                    let point = &candidates[nearest.data];
                    let [x, y] = *nearest.geom();
                    PopulationJoin {
                        population_id: Some(point.id.clone()),
                        population: Some(point.population),
                        distance_m: Some((x - query[0]).hypot(y - query[1])),
                    }
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use volcano_risk_osm_models::{RoadEdge, RoadNetwork, RoadNode};
    use volcano_risk_volcano_models::{BoundingBox, PopulationPoint};

    fn graph() -> RoadGraph {
        let network = RoadNetwork {
            bbox: BoundingBox::new(0.0, 0.0, 1.0, 1.0),
            nodes: vec![
                RoadNode {
                    id: 1,
                    longitude: 0.1,
                    latitude: 0.5,
                },
                RoadNode {
                    id: 2,
                    longitude: 0.9,
                    latitude: 0.5,
                },
            ],
            edges: vec![RoadEdge {
                from: 1,
                to: 2,
                way_id: 7,
                class: "primary".into(),
                name: None,
                oneway: false,
                geometry: vec![[0.1, 0.5], [0.9, 0.5]],
            }],
        };
        RoadGraph::from_network(&network, false).unwrap()
    }

    fn point(id: &str, lon: f64, lat: f64, population: f64) -> PopulationPoint {
        PopulationPoint {
            id: id.to_string(),
            longitude: lon,
            latitude: lat,
            population,
        }
    }

    #[test]
    fn every_node_gets_its_nearest_point() {
        let index = PopulationIndex::new(vec![
            point("west", 0.2, 0.5, 100.0),
            point("east", 0.8, 0.5, 900.0),
            point("outside", 0.95, 1.5, 1e6),
        ]);
        let joins = nearest_population(&graph(), &index);
        assert_eq!(joins.len(), 2);
        assert_eq!(joins[0].population_id.as_deref(), Some("west"));
        assert_eq!(joins[0].population, Some(100.0));
        assert_eq!(joins[1].population_id.as_deref(), Some("east"));

        // 0.1 degrees of longitude near the equator, about 11 km.
        let distance = joins[0].distance_m.unwrap();
        assert!((distance - 11_120.0).abs() < 20.0, "{distance}");
    }

    #[test]
    fn no_population_in_box_gives_empty_joins() {
        let index = PopulationIndex::new(vec![point("far", 50.0, 50.0, 10.0)]);
        let joins = nearest_population(&graph(), &index);
        assert_eq!(joins.len(), 2);
        assert!(joins.iter().all(|j| j.population.is_none() && j.distance_m.is_none()));
    }
}
