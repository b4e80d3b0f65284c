//! Planar road graph built from a fetched [`RoadNetwork`].

use std::collections::BTreeMap;

use geo::Coord;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use volcano_risk_osm_models::{RoadClass, RoadNetwork};
use volcano_risk_spatial::AzimuthalEquidistant;
use volcano_risk_volcano_models::BoundingBox;

use crate::NetworkError;

/// A road node with both its geographic and projected position.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    /// OSM node id.
    pub id: i64,
    /// `(lon, lat)` in degrees.
    pub geographic: Coord<f64>,
    /// Metres in the graph's projection.
    pub planar: Coord<f64>,
}

/// A directed road segment.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphEdge {
    /// OSM way the segment belongs to.
    pub way_id: i64,
    /// Functional class.
    pub class: RoadClass,
    /// Planar length in metres.
    pub length_m: f64,
}

/// A road network reprojected to an azimuthal equidistant plane centred on
/// its bounding box.
///
/// Two-way roads are stored as a pair of opposite arcs.
#[derive(Debug, Clone)]
pub struct RoadGraph {
    graph: DiGraph<GraphNode, GraphEdge>,
    projection: AzimuthalEquidistant,
    bbox: BoundingBox,
}

impl RoadGraph {
    /// Projects `network` and builds its directed graph.
    ///
    /// Unless `retain_all` is set, only the largest weakly connected
    /// component is kept. Self-loops and edges referencing unknown nodes
    /// are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::Projection`] if a node or edge vertex cannot
    /// be projected.
    pub fn from_network(network: &RoadNetwork, retain_all: bool) -> Result<Self, NetworkError> {
        let (center_lon, center_lat) = network.bbox.center();
        let projection = AzimuthalEquidistant::new(Coord {
            x: center_lon,
            y: center_lat,
        })?;

        let mut graph = DiGraph::with_capacity(network.nodes.len(), network.edges.len() * 2);
        let mut indices: BTreeMap<i64, NodeIndex> = BTreeMap::new();

        for node in &network.nodes {
            let geographic = Coord {
                x: node.longitude,
                y: node.latitude,
            };
            let planar = projection.project(geographic)?;
            let index = graph.add_node(GraphNode {
                id: node.id,
                geographic,
                planar,
            });
            indices.insert(node.id, index);
        }

        let mut dropped = 0usize;
        for edge in &network.edges {
            let (Some(&from), Some(&to)) = (indices.get(&edge.from), indices.get(&edge.to)) else {
                dropped += 1;
                continue;
            };
            if from == to {
                continue;
            }

            let length_m = planar_length(&projection, &edge.geometry)?;
            let payload = GraphEdge {
                way_id: edge.way_id,
                class: edge.class.clone(),
                length_m,
            };
            if !edge.oneway {
                graph.add_edge(to, from, payload.clone());
            }
            graph.add_edge(from, to, payload);
        }
        if dropped > 0 {
            log::debug!("Dropped {dropped} edges referencing unknown nodes");
        }

        let mut road_graph = Self {
            graph,
            projection,
            bbox: network.bbox,
        };
        if !retain_all {
            road_graph.retain_largest_component();
        }
        Ok(road_graph)
    }

    /// Keeps only the largest weakly connected component.
    fn retain_largest_component(&mut self) {
        let n = self.graph.node_count();
        if n == 0 {
            return;
        }

        let mut components = UnionFind::<usize>::new(n);
        for edge in self.graph.edge_references() {
            components.union(edge.source().index(), edge.target().index());
        }

        let mut sizes: BTreeMap<usize, usize> = BTreeMap::new();
        for i in 0..n {
            *sizes.entry(components.find(i)).or_default() += 1;
        }
        // Largest size wins; among equals, the component seen first.
        let Some((&largest, _)) = sizes
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
        else {
            return;
        };

        if sizes.len() > 1 {
            log::debug!(
                "Keeping largest of {} components ({} of {n} nodes)",
                sizes.len(),
                sizes[&largest]
            );
        }

        let keep: Vec<bool> = (0..n).map(|i| components.find(i) == largest).collect();
        self.graph = self.graph.filter_map(
            |index, node| keep[index.index()].then(|| node.clone()),
            |_, edge| Some(edge.clone()),
        );
    }

    /// The underlying directed graph.
    #[must_use]
    pub const fn graph(&self) -> &DiGraph<GraphNode, GraphEdge> {
        &self.graph
    }

    /// The projection used for planar coordinates.
    #[must_use]
    pub const fn projection(&self) -> &AzimuthalEquidistant {
        &self.projection
    }

    /// Bounding box of the source network.
    #[must_use]
    pub const fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of directed edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Whether the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Nodes in index order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.graph.node_weights()
    }
}

/// Sum of projected segment lengths of a `(lon, lat)` polyline.
fn planar_length(
    projection: &AzimuthalEquidistant,
    geometry: &[[f64; 2]],
) -> Result<f64, NetworkError> {
    let planar = geometry
        .iter()
        .map(|[x, y]| projection.project(Coord { x: *x, y: *y }))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(planar
        .windows(2)
        .map(|pair| (pair[1].x - pair[0].x).hypot(pair[1].y - pair[0].y))
        .sum())
}
