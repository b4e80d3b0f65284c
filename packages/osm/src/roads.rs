//! Drivable road network acquisition.
//!
//! Fetches the ways matching the functional-class filter inside a bounding
//! box and simplifies them into a graph: way endpoints and nodes shared by
//! several ways become graph nodes, everything in between becomes edge
//! geometry. Ways are cut where they leave the bounding box.

use std::collections::{BTreeMap, BTreeSet};

use volcano_risk_osm_models::{RoadClass, RoadEdge, RoadNetwork, RoadNode};
use volcano_risk_volcano_models::BoundingBox;

use crate::OsmError;
use crate::overpass::{Element, OverpassResponse, OverpassSource, bbox_filter};

/// Fetches and simplifies the road network inside `bbox`.
///
/// Returns `Ok(None)` when the box holds no matching road, which callers
/// treat as an empty graph rather than a failure.
///
/// # Errors
///
/// Returns [`OsmError`] if the query fails after retries.
pub async fn fetch_road_network(
    source: &OverpassSource,
    bbox: &BoundingBox,
    classes: &[String],
) -> Result<Option<RoadNetwork>, OsmError> {
    let query = road_network_query(bbox, classes, source.config().timeout_secs);
    let response = source.query(&query).await?;
    let network = parse_road_network(&response, bbox, classes);

    log::debug!(
        "Road network: {} nodes, {} edges",
        network.nodes.len(),
        network.edges.len()
    );
    Ok((!network.is_empty()).then_some(network))
}

/// Builds the Overpass query for roads whose `highway` tag matches any of
/// `classes`.
///
/// The regex is unanchored, so `primary` also selects `primary_link`.
#[must_use]
pub fn road_network_query(bbox: &BoundingBox, classes: &[String], timeout_secs: u64) -> String {
    format!(
        "[out:json][timeout:{timeout_secs}];\
         way[\"highway\"~\"{}\"]{};\
         (._;>;);\
         out body;",
        classes.join("|"),
        bbox_filter(bbox),
    )
}

/// Whether a `highway` tag value passes the class filter, with the same
/// substring semantics as the Overpass regex.
fn matches_filter(highway: &str, classes: &[String]) -> bool {
    classes.iter().any(|class| highway.contains(class.as_str()))
}

/// Direction of travel allowed on a way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Both,
    Forward,
    Reverse,
}

fn direction(tags: &BTreeMap<String, String>) -> Direction {
    match tags.get("oneway").map(String::as_str) {
        Some("yes" | "true" | "1") => Direction::Forward,
        Some("-1" | "reverse") => Direction::Reverse,
        _ if tags.get("junction").is_some_and(|j| j == "roundabout") => Direction::Forward,
        _ => Direction::Both,
    }
}

/// A way cut down to one run of consecutive in-bbox nodes.
struct WayRun<'a> {
    way_id: i64,
    tags: &'a BTreeMap<String, String>,
    nodes: Vec<i64>,
}

/// Converts an Overpass response into a simplified road network.
///
/// Nodes are returned sorted by id. An empty network (no matching way with
/// at least two nodes in the box) is returned as-is; callers decide how to
/// represent it.
#[must_use]
pub fn parse_road_network(
    response: &OverpassResponse,
    bbox: &BoundingBox,
    classes: &[String],
) -> RoadNetwork {
    let coords: BTreeMap<i64, [f64; 2]> = response
        .elements
        .iter()
        .filter_map(|element| match element {
            Element::Node { id, lat, lon, .. } => Some((*id, [*lon, *lat])),
            _ => None,
        })
        .collect();

    let runs = split_ways(response, bbox, classes, &coords);

    // A node becomes a graph node if it ends a run or appears more than
    // once across all runs.
    let mut occurrences: BTreeMap<i64, usize> = BTreeMap::new();
    let mut graph_nodes: BTreeSet<i64> = BTreeSet::new();
    for run in &runs {
        for id in &run.nodes {
            *occurrences.entry(*id).or_default() += 1;
        }
        if let (Some(first), Some(last)) = (run.nodes.first(), run.nodes.last()) {
            graph_nodes.insert(*first);
            graph_nodes.insert(*last);
        }
    }
    graph_nodes.extend(
        occurrences
            .iter()
            .filter(|(_, count)| **count > 1)
            .map(|(id, _)| *id),
    );

    let mut edges = Vec::new();
    for run in &runs {
        let class = RoadClass::from(run.tags.get("highway").map_or("", String::as_str));
        let name = run.tags.get("name").cloned();
        let direction = direction(run.tags);

        let mut start = 0;
        for i in 1..run.nodes.len() {
            if !graph_nodes.contains(&run.nodes[i]) {
                continue;
            }
            let ids = &run.nodes[start..=i];
            let mut geometry: Vec<[f64; 2]> = ids.iter().map(|id| coords[id]).collect();
            let (mut from, mut to) = (ids[0], ids[ids.len() - 1]);
            if direction == Direction::Reverse {
                geometry.reverse();
                std::mem::swap(&mut from, &mut to);
            }
            edges.push(RoadEdge {
                from,
                to,
                way_id: run.way_id,
                class: class.clone(),
                name: name.clone(),
                oneway: direction != Direction::Both,
                geometry,
            });
            start = i;
        }
    }

    let nodes = graph_nodes
        .into_iter()
        .map(|id| {
            let [longitude, latitude] = coords[&id];
            RoadNode {
                id,
                longitude,
                latitude,
            }
        })
        .collect();

    RoadNetwork {
        bbox: *bbox,
        nodes,
        edges,
    }
}

/// Keeps matching ways and splits them into runs of consecutive nodes that
/// have known coordinates inside the bounding box.
fn split_ways<'a>(
    response: &'a OverpassResponse,
    bbox: &BoundingBox,
    classes: &[String],
    coords: &BTreeMap<i64, [f64; 2]>,
) -> Vec<WayRun<'a>> {
    let mut runs = Vec::new();

    for element in &response.elements {
        let Element::Way { id, nodes, tags, .. } = element else {
            continue;
        };
        let Some(highway) = tags.get("highway") else {
            continue;
        };
        if !matches_filter(highway, classes) {
            continue;
        }

        let mut current: Vec<i64> = Vec::new();
        for node in nodes {
            let inside = coords
                .get(node)
                .is_some_and(|[lon, lat]| bbox.contains(*lon, *lat));
            if inside {
                current.push(*node);
            } else if current.len() > 1 {
                runs.push(WayRun {
                    way_id: *id,
                    tags,
                    nodes: std::mem::take(&mut current),
                });
            } else {
                current.clear();
            }
        }
        if current.len() > 1 {
            runs.push(WayRun {
                way_id: *id,
                tags,
                nodes: current,
            });
        }
    }

    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes() -> Vec<String> {
        volcano_risk_osm_models::DEFAULT_ROAD_CLASSES
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    fn bbox() -> BoundingBox {
        BoundingBox::new(0.0, 0.0, 1.0, 1.0)
    }

    fn response(value: serde_json::Value) -> OverpassResponse {
        OverpassResponse::from_value(value).unwrap()
    }

    /// Two primary ways crossing at node 3, plus a residential way that the
    /// filter drops.
    fn crossing() -> OverpassResponse {
        response(serde_json::json!({
            "elements": [
                {"type": "node", "id": 1, "lat": 0.5, "lon": 0.1},
                {"type": "node", "id": 2, "lat": 0.5, "lon": 0.3},
                {"type": "node", "id": 3, "lat": 0.5, "lon": 0.5},
                {"type": "node", "id": 4, "lat": 0.5, "lon": 0.9},
                {"type": "node", "id": 5, "lat": 0.1, "lon": 0.5},
                {"type": "node", "id": 6, "lat": 0.9, "lon": 0.5},
                {"type": "node", "id": 7, "lat": 0.2, "lon": 0.2},
                {"type": "way", "id": 10, "nodes": [1, 2, 3, 4],
                 "tags": {"highway": "primary", "name": "Main"}},
                {"type": "way", "id": 11, "nodes": [5, 3, 6],
                 "tags": {"highway": "secondary", "oneway": "yes"}},
                {"type": "way", "id": 12, "nodes": [7, 1],
                 "tags": {"highway": "residential"}}
            ]
        }))
    }

    #[test]
    fn query_contains_filter_and_bbox() {
        let query = road_network_query(&bbox(), &classes(), 60);
        assert!(query.contains(
            r#"way["highway"~"motorway|trunk|primary|secondary|tertiary"](0,0,1,1)"#
        ));
        assert!(query.starts_with("[out:json][timeout:60];"));
    }

    #[test]
    fn simplifies_to_intersections_and_endpoints() {
        let network = parse_road_network(&crossing(), &bbox(), &classes());
        let ids: Vec<i64> = network.nodes.iter().map(|n| n.id).collect();
        // Node 2 is interstitial; node 7 only sits on the filtered-out way.
        assert_eq!(ids, vec![1, 3, 4, 5, 6]);
        assert_eq!(network.edges.len(), 4);

        let first = &network.edges[0];
        assert_eq!((first.from, first.to), (1, 3));
        assert_eq!(first.geometry.len(), 3);
        assert_eq!(first.class, RoadClass::Primary);
        assert_eq!(first.name.as_deref(), Some("Main"));
        assert!(!first.oneway);

        assert!(network.edges.iter().filter(|e| e.way_id == 11).all(|e| e.oneway));
    }

    #[test]
    fn reverse_oneway_swaps_direction() {
        let value = serde_json::json!({
            "elements": [
                {"type": "node", "id": 1, "lat": 0.5, "lon": 0.1},
                {"type": "node", "id": 2, "lat": 0.5, "lon": 0.2},
                {"type": "way", "id": 10, "nodes": [1, 2],
                 "tags": {"highway": "trunk", "oneway": "-1"}}
            ]
        });
        let network = parse_road_network(&response(value), &bbox(), &classes());
        let edge = &network.edges[0];
        assert_eq!((edge.from, edge.to), (2, 1));
        assert_eq!(edge.geometry[0], [0.2, 0.5]);
        assert!(edge.oneway);
    }

    #[test]
    fn ways_are_cut_at_bbox_boundary() {
        let value = serde_json::json!({
            "elements": [
                {"type": "node", "id": 1, "lat": 0.5, "lon": 0.1},
                {"type": "node", "id": 2, "lat": 0.5, "lon": 0.2},
                {"type": "node", "id": 3, "lat": 0.5, "lon": 1.5},
                {"type": "node", "id": 4, "lat": 0.5, "lon": 0.8},
                {"type": "way", "id": 10, "nodes": [1, 2, 3, 4],
                 "tags": {"highway": "motorway"}}
            ]
        });
        let network = parse_road_network(&response(value), &bbox(), &classes());
        let ids: Vec<i64> = network.nodes.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(network.edges.len(), 1);
    }

    #[test]
    fn link_roads_pass_the_unanchored_filter() {
        assert!(matches_filter("primary_link", &classes()));
        assert!(!matches_filter("residential", &classes()));
    }

    #[test]
    fn no_matching_roads_gives_empty_network() {
        let value = serde_json::json!({"elements": []});
        let network = parse_road_network(&response(value), &bbox(), &classes());
        assert!(network.is_empty());
        assert!(network.edges.is_empty());
    }
}
