//! Weighted betweenness centrality.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use petgraph::graph::DiGraph;
use petgraph::visit::EdgeRef;

/// Min-heap entry for Dijkstra.
#[derive(Debug, Clone, Copy)]
struct QueueEntry {
    cost: f64,
    node: usize,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Collapses parallel arcs to their shortest weight and drops self-loops.
fn adjacency<N, E, F>(graph: &DiGraph<N, E>, weight: F) -> Vec<Vec<(usize, f64)>>
where
    F: Fn(&E) -> f64,
{
    let mut shortest: BTreeMap<(usize, usize), f64> = BTreeMap::new();
    for edge in graph.edge_references() {
        let (from, to) = (edge.source().index(), edge.target().index());
        if from == to {
            continue;
        }
        let w = weight(edge.weight());
        shortest
            .entry((from, to))
            .and_modify(|current| *current = current.min(w))
            .or_insert(w);
    }

    let mut adjacency = vec![Vec::new(); graph.node_count()];
    for ((from, to), w) in shortest {
        adjacency[from].push((to, w));
    }
    adjacency
}

/// Betweenness centrality of every node of a directed graph, indexed like
/// the graph's nodes.
///
/// Shortest paths are measured with `weight`, which must be non-negative.
/// Path endpoints receive no credit and ties between equally short paths
/// share it. Values are scaled by `1 / ((n - 1)(n - 2))`; graphs with two
/// or fewer nodes are returned unscaled, which means all zeros.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn betweenness_centrality<N, E, F>(graph: &DiGraph<N, E>, weight: F) -> Vec<f64>
where
    F: Fn(&E) -> f64,
{
    let n = graph.node_count();
    let adjacency = adjacency(graph, weight);
    let mut centrality = vec![0.0; n];

    let mut dist = vec![f64::INFINITY; n];
    let mut sigma = vec![0.0_f64; n];
    let mut delta = vec![0.0_f64; n];
    let mut settled = vec![false; n];
    let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut order: Vec<usize> = Vec::with_capacity(n);
    let mut heap = BinaryHeap::new();

    for source in 0..n {
        dist.fill(f64::INFINITY);
        sigma.fill(0.0);
        delta.fill(0.0);
        settled.fill(false);
        preds.iter_mut().for_each(Vec::clear);
        order.clear();

        dist[source] = 0.0;
        sigma[source] = 1.0;
        heap.push(QueueEntry {
            cost: 0.0,
            node: source,
        });

        while let Some(QueueEntry { cost, node }) = heap.pop() {
            if settled[node] {
                continue;
            }
            settled[node] = true;
            order.push(node);

            for &(next, w) in &adjacency[node] {
                if settled[next] {
                    continue;
                }
                let candidate = cost + w;
                if candidate < dist[next] {
                    dist[next] = candidate;
                    sigma[next] = sigma[node];
                    preds[next].clear();
                    preds[next].push(node);
                    heap.push(QueueEntry {
                        cost: candidate,
                        node: next,
                    });
                } else if candidate == dist[next] {
                    sigma[next] += sigma[node];
                    preds[next].push(node);
                }
            }
        }

        while let Some(node) = order.pop() {
            for &pred in &preds[node] {
                delta[pred] += sigma[pred] / sigma[node] * (1.0 + delta[node]);
            }
            if node != source {
                centrality[node] += delta[node];
            }
        }
    }

    if n > 2 {
        #[allow(clippy::cast_precision_loss)]
        let scale = 1.0 / ((n - 1) * (n - 2)) as f64;
        for value in &mut centrality {
            *value *= scale;
        }
    }

    centrality
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    fn directed(n: usize, edges: &[(u32, u32, f64)]) -> DiGraph<(), f64> {
        let mut graph = DiGraph::new();
        for _ in 0..n {
            graph.add_node(());
        }
        graph.extend_with_edges(edges.iter().copied());
        graph
    }

    #[test]
    fn path_of_four_nodes() {
        let graph = directed(
            4,
            &[
                (0, 1, 1.0),
                (1, 0, 1.0),
                (1, 2, 1.0),
                (2, 1, 1.0),
                (2, 3, 1.0),
                (3, 2, 1.0),
            ],
        );
        let bc = betweenness_centrality(&graph, |w| *w);
        assert!(approx(bc[0], 0.0));
        assert!(approx(bc[1], 2.0 / 3.0), "{bc:?}");
        assert!(approx(bc[2], 2.0 / 3.0), "{bc:?}");
        assert!(approx(bc[3], 0.0));
    }

    #[test]
    fn equal_paths_split_credit() {
        let graph = directed(4, &[(0, 1, 1.0), (0, 2, 1.0), (1, 3, 1.0), (2, 3, 1.0)]);
        let bc = betweenness_centrality(&graph, |w| *w);
        assert!(approx(bc[1], 0.5 / 6.0), "{bc:?}");
        assert!(approx(bc[2], 0.5 / 6.0), "{bc:?}");
        assert!(approx(bc[0], 0.0));
        assert!(approx(bc[3], 0.0));
    }

    #[test]
    fn weights_decide_the_shortest_path() {
        let detour = directed(3, &[(0, 1, 1.0), (1, 2, 1.0), (0, 2, 5.0)]);
        let bc = betweenness_centrality(&detour, |w| *w);
        assert!(approx(bc[1], 0.5), "{bc:?}");

        let shortcut = directed(3, &[(0, 1, 1.0), (1, 2, 1.0), (0, 2, 1.5)]);
        let bc = betweenness_centrality(&shortcut, |w| *w);
        assert!(approx(bc[1], 0.0), "{bc:?}");
    }

    #[test]
    fn parallel_arcs_use_the_shortest() {
        let graph = directed(
            3,
            &[(0, 1, 1.0), (1, 2, 1.0), (0, 2, 5.0), (0, 2, 1.5), (1, 1, 0.1)],
        );
        let bc = betweenness_centrality(&graph, |w| *w);
        assert!(approx(bc[1], 0.0), "{bc:?}");
    }

    #[test]
    fn tiny_graphs_are_all_zero() {
        let graph = directed(2, &[(0, 1, 1.0), (1, 0, 1.0)]);
        assert_eq!(betweenness_centrality(&graph, |w| *w), vec![0.0, 0.0]);
        assert!(betweenness_centrality(&directed(0, &[]), |w: &f64| *w).is_empty());
    }
}
