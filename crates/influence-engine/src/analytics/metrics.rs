//! Whole-graph summaries: the analytics overview and structural network
//! metrics (connectivity, clustering, path lengths).

use std::collections::{BTreeSet, VecDeque};

use serde::Serialize;
use tracing::debug;

use crate::error::{Degeneracy, InfluenceError, Result};
use crate::store::GraphStore;

use super::pagerank::{PageRank, PageRankConfig};
use super::{ComputeBudget, Metric, ScoreEntry};

/// Dashboard overview of the current graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub density: f64,
    pub is_connected: bool,
    pub average_clustering: f64,
    /// First `limit` PageRank entries in node insertion order.
    pub pagerank: Vec<ScoreEntry>,
}

impl AnalyticsSummary {
    pub fn compute(graph: &GraphStore, config: &PageRankConfig, limit: usize) -> Self {
        let n = graph.node_count();
        if n == 0 {
            return Self {
                total_nodes: 0,
                total_edges: 0,
                density: 0.0,
                is_connected: false,
                average_clustering: 0.0,
                pagerank: Vec::new(),
            };
        }

        let pagerank = match PageRank::compute(graph, config) {
            Metric::Value(scores) => scores.first_n(limit),
            Metric::Unavailable(reason) => {
                debug!(%reason, "pagerank omitted from analytics");
                Vec::new()
            }
        };

        Self {
            total_nodes: n,
            total_edges: graph.edge_count(),
            density: if graph.edge_count() > 0 { graph.density() } else { 0.0 },
            is_connected: n == 1 || is_weakly_connected(graph),
            average_clustering: if n > 1 {
                ClusteringMetrics::compute(graph).avg_clustering
            } else {
                0.0
            },
            pagerank,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicMetrics {
    pub num_nodes: usize,
    pub num_edges: usize,
    pub density: f64,
    /// Weak connectivity.
    pub is_connected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DegreeAverages {
    pub avg_degree: f64,
    pub avg_in_degree: f64,
    pub avg_out_degree: f64,
}

/// Clustering over the undirected projection, self-loops ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClusteringMetrics {
    pub avg_clustering: f64,
    pub transitivity: f64,
}

/// Unweighted directed path lengths.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PathMetrics {
    pub avg_shortest_path: f64,
    pub diameter: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkMetrics {
    pub basic_metrics: BasicMetrics,
    pub centrality_metrics: DegreeAverages,
    pub clustering: ClusteringMetrics,
    /// Present only for weakly connected graphs; zeros unless strongly connected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_metrics: Option<PathMetrics>,
}

impl NetworkMetrics {
    pub fn compute(graph: &GraphStore, budget: &ComputeBudget) -> Result<NetworkMetrics> {
        let n = graph.node_count();
        if n == 0 {
            return Err(InfluenceError::ComputationDegenerate(Degeneracy::EmptyGraph));
        }

        let weakly_connected = is_weakly_connected(graph);
        let edges = graph.edge_count() as f64;

        let path_metrics = weakly_connected.then(|| {
            PathMetrics::compute(graph, budget).unwrap_or_else(|reason| {
                debug!(%reason, "path metrics unavailable, reporting zeros");
                PathMetrics::default()
            })
        });

        Ok(NetworkMetrics {
            basic_metrics: BasicMetrics {
                num_nodes: n,
                num_edges: graph.edge_count(),
                density: graph.density(),
                is_connected: weakly_connected,
            },
            centrality_metrics: DegreeAverages {
                avg_degree: 2.0 * edges / n as f64,
                avg_in_degree: edges / n as f64,
                avg_out_degree: edges / n as f64,
            },
            clustering: ClusteringMetrics::compute(graph),
            path_metrics,
        })
    }
}

impl ClusteringMetrics {
    pub fn compute(graph: &GraphStore) -> Self {
        let neighbors = undirected_neighbors(graph);
        if neighbors.is_empty() {
            return Self::default();
        }

        let mut coefficient_sum = 0.0;
        let mut closed = 0.0;
        let mut triads = 0.0;
        for adjacent in &neighbors {
            let degree = adjacent.len() as f64;
            if degree < 2.0 {
                continue;
            }
            let adjacent: Vec<usize> = adjacent.iter().copied().collect();
            let mut links = 0usize;
            for (i, &a) in adjacent.iter().enumerate() {
                for &b in &adjacent[i + 1..] {
                    if neighbors[a].contains(&b) {
                        links += 1;
                    }
                }
            }
            let possible = degree * (degree - 1.0);
            coefficient_sum += 2.0 * links as f64 / possible;
            closed += 2.0 * links as f64;
            triads += possible;
        }

        Self {
            avg_clustering: coefficient_sum / neighbors.len() as f64,
            transitivity: if closed > 0.0 { closed / triads } else { 0.0 },
        }
    }
}

impl PathMetrics {
    /// All-pairs BFS over directed edges. Unavailable unless every node
    /// reaches every other.
    pub fn compute(graph: &GraphStore, budget: &ComputeBudget) -> Metric<PathMetrics> {
        let n = graph.node_count();
        if n == 0 {
            return Metric::Unavailable(Degeneracy::EmptyGraph);
        }
        if n == 1 {
            return Metric::Value(PathMetrics::default());
        }
        if !budget.admits(n) {
            return Metric::Unavailable(Degeneracy::BudgetExceeded);
        }
        if !is_strongly_connected(graph) {
            return Metric::Unavailable(Degeneracy::Disconnected);
        }

        let mut total = 0usize;
        let mut diameter = 0usize;
        for source in 0..n {
            if budget.expired() {
                return Metric::Unavailable(Degeneracy::BudgetExceeded);
            }
            let distances = hop_distances(graph, source);
            for (target, distance) in distances.iter().enumerate() {
                if target == source {
                    continue;
                }
                match distance {
                    Some(d) => {
                        total += d;
                        diameter = diameter.max(*d);
                    }
                    None => return Metric::Unavailable(Degeneracy::Disconnected),
                }
            }
        }

        Metric::Value(PathMetrics {
            avg_shortest_path: total as f64 / (n * (n - 1)) as f64,
            diameter,
        })
    }
}

/// Every node reachable from every other ignoring direction.
/// An empty graph is not connected.
pub fn is_weakly_connected(graph: &GraphStore) -> bool {
    let n = graph.node_count();
    if n == 0 {
        return false;
    }
    let mut seen = vec![false; n];
    seen[0] = true;
    let mut count = 1;
    let mut queue = VecDeque::from([0usize]);
    while let Some(node) = queue.pop_front() {
        for (next, _) in graph.out_edges(node).chain(graph.in_edges(node)) {
            if !seen[next] {
                seen[next] = true;
                count += 1;
                queue.push_back(next);
            }
        }
    }
    count == n
}

/// Every node reachable from every other along edge direction.
pub fn is_strongly_connected(graph: &GraphStore) -> bool {
    let n = graph.node_count();
    if n == 0 {
        return false;
    }
    let forward = hop_distances(graph, 0);
    if forward.iter().any(Option::is_none) {
        return false;
    }
    // Reachability to node 0 over reversed edges.
    let mut seen = vec![false; n];
    seen[0] = true;
    let mut queue = VecDeque::from([0usize]);
    while let Some(node) = queue.pop_front() {
        for (prev, _) in graph.in_edges(node) {
            if !seen[prev] {
                seen[prev] = true;
                queue.push_back(prev);
            }
        }
    }
    seen.into_iter().all(|s| s)
}

fn hop_distances(graph: &GraphStore, source: usize) -> Vec<Option<usize>> {
    let mut distances = vec![None; graph.node_count()];
    distances[source] = Some(0);
    let mut queue = VecDeque::from([source]);
    while let Some(node) = queue.pop_front() {
        let next_distance = distances[node].map_or(0, |d| d + 1);
        for (next, _) in graph.out_edges(node) {
            if distances[next].is_none() {
                distances[next] = Some(next_distance);
                queue.push_back(next);
            }
        }
    }
    distances
}

fn undirected_neighbors(graph: &GraphStore) -> Vec<BTreeSet<usize>> {
    let mut neighbors = vec![BTreeSet::new(); graph.node_count()];
    for edge in graph.edge_records() {
        let (u, v) = (edge.source as usize, edge.target as usize);
        if u != v {
            neighbors[u].insert(v);
            neighbors[v].insert(u);
        }
    }
    neighbors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Entity, Relationship};

    fn graph_of(pairs: &[(&str, &str)]) -> GraphStore {
        let mut graph = GraphStore::new();
        for (s, t) in pairs {
            graph.upsert_relationship(Relationship::new(*s, *t, "mentions"));
        }
        graph
    }

    #[test]
    fn summary_of_empty_graph() {
        let summary = AnalyticsSummary::compute(&GraphStore::new(), &PageRankConfig::default(), 10);
        assert_eq!(summary.total_nodes, 0);
        assert!(!summary.is_connected);
        assert!(summary.pagerank.is_empty());
    }

    #[test]
    fn summary_of_single_node() {
        let mut graph = GraphStore::new();
        graph.upsert_entity(Entity::new("solo"));
        let summary = AnalyticsSummary::compute(&graph, &PageRankConfig::default(), 10);
        assert!(summary.is_connected);
        assert_eq!(summary.density, 0.0);
        assert_eq!(summary.average_clustering, 0.0);
        assert!(summary.pagerank.is_empty());
    }

    #[test]
    fn summary_pagerank_in_insertion_order() {
        let graph = graph_of(&[("a", "b"), ("b", "c"), ("c", "a")]);
        let summary = AnalyticsSummary::compute(&graph, &PageRankConfig::default(), 2);
        let ids: Vec<_> = summary.pagerank.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(summary.is_connected);
        assert!((summary.average_clustering - 1.0).abs() < 1e-12);
        assert!((summary.density - 0.5).abs() < 1e-12);
    }

    #[test]
    fn clustering_of_triangle_with_tail() {
        let graph = graph_of(&[("a", "b"), ("b", "c"), ("c", "a"), ("c", "d")]);
        let clustering = ClusteringMetrics::compute(&graph);
        // a, b: 1.0; c: 1/3; d: 0
        assert!((clustering.avg_clustering - (2.0 + 1.0 / 3.0) / 4.0).abs() < 1e-12);
        // 6 closed / (2 + 2 + 6)
        assert!((clustering.transitivity - 0.6).abs() < 1e-12);
    }

    #[test]
    fn connectivity_checks() {
        let cycle = graph_of(&[("a", "b"), ("b", "c"), ("c", "a")]);
        assert!(is_weakly_connected(&cycle));
        assert!(is_strongly_connected(&cycle));

        let path = graph_of(&[("a", "b"), ("b", "c")]);
        assert!(is_weakly_connected(&path));
        assert!(!is_strongly_connected(&path));

        let mut split = graph_of(&[("a", "b")]);
        split.upsert_entity(Entity::new("c"));
        assert!(!is_weakly_connected(&split));
    }

    #[test]
    fn path_metrics_only_when_strongly_connected() {
        let cycle = graph_of(&[("a", "b"), ("b", "c"), ("c", "a")]);
        let metrics = NetworkMetrics::compute(&cycle, &ComputeBudget::unlimited()).unwrap();
        let paths = metrics.path_metrics.unwrap();
        assert!((paths.avg_shortest_path - 1.5).abs() < 1e-12);
        assert_eq!(paths.diameter, 2);

        let path = graph_of(&[("a", "b"), ("b", "c")]);
        let metrics = NetworkMetrics::compute(&path, &ComputeBudget::unlimited()).unwrap();
        assert_eq!(metrics.path_metrics, Some(PathMetrics::default()));
        assert_eq!(
            PathMetrics::compute(&path, &ComputeBudget::unlimited()).reason(),
            Some(Degeneracy::Disconnected)
        );

        let mut split = graph_of(&[("a", "b")]);
        split.upsert_entity(Entity::new("c"));
        let metrics = NetworkMetrics::compute(&split, &ComputeBudget::unlimited()).unwrap();
        assert!(metrics.path_metrics.is_none());
        assert!(!metrics.basic_metrics.is_connected);
    }

    #[test]
    fn degree_averages() {
        let graph = graph_of(&[("a", "b"), ("a", "c")]);
        let metrics = NetworkMetrics::compute(&graph, &ComputeBudget::unlimited()).unwrap();
        assert!((metrics.centrality_metrics.avg_degree - 4.0 / 3.0).abs() < 1e-12);
        assert!((metrics.centrality_metrics.avg_in_degree - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn empty_graph_is_degenerate() {
        let err = NetworkMetrics::compute(&GraphStore::new(), &ComputeBudget::unlimited()).unwrap_err();
        assert!(matches!(
            err,
            InfluenceError::ComputationDegenerate(Degeneracy::EmptyGraph)
        ));
    }
}
