//! Degree and betweenness centrality.
//!
//! Betweenness uses Brandes' algorithm (2001). When every edge weight is
//! 1.0 the single-source phase is a BFS over hop counts; otherwise edge
//! weights are additive distances and the phase runs Dijkstra.
//!
//! BC(v) = Σ (σ_st(v) / σ_st) for all s≠v≠t, scaled by 1/((n-1)(n-2))

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

use ordered_float::OrderedFloat;
use serde::Serialize;

use crate::error::Degeneracy;
use crate::store::GraphStore;

use super::pagerank::{PageRank, PageRankConfig};
use super::{ComputeBudget, Metric, NodeScores};

/// Degree centrality: degree / (n - 1), zero for every node when n <= 1.
pub struct DegreeCentrality;

impl DegreeCentrality {
    pub fn in_degree(graph: &GraphStore) -> NodeScores {
        Self::compute(graph, |g, i| g.in_degree_at(i))
    }

    pub fn out_degree(graph: &GraphStore) -> NodeScores {
        Self::compute(graph, |g, i| g.out_degree_at(i))
    }

    /// In-degree plus out-degree over n - 1.
    pub fn total(graph: &GraphStore) -> NodeScores {
        Self::compute(graph, |g, i| g.in_degree_at(i) + g.out_degree_at(i))
    }

    fn compute(graph: &GraphStore, degree: impl Fn(&GraphStore, usize) -> usize) -> NodeScores {
        let n = graph.node_count();
        if n <= 1 {
            return NodeScores::zeros(graph);
        }
        let scale = 1.0 / (n - 1) as f64;
        let ids = graph.entities().map(|e| e.id.clone()).collect();
        let values = (0..n).map(|i| degree(graph, i) as f64 * scale).collect();
        NodeScores::new(ids, values)
    }
}

pub struct BetweennessCentrality;

impl BetweennessCentrality {
    /// Normalized directed betweenness for every node.
    ///
    /// Unavailable for empty graphs, negative weights, or when the budget
    /// is exceeded. Pairs without a path contribute nothing.
    pub fn compute(graph: &GraphStore, budget: &ComputeBudget) -> Metric<NodeScores> {
        let n = graph.node_count();
        if n == 0 {
            return Metric::Unavailable(Degeneracy::EmptyGraph);
        }
        if !budget.admits(n) {
            return Metric::Unavailable(Degeneracy::BudgetExceeded);
        }

        let weights: Vec<f64> = graph
            .relationships()
            .map(|r| r.weight)
            .collect();
        if weights.iter().any(|&w| w < 0.0) {
            return Metric::Unavailable(Degeneracy::NegativeWeight);
        }
        let weighted = weights.iter().any(|&w| w != 1.0);

        let neighbors: Vec<Vec<(usize, f64)>> = (0..n).map(|i| graph.out_edges(i).collect()).collect();

        let mut centrality = vec![0.0; n];
        for s in 0..n {
            if budget.expired() {
                return Metric::Unavailable(Degeneracy::BudgetExceeded);
            }

            let paths = if weighted {
                Self::dijkstra_paths(&neighbors, s)
            } else {
                Self::bfs_paths(&neighbors, s)
            };

            // Accumulation phase
            let mut delta = vec![0.0; n];
            for &w in paths.order.iter().rev() {
                for &v in &paths.predecessors[w] {
                    delta[v] += (paths.sigma[v] / paths.sigma[w]) * (1.0 + delta[w]);
                }
                if w != s {
                    centrality[w] += delta[w];
                }
            }
        }

        if n > 2 {
            let scale = 1.0 / ((n - 1) * (n - 2)) as f64;
            for score in &mut centrality {
                *score *= scale;
            }
        }

        let ids = graph.entities().map(|e| e.id.clone()).collect();
        Metric::Value(NodeScores::new(ids, centrality))
    }

    fn bfs_paths(neighbors: &[Vec<(usize, f64)>], s: usize) -> ShortestPaths {
        let n = neighbors.len();
        let mut paths = ShortestPaths::new(n, s);
        let mut dist: Vec<i64> = vec![-1; n];
        dist[s] = 0;

        let mut queue = VecDeque::from([s]);
        while let Some(v) = queue.pop_front() {
            paths.order.push(v);
            for &(w, _) in &neighbors[v] {
                if dist[w] < 0 {
                    dist[w] = dist[v] + 1;
                    queue.push_back(w);
                }
                if dist[w] == dist[v] + 1 {
                    paths.sigma[w] += paths.sigma[v];
                    paths.predecessors[w].push(v);
                }
            }
        }
        paths
    }

    fn dijkstra_paths(neighbors: &[Vec<(usize, f64)>], s: usize) -> ShortestPaths {
        let n = neighbors.len();
        let mut paths = ShortestPaths::new(n, s);
        let mut dist: Vec<Option<f64>> = vec![None; n];
        let mut settled = vec![false; n];
        let mut heap = BinaryHeap::new();

        dist[s] = Some(0.0);
        heap.push(Reverse((OrderedFloat(0.0), s)));

        while let Some(Reverse((OrderedFloat(d), v))) = heap.pop() {
            if settled[v] {
                continue;
            }
            settled[v] = true;
            paths.order.push(v);

            for &(w, weight) in &neighbors[v] {
                let candidate = d + weight;
                match dist[w] {
                    Some(current) if candidate > current => {}
                    Some(current) if candidate == current => {
                        if !settled[w] {
                            paths.sigma[w] += paths.sigma[v];
                            paths.predecessors[w].push(v);
                        }
                    }
                    _ => {
                        if settled[w] {
                            continue;
                        }
                        dist[w] = Some(candidate);
                        paths.sigma[w] = paths.sigma[v];
                        paths.predecessors[w] = vec![v];
                        heap.push(Reverse((OrderedFloat(candidate), w)));
                    }
                }
            }
        }
        paths
    }
}

/// Single-source shortest-path DAG used by the accumulation phase.
struct ShortestPaths {
    /// Nodes in non-decreasing distance order.
    order: Vec<usize>,
    predecessors: Vec<Vec<usize>>,
    /// Number of shortest paths from the source.
    sigma: Vec<f64>,
}

impl ShortestPaths {
    fn new(n: usize, source: usize) -> Self {
        let mut sigma = vec![0.0; n];
        sigma[source] = 1.0;
        Self {
            order: Vec::with_capacity(n),
            predecessors: vec![Vec::new(); n],
            sigma,
        }
    }
}

/// All centrality measures for one node; unavailable measures are zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeCentrality {
    pub user: String,
    pub degree_centrality: f64,
    pub in_degree_centrality: f64,
    pub out_degree_centrality: f64,
    pub betweenness_centrality: f64,
    pub pagerank: f64,
}

impl NodeCentrality {
    /// Centrality bundle for every node, in insertion order.
    pub fn for_all(
        graph: &GraphStore,
        pagerank: &PageRankConfig,
        budget: &ComputeBudget,
    ) -> Vec<NodeCentrality> {
        let degree = DegreeCentrality::total(graph);
        let in_degree = DegreeCentrality::in_degree(graph);
        let out_degree = DegreeCentrality::out_degree(graph);
        let betweenness = BetweennessCentrality::compute(graph, budget)
            .unwrap_or_else(|_| NodeScores::zeros(graph));
        let ranks = PageRank::compute(graph, pagerank).unwrap_or_else(|_| NodeScores::zeros(graph));

        graph
            .entities()
            .enumerate()
            .map(|(i, entity)| NodeCentrality {
                user: entity.id.clone(),
                degree_centrality: degree.at(i),
                in_degree_centrality: in_degree.at(i),
                out_degree_centrality: out_degree.at(i),
                betweenness_centrality: betweenness.at(i),
                pagerank: ranks.at(i),
            })
            .collect()
    }
}
