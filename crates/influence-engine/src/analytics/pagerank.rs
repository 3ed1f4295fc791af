//! Weighted PageRank using the iterative power method.
//!
//! PR(u) = (1-d)/N + d * Σ(PR(v) * w(v,u) / W(v)) + d * D/N
//!
//! Where:
//! - d is the damping factor (0.85)
//! - w(v,u) is the weight of the edge v -> u and W(v) the total outgoing weight of v
//! - D is the rank mass held by dangling nodes (W(v) <= 0), spread uniformly

use crate::error::Degeneracy;
use crate::store::GraphStore;

use super::{Metric, NodeScores};

/// Configuration for PageRank.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRankConfig {
    /// Probability of following a link instead of jumping.
    /// Default: 0.85
    pub damping_factor: f64,

    /// Iteration cap.
    /// Default: 100
    pub max_iterations: usize,

    /// Stop once the L1 change between successive rank vectors drops below this.
    /// Default: 1e-6
    pub tolerance: f64,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            damping_factor: 0.85,
            max_iterations: 100,
            tolerance: 1e-6,
        }
    }
}

impl PageRankConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn with_damping_factor(mut self, damping_factor: f64) -> Self {
        self.damping_factor = damping_factor;
        self
    }

    pub const fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub const fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

pub struct PageRank;

impl PageRank {
    /// Compute PageRank for every node.
    ///
    /// Unavailable on a graph without edges, with any negative edge weight,
    /// and when the iteration cap is reached before the tolerance.
    pub fn compute(graph: &GraphStore, config: &PageRankConfig) -> Metric<NodeScores> {
        let n = graph.node_count();
        if n == 0 {
            return Metric::Unavailable(Degeneracy::EmptyGraph);
        }
        if graph.edge_count() == 0 {
            return Metric::Unavailable(Degeneracy::NoEdges);
        }
        if graph.relationships().any(|r| r.weight < 0.0) {
            return Metric::Unavailable(Degeneracy::NegativeWeight);
        }

        let out_weight: Vec<f64> = (0..n)
            .map(|i| graph.out_edges(i).map(|(_, w)| w).sum())
            .collect();

        let d = config.damping_factor;
        let nf = n as f64;
        let mut scores = vec![1.0 / nf; n];
        let mut next = vec![0.0; n];

        for _ in 0..config.max_iterations {
            let dangling_sum: f64 = (0..n)
                .filter(|&i| out_weight[i] <= 0.0)
                .map(|i| scores[i])
                .sum();
            let base = (1.0 - d) / nf + d * dangling_sum / nf;

            for (i, slot) in next.iter_mut().enumerate() {
                let link_sum: f64 = graph
                    .in_edges(i)
                    .filter(|&(j, _)| out_weight[j] > 0.0)
                    .map(|(j, w)| scores[j] * w / out_weight[j])
                    .sum();
                *slot = base + d * link_sum;
            }

            let delta: f64 = next.iter().zip(&scores).map(|(a, b)| (a - b).abs()).sum();
            std::mem::swap(&mut scores, &mut next);

            if delta < config.tolerance {
                let ids = graph.entities().map(|e| e.id.clone()).collect();
                return Metric::Value(NodeScores::new(ids, scores));
            }
        }

        Metric::Unavailable(Degeneracy::NotConverged {
            iterations: config.max_iterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Entity, Relationship};

    fn rel(s: &str, t: &str) -> Relationship {
        Relationship::new(s, t, "mentions")
    }

    #[test]
    fn config_defaults() {
        let config = PageRankConfig::default();
        assert!((config.damping_factor - 0.85).abs() < f64::EPSILON);
        assert_eq!(config.max_iterations, 100);
        assert!((config.tolerance - 1e-6).abs() < f64::EPSILON);
    }

    #[test]
    fn edgeless_graph_has_no_pagerank() {
        let mut graph = GraphStore::new();
        assert_eq!(
            PageRank::compute(&graph, &PageRankConfig::default()).reason(),
            Some(Degeneracy::EmptyGraph)
        );

        graph.upsert_entity(Entity::new("a"));
        graph.upsert_entity(Entity::new("b"));
        assert_eq!(
            PageRank::compute(&graph, &PageRankConfig::default()).reason(),
            Some(Degeneracy::NoEdges)
        );
    }

    #[test]
    fn cycle_is_uniform() {
        let mut graph = GraphStore::new();
        graph.upsert_relationship(rel("a", "b"));
        graph.upsert_relationship(rel("b", "c"));
        graph.upsert_relationship(rel("c", "a"));

        let scores = PageRank::compute(&graph, &PageRankConfig::default())
            .into_result()
            .unwrap();
        for (_, score) in scores.iter() {
            assert!((score - 1.0 / 3.0).abs() < 1e-6);
        }
    }

    #[test]
    fn sink_collects_rank_and_total_is_one() {
        let mut graph = GraphStore::new();
        graph.upsert_relationship(rel("a", "hub"));
        graph.upsert_relationship(rel("b", "hub"));
        graph.upsert_relationship(rel("c", "hub"));

        let scores = PageRank::compute(&graph, &PageRankConfig::default())
            .into_result()
            .unwrap();
        assert!((scores.sum() - 1.0).abs() < 1e-6);
        let hub = scores.score("hub").unwrap();
        assert!(["a", "b", "c"].iter().all(|id| scores.score(id).unwrap() < hub));
    }

    #[test]
    fn heavier_edge_carries_more_rank() {
        let mut graph = GraphStore::new();
        graph.upsert_relationship(rel("a", "light").with_weight(1.0));
        graph.upsert_relationship(rel("a", "heavy").with_weight(9.0));

        let scores = PageRank::compute(&graph, &PageRankConfig::default())
            .into_result()
            .unwrap();
        assert!(scores.score("heavy").unwrap() > scores.score("light").unwrap());
        assert!((scores.sum() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn negative_weight_makes_rank_unavailable() {
        let mut graph = GraphStore::new();
        graph.upsert_relationship(rel("a", "b").with_weight(3.0));
        graph.upsert_relationship(rel("a", "c").with_weight(-1.0));

        assert_eq!(
            PageRank::compute(&graph, &PageRankConfig::default()).reason(),
            Some(Degeneracy::NegativeWeight)
        );
    }

    #[test]
    fn iteration_cap_makes_rank_unavailable() {
        let mut graph = GraphStore::new();
        graph.upsert_relationship(rel("a", "b"));
        graph.upsert_relationship(rel("a", "c"));

        let config = PageRankConfig::new().with_max_iterations(1).with_tolerance(0.0);
        assert_eq!(
            PageRank::compute(&graph, &config).reason(),
            Some(Degeneracy::NotConverged { iterations: 1 })
        );
    }
}
