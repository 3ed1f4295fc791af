//! Composite influence score.
//!
//! ```text
//! effective  = max(follower_count, in_degree)
//! normalized = log10(effective + 1) / 6
//! score = 0.3*normalized + 0.2*engagement + 0.2*in_degree/n + 0.1*out_degree/n + 0.2*pagerank
//! ```
//!
//! The result is capped at 1.0 but has no lower bound: a negative
//! engagement score can push it below zero.

use std::cmp::Reverse;

use ordered_float::OrderedFloat;
use serde::Serialize;
use tracing::debug;

use crate::store::GraphStore;

use super::centrality::{BetweennessCentrality, DegreeCentrality};
use super::pagerank::{PageRank, PageRankConfig};
use super::{ComputeBudget, NodeScores};

const FOLLOWER_WEIGHT: f64 = 0.3;
const ENGAGEMENT_WEIGHT: f64 = 0.2;
const IN_DEGREE_WEIGHT: f64 = 0.2;
const OUT_DEGREE_WEIGHT: f64 = 0.1;
const PAGERANK_WEIGHT: f64 = 0.2;

/// log10 of the follower count treated as saturating (~1M followers).
const FOLLOWER_LOG_SCALE: f64 = 6.0;

/// Scores nodes of one graph snapshot. PageRank is computed once on
/// construction and shared by every score.
pub struct InfluenceScorer<'g> {
    graph: &'g GraphStore,
    pagerank: NodeScores,
}

impl<'g> InfluenceScorer<'g> {
    pub fn new(graph: &'g GraphStore, config: &PageRankConfig) -> Self {
        let pagerank = PageRank::compute(graph, config).unwrap_or_else(|reason| {
            debug!(%reason, "pagerank unavailable, scoring with zero rank");
            NodeScores::zeros(graph)
        });
        Self { graph, pagerank }
    }

    pub fn pagerank(&self) -> &NodeScores {
        &self.pagerank
    }

    /// Composite score for `id`; 0.0 for nodes absent from the graph.
    pub fn score(&self, id: &str) -> f64 {
        self.graph.index_of(id).map_or(0.0, |idx| self.score_at(idx))
    }

    pub(crate) fn score_at(&self, idx: usize) -> f64 {
        let graph = self.graph;
        let entity = graph.entity_at(idx);
        let n = graph.node_count().max(1) as f64;

        let effective = graph.effective_followers_at(idx) as f64;
        let normalized_followers = (effective + 1.0).log10() / FOLLOWER_LOG_SCALE;

        let score = FOLLOWER_WEIGHT * normalized_followers
            + ENGAGEMENT_WEIGHT * entity.engagement_score
            + IN_DEGREE_WEIGHT * (graph.in_degree_at(idx) as f64 / n)
            + OUT_DEGREE_WEIGHT * (graph.out_degree_at(idx) as f64 / n)
            + PAGERANK_WEIGHT * self.pagerank.at(idx);

        score.min(1.0)
    }
}

/// One row of the top-influencers ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Influencer {
    pub user: String,
    pub influence_score: f64,
    pub pagerank: f64,
    pub betweenness_centrality: f64,
    pub in_degree_centrality: f64,
    pub out_degree_centrality: f64,
    /// Effective follower count.
    pub follower_count: u64,
    pub engagement_score: f64,
    pub in_degree: usize,
    pub out_degree: usize,
}

impl Influencer {
    /// The `limit` highest-scoring nodes. Ties keep insertion order.
    pub fn top(
        graph: &GraphStore,
        limit: usize,
        config: &PageRankConfig,
        budget: &ComputeBudget,
    ) -> Vec<Influencer> {
        if graph.is_empty() {
            return Vec::new();
        }

        let scorer = InfluenceScorer::new(graph, config);
        let betweenness = BetweennessCentrality::compute(graph, budget).unwrap_or_else(|reason| {
            debug!(%reason, "betweenness unavailable, reporting zeros");
            NodeScores::zeros(graph)
        });
        let in_centrality = DegreeCentrality::in_degree(graph);
        let out_centrality = DegreeCentrality::out_degree(graph);

        let mut influencers: Vec<Influencer> = graph
            .entities()
            .enumerate()
            .map(|(idx, entity)| Influencer {
                user: entity.id.clone(),
                influence_score: scorer.score_at(idx),
                pagerank: scorer.pagerank().at(idx),
                betweenness_centrality: betweenness.at(idx),
                in_degree_centrality: in_centrality.at(idx),
                out_degree_centrality: out_centrality.at(idx),
                follower_count: graph.effective_followers_at(idx),
                engagement_score: entity.engagement_score,
                in_degree: graph.in_degree_at(idx),
                out_degree: graph.out_degree_at(idx),
            })
            .collect();

        influencers.sort_by_key(|i| Reverse(OrderedFloat(i.influence_score)));
        influencers.truncate(limit);
        influencers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Entity, Relationship};

    #[test]
    fn isolated_node_score() {
        let mut graph = GraphStore::new();
        graph.upsert_entity(Entity::new("alice").with_followers(999_999).with_engagement(0.5));

        let scorer = InfluenceScorer::new(&graph, &PageRankConfig::default());
        // log10(1e6)/6 = 1, no edges so no pagerank
        let expected = 0.3 * 1.0 + 0.2 * 0.5;
        assert!((scorer.score("alice") - expected).abs() < 1e-9);
    }

    #[test]
    fn absent_node_scores_zero() {
        let graph = GraphStore::new();
        let scorer = InfluenceScorer::new(&graph, &PageRankConfig::default());
        assert_eq!(scorer.score("ghost"), 0.0);
    }

    #[test]
    fn score_is_capped_at_one() {
        let mut graph = GraphStore::new();
        graph.upsert_entity(Entity::new("star").with_followers(u64::MAX / 2).with_engagement(10.0));
        let scorer = InfluenceScorer::new(&graph, &PageRankConfig::default());
        assert_eq!(scorer.score("star"), 1.0);
    }

    #[test]
    fn negative_engagement_is_not_clamped() {
        let mut graph = GraphStore::new();
        graph.upsert_entity(Entity::new("troll").with_engagement(-2.0));
        let scorer = InfluenceScorer::new(&graph, &PageRankConfig::default());
        assert!((scorer.score("troll") + 0.4).abs() < 1e-9);
    }

    #[test]
    fn in_degree_lifts_effective_followers() {
        let mut graph = GraphStore::new();
        graph.upsert_relationship(Relationship::new("a", "hub", "likes"));
        graph.upsert_relationship(Relationship::new("b", "hub", "likes"));
        let scorer = InfluenceScorer::new(&graph, &PageRankConfig::default());

        let pr = scorer.pagerank().score("hub").unwrap();
        let expected = 0.3 * (3.0f64).log10() / 6.0 + 0.2 * (2.0 / 3.0) + 0.2 * pr;
        assert!((scorer.score("hub") - expected).abs() < 1e-9);
    }

    #[test]
    fn top_influencers_empty_graph() {
        let graph = GraphStore::new();
        let top = Influencer::top(&graph, 10, &PageRankConfig::default(), &ComputeBudget::unlimited());
        assert!(top.is_empty());
    }

    #[test]
    fn top_influencers_ranked_and_limited() {
        let mut graph = GraphStore::new();
        graph.upsert_entity(Entity::new("small").with_followers(10));
        graph.upsert_entity(Entity::new("big").with_followers(100_000).with_engagement(0.9));
        graph.upsert_relationship(Relationship::new("small", "big", "mentions"));
        graph.upsert_entity(Entity::new("mid").with_followers(5_000));

        let top = Influencer::top(&graph, 2, &PageRankConfig::default(), &ComputeBudget::unlimited());
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].user, "big");
        assert_eq!(top[1].user, "mid");
        assert_eq!(top[0].in_degree, 1);
        assert!(top[0].influence_score >= top[1].influence_score);
    }
}
