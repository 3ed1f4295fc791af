//! Bounded breadth-first influence chains.
//!
//! A node is recorded at the depth where it is first discovered and is
//! never enqueued twice. Nodes at exactly `depth` hops are included; the
//! traversal does not expand past them.

use std::collections::VecDeque;

use serde::Serialize;

use crate::error::{InfluenceError, Result};
use crate::store::GraphStore;

use super::pagerank::PageRankConfig;
use super::scoring::InfluenceScorer;

/// Direction of edges to follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Downstream: users this user influences.
    Outgoing,
    /// Upstream: users who influence this user.
    Incoming,
}

/// A node reached by an influence chain, with its raw stored attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainEntry {
    pub user: String,
    pub depth: usize,
    pub follower_count: u64,
    pub engagement_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfluenceChain {
    pub user: String,
    pub influence_score: f64,
    /// Effective follower count.
    pub follower_count: u64,
    pub engagement_score: f64,
    pub influenced_by: Vec<ChainEntry>,
    pub influences: Vec<ChainEntry>,
    pub total_influenced_by: usize,
    pub total_influences: usize,
}

impl InfluenceChain {
    /// Influence chain of `user` up to `depth` hops in each direction.
    pub fn compute(
        graph: &GraphStore,
        user: &str,
        depth: usize,
        config: &PageRankConfig,
    ) -> Result<InfluenceChain> {
        let start = graph
            .index_of(user)
            .ok_or_else(|| InfluenceError::UserNotFound(user.to_string()))?;

        let influences = bounded_bfs(graph, start, depth, Direction::Outgoing);
        let influenced_by = bounded_bfs(graph, start, depth, Direction::Incoming);

        let scorer = InfluenceScorer::new(graph, config);
        let entity = graph.entity_at(start);

        Ok(InfluenceChain {
            user: entity.id.clone(),
            influence_score: scorer.score_at(start),
            follower_count: graph.effective_followers_at(start),
            engagement_score: entity.engagement_score,
            total_influenced_by: influenced_by.len(),
            total_influences: influences.len(),
            influenced_by,
            influences,
        })
    }
}

/// Nodes reachable from `start` within `max_depth` hops, excluding `start`.
pub fn bounded_bfs(
    graph: &GraphStore,
    start: usize,
    max_depth: usize,
    direction: Direction,
) -> Vec<ChainEntry> {
    let mut visited = vec![false; graph.node_count()];
    visited[start] = true;

    let mut result = Vec::new();
    let mut queue = VecDeque::from([(start, 0usize)]);

    while let Some((node, depth)) = queue.pop_front() {
        if node != start {
            let entity = graph.entity_at(node);
            result.push(ChainEntry {
                user: entity.id.clone(),
                depth,
                follower_count: entity.follower_count,
                engagement_score: entity.engagement_score,
            });
        }
        if depth == max_depth {
            continue;
        }

        let neighbors: Vec<usize> = match direction {
            Direction::Outgoing => graph.out_edges(node).map(|(n, _)| n).collect(),
            Direction::Incoming => graph.in_edges(node).map(|(n, _)| n).collect(),
        };
        for neighbor in neighbors {
            if !visited[neighbor] {
                visited[neighbor] = true;
                queue.push_back((neighbor, depth + 1));
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Entity, Relationship};

    fn chain(graph: &GraphStore, user: &str, depth: usize) -> InfluenceChain {
        InfluenceChain::compute(graph, user, depth, &PageRankConfig::default()).unwrap()
    }

    #[test]
    fn follows_chain_from_followed_user() {
        let mut graph = GraphStore::new();
        graph.upsert_entity(Entity::new("alice").with_followers(5000).with_engagement(0.4));
        graph.upsert_relationship(Relationship::new("alice", "bob", "follows"));

        let result = chain(&graph, "bob", 1);
        assert_eq!(result.influences.len(), 1);
        assert_eq!(result.influences[0].user, "alice");
        assert_eq!(result.influences[0].depth, 1);
        assert_eq!(result.influences[0].follower_count, 5000);
        assert!(result.influenced_by.is_empty());
        assert_eq!(result.total_influences, 1);
        assert_eq!(result.total_influenced_by, 0);
    }

    #[test]
    fn unknown_user_is_an_error() {
        let graph = GraphStore::new();
        let err = InfluenceChain::compute(&graph, "nobody", 2, &PageRankConfig::default()).unwrap_err();
        assert!(matches!(err, InfluenceError::UserNotFound(ref u) if u == "nobody"));
    }

    #[test]
    fn depth_bound_is_inclusive() {
        let mut graph = GraphStore::new();
        for pair in ["a", "b", "c", "d", "e"].windows(2) {
            graph.upsert_relationship(Relationship::new(pair[0], pair[1], "shares"));
        }

        let result = chain(&graph, "a", 2);
        let users: Vec<_> = result.influences.iter().map(|e| (e.user.as_str(), e.depth)).collect();
        assert_eq!(users, vec![("b", 1), ("c", 2)]);

        let upstream = chain(&graph, "e", 3);
        let users: Vec<_> = upstream.influenced_by.iter().map(|e| e.user.as_str()).collect();
        assert_eq!(users, vec!["d", "c", "b"]);
    }

    #[test]
    fn first_discovery_depth_wins_and_start_is_excluded() {
        let mut graph = GraphStore::new();
        graph.upsert_relationship(Relationship::new("a", "b", "likes"));
        graph.upsert_relationship(Relationship::new("b", "c", "likes"));
        graph.upsert_relationship(Relationship::new("a", "c", "likes"));
        graph.upsert_relationship(Relationship::new("c", "a", "likes"));

        let result = chain(&graph, "a", 5);
        let users: Vec<_> = result.influences.iter().map(|e| (e.user.as_str(), e.depth)).collect();
        assert_eq!(users, vec![("b", 1), ("c", 1)]);
        assert!(result.influenced_by.iter().all(|e| e.user != "a"));
    }

    #[test]
    fn zero_depth_is_empty() {
        let mut graph = GraphStore::new();
        graph.upsert_relationship(Relationship::new("a", "b", "likes"));
        let result = chain(&graph, "a", 0);
        assert!(result.influences.is_empty());
        assert!(result.influenced_by.is_empty());
    }

    #[test]
    fn reports_effective_followers() {
        let mut graph = GraphStore::new();
        graph.upsert_relationship(Relationship::new("a", "hub", "likes"));
        graph.upsert_relationship(Relationship::new("b", "hub", "likes"));
        let result = chain(&graph, "hub", 1);
        assert_eq!(result.follower_count, 2);
        assert_eq!(result.total_influenced_by, 2);
    }
}
