//! Influence analytics over a [`GraphStore`](crate::store::GraphStore) snapshot.
//!
//! Every function here takes `&GraphStore` and recomputes its result from
//! scratch; nothing is cached between calls.
//!
//! - [`centrality`] - degree and betweenness centrality
//! - [`pagerank`] - weighted PageRank
//! - [`scoring`] - composite influence score and top influencers
//! - [`traversal`] - bounded influence chains
//! - [`engagement`] - mutual engagement over a user subset
//! - [`community`] - greedy modularity communities
//! - [`metrics`] - network-wide summaries

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::Degeneracy;

pub mod centrality;
pub mod community;
pub mod engagement;
pub mod metrics;
pub mod pagerank;
pub mod scoring;
pub mod traversal;

pub use centrality::{BetweennessCentrality, DegreeCentrality, NodeCentrality};
pub use community::{Community, CommunityDetector, CommunityReport};
pub use engagement::{Connection, MutualEngagement};
pub use metrics::{AnalyticsSummary, NetworkMetrics};
pub use pagerank::{PageRank, PageRankConfig};
pub use scoring::{InfluenceScorer, Influencer};
pub use traversal::{ChainEntry, InfluenceChain};

/// A metric value, or the reason it is undefined for the current graph.
///
/// Callers pick the substitute explicitly, e.g. `metric.unwrap_or_default()`
/// for zero-filled scores.
#[derive(Debug, Clone, PartialEq)]
pub enum Metric<T> {
    Value(T),
    Unavailable(Degeneracy),
}

impl<T> Metric<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Value(v) => Some(v),
            Self::Unavailable(_) => None,
        }
    }

    pub fn reason(&self) -> Option<Degeneracy> {
        match self {
            Self::Value(_) => None,
            Self::Unavailable(reason) => Some(*reason),
        }
    }

    pub fn unwrap_or_else(self, f: impl FnOnce(Degeneracy) -> T) -> T {
        match self {
            Self::Value(v) => v,
            Self::Unavailable(reason) => f(reason),
        }
    }

    pub fn into_result(self) -> Result<T, Degeneracy> {
        match self {
            Self::Value(v) => Ok(v),
            Self::Unavailable(reason) => Err(reason),
        }
    }
}

impl<T: Default> Metric<T> {
    pub fn unwrap_or_default(self) -> T {
        self.unwrap_or_else(|_| T::default())
    }
}

/// Per-node scores aligned with the store's node insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeScores {
    ids: Vec<String>,
    values: Vec<f64>,
    index: HashMap<String, usize>,
}

impl NodeScores {
    pub(crate) fn new(ids: Vec<String>, values: Vec<f64>) -> Self {
        let index = ids.iter().enumerate().map(|(i, id)| (id.clone(), i)).collect();
        Self { ids, values, index }
    }

    /// All-zero scores for every node of the graph.
    pub fn zeros(graph: &crate::store::GraphStore) -> Self {
        let ids: Vec<String> = graph.entities().map(|e| e.id.clone()).collect();
        let values = vec![0.0; ids.len()];
        Self::new(ids, values)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Score for a node id, if the node was part of the computation.
    pub fn score(&self, id: &str) -> Option<f64> {
        self.index.get(id).map(|&i| self.values[i])
    }

    pub(crate) fn at(&self, idx: usize) -> f64 {
        self.values.get(idx).copied().unwrap_or(0.0)
    }

    /// `(id, score)` in node insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.ids.iter().map(String::as_str).zip(self.values.iter().copied())
    }

    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    /// The first `n` entries in insertion order, unsorted.
    pub fn first_n(&self, n: usize) -> Vec<ScoreEntry> {
        self.iter()
            .take(n)
            .map(|(id, score)| ScoreEntry {
                id: id.to_string(),
                score,
            })
            .collect()
    }
}

/// A serializable `(id, score)` pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreEntry {
    pub id: String,
    pub score: f64,
}

/// Limits for the unbounded-cost computations (betweenness, communities).
#[derive(Debug, Clone, Copy, Default)]
pub struct ComputeBudget {
    /// Refuse graphs with more nodes than this.
    pub max_nodes: Option<usize>,
    /// Abandon the computation once this instant has passed.
    pub deadline: Option<Instant>,
}

impl ComputeBudget {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn new(max_nodes: Option<usize>, timeout: Option<Duration>) -> Self {
        Self {
            max_nodes,
            deadline: timeout.map(|t| Instant::now() + t),
        }
    }

    pub(crate) fn admits(&self, node_count: usize) -> bool {
        self.max_nodes.map_or(true, |limit| node_count <= limit)
    }

    pub(crate) fn expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_substitution() {
        let m: Metric<f64> = Metric::Unavailable(Degeneracy::NoEdges);
        assert_eq!(m.value(), None);
        assert_eq!(m.reason(), Some(Degeneracy::NoEdges));
        assert_eq!(m.clone().unwrap_or_else(|_| 0.5), 0.5);
        assert_eq!(m.unwrap_or_default(), 0.0);

        let v = Metric::Value(4.0);
        assert_eq!(v.value(), Some(&4.0));
        assert_eq!(v.into_result(), Ok(4.0));
    }

    #[test]
    fn scores_keep_insertion_order() {
        let scores = NodeScores::new(
            vec!["a".into(), "b".into(), "c".into()],
            vec![0.2, 0.5, 0.2],
        );
        assert_eq!(scores.first_n(2)[1].id, "b");
        assert_eq!(scores.first_n(5).len(), 3);
        assert_eq!(scores.score("c"), Some(0.2));
        assert_eq!(scores.score("zed"), None);
    }

    #[test]
    fn budget_limits() {
        let budget = ComputeBudget::new(Some(3), None);
        assert!(budget.admits(3));
        assert!(!budget.admits(4));
        assert!(!budget.expired());

        let expired = ComputeBudget::new(None, Some(Duration::ZERO));
        assert!(expired.expired());
    }
}
