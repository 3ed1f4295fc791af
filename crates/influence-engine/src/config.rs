//! Engine configuration

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::analytics::{ComputeBudget, PageRankConfig};

/// Runtime configuration for [`crate::InfluenceEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub pagerank: PageRankConfig,
    /// Hops followed by `influence_chain` when the caller gives none
    pub chain_depth: usize,
    /// Rows returned by `top_influencers` when the caller gives none
    pub top_limit: usize,
    /// Members ranked per community
    pub community_top_k: usize,
    /// PageRank entries included in the analytics summary
    pub analytics_pagerank_limit: usize,
    /// Betweenness, communities and path metrics refuse larger graphs
    pub max_graph_nodes: Option<usize>,
    /// Wall-clock limit for a single budgeted computation
    pub compute_timeout: Option<Duration>,
    /// Optional relationship schema (JSON)
    pub schema_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pagerank: PageRankConfig::default(),
            chain_depth: 3,
            top_limit: 10,
            community_top_k: 3,
            analytics_pagerank_limit: 10,
            max_graph_nodes: None,
            compute_timeout: None,
            schema_path: None,
        }
    }
}

impl EngineConfig {
    /// Read `INFLUENCE_*` environment variables; unset or unparsable values keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let mut pagerank = defaults.pagerank;
        if let Some(damping) = parse_var(&lookup, "INFLUENCE_PAGERANK_DAMPING") {
            pagerank = pagerank.with_damping_factor(damping);
        }
        if let Some(iterations) = parse_var(&lookup, "INFLUENCE_PAGERANK_MAX_ITERATIONS") {
            pagerank = pagerank.with_max_iterations(iterations);
        }
        if let Some(tolerance) = parse_var(&lookup, "INFLUENCE_PAGERANK_TOLERANCE") {
            pagerank = pagerank.with_tolerance(tolerance);
        }

        Self {
            pagerank,
            chain_depth: parse_var(&lookup, "INFLUENCE_CHAIN_DEPTH").unwrap_or(defaults.chain_depth),
            top_limit: parse_var(&lookup, "INFLUENCE_TOP_LIMIT").unwrap_or(defaults.top_limit),
            community_top_k: defaults.community_top_k,
            analytics_pagerank_limit: defaults.analytics_pagerank_limit,
            max_graph_nodes: parse_var(&lookup, "INFLUENCE_MAX_GRAPH_NODES"),
            compute_timeout: parse_var(&lookup, "INFLUENCE_COMPUTE_TIMEOUT_MS").map(Duration::from_millis),
            schema_path: lookup("INFLUENCE_SCHEMA_PATH")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
        }
    }

    /// A fresh budget; the deadline starts counting now.
    pub fn budget(&self) -> ComputeBudget {
        ComputeBudget::new(self.max_graph_nodes, self.compute_timeout)
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparsable setting");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> EngineConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EngineConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config_from(&[]);
        assert_eq!(config.chain_depth, 3);
        assert_eq!(config.top_limit, 10);
        assert_eq!(config.pagerank.damping_factor, 0.85);
        assert_eq!(config.pagerank.max_iterations, 100);
        assert!(config.max_graph_nodes.is_none());
        assert!(config.schema_path.is_none());
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("INFLUENCE_PAGERANK_DAMPING", "0.9"),
            ("INFLUENCE_PAGERANK_MAX_ITERATIONS", "250"),
            ("INFLUENCE_CHAIN_DEPTH", "5"),
            ("INFLUENCE_MAX_GRAPH_NODES", "5000"),
            ("INFLUENCE_COMPUTE_TIMEOUT_MS", "1500"),
            ("INFLUENCE_SCHEMA_PATH", "schema.json"),
        ]);
        assert_eq!(config.pagerank.damping_factor, 0.9);
        assert_eq!(config.pagerank.max_iterations, 250);
        assert_eq!(config.chain_depth, 5);
        assert_eq!(config.max_graph_nodes, Some(5000));
        assert_eq!(config.compute_timeout, Some(Duration::from_millis(1500)));
        assert_eq!(config.schema_path, Some(PathBuf::from("schema.json")));
    }

    #[test]
    fn unparsable_values_fall_back() {
        let config = config_from(&[
            ("INFLUENCE_TOP_LIMIT", "lots"),
            ("INFLUENCE_PAGERANK_TOLERANCE", ""),
        ]);
        assert_eq!(config.top_limit, 10);
        assert_eq!(config.pagerank.tolerance, 1e-6);
    }
}
