//! Community detection by greedy modularity maximization
//! (Clauset–Newman–Moore).
//!
//! # Algorithm
//!
//! 1. Project the directed graph onto an undirected one. When both
//!    directions exist, the weight of the direction created first is used.
//! 2. Start with every node in its own community.
//! 3. Repeatedly merge the pair of communities with the largest positive
//!    modularity gain ΔQ = 2(e_ij − a_i·a_j).
//! 4. Stop when no merge increases Q.
//!
//! Q = Σ_c [ L_c/m − (K_c/2m)² ], where L_c is the weight inside c, K_c the
//! total degree of c and m the total edge weight. With unit weights this is
//! the edge-count form.
//!
//! Equal gains are resolved in favour of the lowest `(i, j)` pair of
//! community representatives, a community's representative being its
//! earliest-inserted member.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use ordered_float::OrderedFloat;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Degeneracy;
use crate::store::GraphStore;

use super::pagerank::PageRankConfig;
use super::scoring::InfluenceScorer;
use super::{ComputeBudget, Metric};

/// Gains at or below this are treated as no improvement.
const MIN_GAIN: f64 = 1e-12;

/// A member ranked inside its community.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommunityMember {
    pub user: String,
    pub influence_score: f64,
    pub follower_count: u64,
    pub engagement_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Community {
    pub id: usize,
    pub nodes: Vec<String>,
    pub size: usize,
    pub top_influencers: Vec<CommunityMember>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommunityReport {
    pub communities: Vec<Community>,
    pub modularity: f64,
    pub num_communities: usize,
    /// Set when detection could not run on the current graph.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommunityReport {
    fn empty(error: Option<String>) -> Self {
        Self {
            communities: Vec::new(),
            modularity: 0.0,
            num_communities: 0,
            error,
        }
    }
}

/// Node partition with its modularity, communities ordered by representative.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub communities: Vec<Vec<usize>>,
    pub modularity: f64,
}

pub struct CommunityDetector;

impl CommunityDetector {
    /// Detect communities and rank the top `top_k` members of each.
    ///
    /// Never fails: graphs with fewer than two nodes give an empty report,
    /// and degenerate graphs give an empty report with `error` set.
    pub fn detect(
        graph: &GraphStore,
        config: &PageRankConfig,
        budget: &ComputeBudget,
        top_k: usize,
    ) -> CommunityReport {
        if graph.node_count() < 2 {
            return CommunityReport::empty(None);
        }

        let partition = match Self::partition(graph, budget) {
            Metric::Value(partition) => partition,
            Metric::Unavailable(reason) => {
                warn!(%reason, "community detection skipped");
                return CommunityReport::empty(Some(reason.to_string()));
            }
        };

        let scorer = InfluenceScorer::new(graph, config);
        let communities: Vec<Community> = partition
            .communities
            .iter()
            .enumerate()
            .map(|(id, members)| {
                let mut ranked: Vec<CommunityMember> = members
                    .iter()
                    .map(|&idx| {
                        let entity = graph.entity_at(idx);
                        CommunityMember {
                            user: entity.id.clone(),
                            influence_score: scorer.score_at(idx),
                            follower_count: entity.follower_count,
                            engagement_score: entity.engagement_score,
                        }
                    })
                    .collect();
                // stable: equal scores keep insertion order
                ranked.sort_by_key(|m| Reverse(OrderedFloat(m.influence_score)));
                ranked.truncate(top_k);

                Community {
                    id,
                    nodes: members.iter().map(|&idx| graph.entity_at(idx).id.clone()).collect(),
                    size: members.len(),
                    top_influencers: ranked,
                }
            })
            .collect();

        debug!(
            communities = communities.len(),
            modularity = partition.modularity,
            "communities detected"
        );

        CommunityReport {
            num_communities: communities.len(),
            communities,
            modularity: partition.modularity,
            error: None,
        }
    }

    /// Greedy modularity partition of the undirected projection.
    pub fn partition(graph: &GraphStore, budget: &ComputeBudget) -> Metric<Partition> {
        let n = graph.node_count();
        if n < 2 {
            return Metric::Unavailable(Degeneracy::TooFewNodes { required: 2 });
        }
        if graph.edge_count() == 0 {
            return Metric::Unavailable(Degeneracy::NoEdges);
        }
        if !budget.admits(n) {
            return Metric::Unavailable(Degeneracy::BudgetExceeded);
        }

        let projection = UndirectedProjection::build(graph);
        let m = projection.total_weight;
        if m <= 0.0 {
            return Metric::Unavailable(Degeneracy::NonPositiveWeight);
        }
        let two_m = 2.0 * m;

        // Communities are indexed by representative; `alive` marks the live ones.
        let mut members: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();
        let mut alive = vec![true; n];
        let mut a: Vec<f64> = (0..n).map(|i| projection.degree(i) / two_m).collect();
        let mut e: Vec<BTreeMap<usize, f64>> = projection
            .adjacency
            .iter()
            .map(|row| row.iter().map(|(&j, &w)| (j, w / two_m)).collect())
            .collect();

        loop {
            if budget.expired() {
                return Metric::Unavailable(Degeneracy::BudgetExceeded);
            }

            let mut best: Option<(f64, usize, usize)> = None;
            for i in (0..n).filter(|&i| alive[i]) {
                for (&j, &e_ij) in e[i].range(i + 1..) {
                    let gain = 2.0 * (e_ij - a[i] * a[j]);
                    if best.map_or(true, |(g, _, _)| gain > g + MIN_GAIN) {
                        best = Some((gain, i, j));
                    }
                }
            }

            let Some((gain, i, j)) = best else { break };
            if gain <= MIN_GAIN {
                break;
            }

            // Merge j into i (i < j keeps the lower representative).
            let row_j = std::mem::take(&mut e[j]);
            for (k, e_jk) in row_j {
                if k == i {
                    continue;
                }
                e[k].remove(&j);
                *e[k].entry(i).or_insert(0.0) += e_jk;
                *e[i].entry(k).or_insert(0.0) += e_jk;
            }
            e[i].remove(&j);

            a[i] += a[j];
            let moved = std::mem::take(&mut members[j]);
            members[i].extend(moved);
            members[i].sort_unstable();
            alive[j] = false;
        }

        let communities: Vec<Vec<usize>> = (0..n)
            .filter(|&i| alive[i])
            .map(|i| std::mem::take(&mut members[i]))
            .collect();
        let modularity = projection.modularity(&communities);

        Metric::Value(Partition {
            communities,
            modularity,
        })
    }
}

/// Undirected, weighted view of the store used for modularity.
pub(crate) struct UndirectedProjection {
    /// Neighbor -> weight, self-loops excluded.
    pub adjacency: Vec<BTreeMap<usize, f64>>,
    pub self_loops: Vec<f64>,
    pub total_weight: f64,
}

impl UndirectedProjection {
    pub fn build(graph: &GraphStore) -> Self {
        let n = graph.node_count();
        let mut adjacency: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); n];
        let mut self_loops = vec![0.0; n];
        let mut total_weight = 0.0;

        // Edge records are in creation order, so the first direction seen wins.
        for edge in graph.edge_records() {
            let (u, v) = (edge.source as usize, edge.target as usize);
            let w = edge.relationship.weight;
            if u == v {
                self_loops[u] = w;
                total_weight += w;
            } else if !adjacency[u].contains_key(&v) {
                adjacency[u].insert(v, w);
                adjacency[v].insert(u, w);
                total_weight += w;
            }
        }

        Self {
            adjacency,
            self_loops,
            total_weight,
        }
    }

    /// Weighted degree; a self-loop counts twice.
    pub fn degree(&self, u: usize) -> f64 {
        self.adjacency[u].values().sum::<f64>() + 2.0 * self.self_loops[u]
    }

    pub fn modularity(&self, communities: &[Vec<usize>]) -> f64 {
        let m = self.total_weight;
        if m <= 0.0 {
            return 0.0;
        }

        let mut assignment: HashMap<usize, usize> = HashMap::new();
        for (c, nodes) in communities.iter().enumerate() {
            for &node in nodes {
                assignment.insert(node, c);
            }
        }

        let mut q = 0.0;
        for (c, nodes) in communities.iter().enumerate() {
            let mut internal = 0.0;
            let mut degree = 0.0;
            for &u in nodes {
                degree += self.degree(u);
                internal += self.self_loops[u];
                internal += self.adjacency[u]
                    .iter()
                    .filter(|(&v, _)| v > u && assignment.get(&v) == Some(&c))
                    .map(|(_, &w)| w)
                    .sum::<f64>();
            }
            q += internal / m - (degree / (2.0 * m)).powi(2);
        }
        q
    }
}
