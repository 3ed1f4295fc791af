//! Mutual engagement within a chosen subset of users: direct connections,
//! a weight matrix and shared neighbours.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::error::{InfluenceError, Result};
use crate::store::GraphStore;

/// A direct relationship between two users of the analyzed subset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Connection {
    pub from: String,
    pub to: String,
    pub relationship_type: String,
    pub weight: f64,
}

/// Pairwise engagement among a subset of users.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MutualEngagement {
    /// The requested users that exist, first occurrence order.
    pub users: Vec<String>,
    pub mutual_connections: Vec<Connection>,
    /// Keyed `"<user1>-<user2>"` for each pair with shared neighbors.
    pub common_neighbors: BTreeMap<String, Vec<String>>,
    /// `matrix[from][to]` = edge weight, 0 when there is no direct edge.
    pub engagement_matrix: BTreeMap<String, BTreeMap<String, f64>>,
    /// Directed connections found over `k * (k - 1)`.
    pub mutual_engagement_score: f64,
    pub total_connections: usize,
    pub possible_connections: usize,
}

impl MutualEngagement {
    pub fn compute<S: AsRef<str>>(graph: &GraphStore, users: &[S]) -> Result<MutualEngagement> {
        if users.is_empty() {
            return Err(InfluenceError::EmptyInput);
        }

        let mut seen = HashSet::new();
        let valid: Vec<usize> = users
            .iter()
            .filter_map(|u| graph.index_of(u.as_ref()))
            .filter(|idx| seen.insert(*idx))
            .collect();
        if valid.is_empty() {
            return Err(InfluenceError::NoValidUsers);
        }

        let id = |idx: usize| graph.entity_at(idx).id.clone();

        let mut mutual_connections = Vec::new();
        let mut engagement_matrix: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
        for &from in &valid {
            let row = engagement_matrix.entry(id(from)).or_default();
            for &to in &valid {
                if from == to {
                    continue;
                }
                let from_id = graph.entity_at(from).id.as_str();
                let to_id = graph.entity_at(to).id.as_str();
                match graph.relationship(from_id, to_id) {
                    Some(rel) => {
                        mutual_connections.push(Connection {
                            from: from_id.to_string(),
                            to: to_id.to_string(),
                            relationship_type: rel.relationship_type.clone(),
                            weight: rel.weight,
                        });
                        row.insert(to_id.to_string(), rel.weight);
                    }
                    None => {
                        row.insert(to_id.to_string(), 0.0);
                    }
                }
            }
        }

        let neighborhoods: Vec<HashSet<usize>> = valid
            .iter()
            .map(|&idx| {
                graph
                    .out_edges(idx)
                    .chain(graph.in_edges(idx))
                    .map(|(n, _)| n)
                    .collect()
            })
            .collect();

        let mut common_neighbors = BTreeMap::new();
        for i in 0..valid.len() {
            for j in (i + 1)..valid.len() {
                let mut common: Vec<usize> = neighborhoods[i]
                    .intersection(&neighborhoods[j])
                    .copied()
                    .collect();
                if common.is_empty() {
                    continue;
                }
                common.sort_unstable();
                common_neighbors.insert(
                    format!("{}-{}", id(valid[i]), id(valid[j])),
                    common.into_iter().map(id).collect(),
                );
            }
        }

        let k = valid.len();
        let possible_connections = k * (k - 1);
        let total_connections = mutual_connections.len();
        let mutual_engagement_score = if possible_connections > 0 {
            total_connections as f64 / possible_connections as f64
        } else {
            0.0
        };

        Ok(MutualEngagement {
            users: valid.into_iter().map(id).collect(),
            mutual_connections,
            common_neighbors,
            engagement_matrix,
            mutual_engagement_score,
            total_connections,
            possible_connections,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Entity, Relationship};

    #[test]
    fn one_directed_edge_between_two_users() {
        let mut graph = GraphStore::new();
        graph.upsert_relationship(Relationship::new("a", "b", "mentions").with_weight(2.5));

        let result = MutualEngagement::compute(&graph, &["a", "b"]).unwrap();
        assert_eq!(result.mutual_engagement_score, 0.5);
        assert_eq!(result.total_connections, 1);
        assert_eq!(result.possible_connections, 2);
        assert_eq!(result.mutual_connections[0].relationship_type, "mentions");
        assert_eq!(result.engagement_matrix["a"]["b"], 2.5);
        assert_eq!(result.engagement_matrix["b"]["a"], 0.0);
    }

    #[test]
    fn empty_and_unknown_users() {
        let graph = GraphStore::new();
        let none: [&str; 0] = [];
        assert!(matches!(
            MutualEngagement::compute(&graph, &none),
            Err(InfluenceError::EmptyInput)
        ));
        assert!(matches!(
            MutualEngagement::compute(&graph, &["ghost"]),
            Err(InfluenceError::NoValidUsers)
        ));
    }

    #[test]
    fn unknown_and_duplicate_ids_are_dropped() {
        let mut graph = GraphStore::new();
        graph.upsert_entity(Entity::new("a"));

        let result = MutualEngagement::compute(&graph, &["ghost", "a", "a"]).unwrap();
        assert_eq!(result.users, vec!["a"]);
        assert_eq!(result.mutual_engagement_score, 0.0);
        assert_eq!(result.possible_connections, 0);
    }

    #[test]
    fn common_neighbors_in_either_direction() {
        let mut graph = GraphStore::new();
        graph.upsert_relationship(Relationship::new("a", "x", "likes"));
        graph.upsert_relationship(Relationship::new("x", "b", "likes"));
        graph.upsert_relationship(Relationship::new("a", "y", "likes"));
        graph.upsert_relationship(Relationship::new("c", "z", "likes"));

        let result = MutualEngagement::compute(&graph, &["a", "b", "c"]).unwrap();
        assert_eq!(result.common_neighbors.len(), 1);
        assert_eq!(result.common_neighbors["a-b"], vec!["x"]);
        assert_eq!(result.mutual_engagement_score, 0.0);
    }
}
