use crate::error::InfluenceError;
use crate::topology::GraphTopology;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

pub const DEFAULT_NODE_TYPE: &str = "user";
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Relationship type whose stored edge is reversed: being followed means
/// influencing the follower.
pub const FOLLOWS: &str = "follows";

fn default_node_type() -> String {
    DEFAULT_NODE_TYPE.to_string()
}

fn default_weight() -> f64 {
    DEFAULT_WEIGHT
}

/// A user (or other entity) in the interaction graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    #[serde(default)]
    pub follower_count: u64,
    #[serde(default)]
    pub engagement_score: f64,
    #[serde(default = "default_node_type")]
    pub node_type: String,
}

impl Entity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            follower_count: 0,
            engagement_score: 0.0,
            node_type: default_node_type(),
        }
    }

    pub fn with_followers(mut self, follower_count: u64) -> Self {
        self.follower_count = follower_count;
        self
    }

    pub fn with_engagement(mut self, engagement_score: f64) -> Self {
        self.engagement_score = engagement_score;
        self
    }

    pub fn with_node_type(mut self, node_type: impl Into<String>) -> Self {
        self.node_type = node_type.into();
        self
    }
}

/// A directed, weighted relationship between two entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub source: String,
    pub target: String,
    pub relationship_type: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl Relationship {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        relationship_type: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relationship_type: relationship_type.into(),
            weight: DEFAULT_WEIGHT,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Rejects NaN and infinite weights.
    pub fn check_weight(&self) -> Result<(), InfluenceError> {
        if self.weight.is_finite() {
            Ok(())
        } else {
            Err(InfluenceError::InvalidWeight {
                source_entity: self.source.clone(),
                target_entity: self.target.clone(),
                weight: self.weight,
            })
        }
    }

    /// Direction in which the relationship is stored: `follows` runs
    /// target -> source, every other type keeps its given direction.
    pub fn resolved(self) -> Self {
        if self.relationship_type == FOLLOWS {
            Self {
                source: self.target,
                target: self.source,
                ..self
            }
        } else {
            self
        }
    }
}

/// What an upsert created, used by importers for their counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertOutcome {
    /// The relationship's given source was not yet in the store.
    pub source_created: bool,
    /// The relationship's given target was not yet in the store.
    pub target_created: bool,
    /// No relationship existed for the resolved pair.
    pub edge_created: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct EdgeRecord {
    pub source: u32,
    pub target: u32,
    pub relationship: Relationship,
}

/// The in-memory directed weighted graph.
///
/// Entities and relationships keep their insertion order, which every
/// analytic uses as its deterministic iteration order. At most one
/// relationship exists per resolved ordered pair.
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    nodes: Vec<Entity>,
    id_to_index: HashMap<String, u32>,
    edges: Vec<EdgeRecord>,
    pair_to_edge: HashMap<(u32, u32), u32>,
    topology: GraphTopology,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or fully replace an entity. Returns `true` when the id was new.
    pub fn upsert_entity(&mut self, entity: Entity) -> bool {
        match self.id_to_index.get(&entity.id) {
            Some(&idx) => {
                self.nodes[idx as usize] = entity;
                false
            }
            None => {
                self.insert_node(entity);
                true
            }
        }
    }

    /// Add a relationship, creating missing endpoints with default attributes.
    /// A relationship already stored for the resolved pair is overwritten.
    pub fn upsert_relationship(&mut self, relationship: Relationship) -> UpsertOutcome {
        let (_, source_created) = self.ensure_entity(&relationship.source);
        let (_, target_created) = self.ensure_entity(&relationship.target);

        let resolved = relationship.resolved();
        let src = self.id_to_index[&resolved.source];
        let dst = self.id_to_index[&resolved.target];

        let edge_created = match self.pair_to_edge.get(&(src, dst)) {
            Some(&edge_id) => {
                self.edges[edge_id as usize].relationship = resolved;
                false
            }
            None => {
                let edge_id = self.edges.len() as u32;
                self.edges.push(EdgeRecord {
                    source: src,
                    target: dst,
                    relationship: resolved,
                });
                self.pair_to_edge.insert((src, dst), edge_id);
                self.topology.add_edge(src, dst, edge_id);
                true
            }
        };

        UpsertOutcome {
            source_created,
            target_created,
            edge_created,
        }
    }

    /// Remove every entity and relationship.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.id_to_index.clear();
        self.edges.clear();
        self.pair_to_edge.clear();
        self.topology.clear();
    }

    fn ensure_entity(&mut self, id: &str) -> (u32, bool) {
        if let Some(&idx) = self.id_to_index.get(id) {
            return (idx, false);
        }
        (self.insert_node(Entity::new(id)), true)
    }

    fn insert_node(&mut self, entity: Entity) -> u32 {
        let idx = self.topology.add_node();
        self.id_to_index.insert(entity.id.clone(), idx);
        self.nodes.push(entity);
        idx
    }

    pub fn exists(&self, id: &str) -> bool {
        self.id_to_index.contains_key(id)
    }

    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.index_of(id).map(|idx| &self.nodes[idx])
    }

    /// Entities in insertion order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.nodes.iter()
    }

    /// The stored relationship for the resolved pair `source -> target`.
    pub fn relationship(&self, source: &str, target: &str) -> Option<&Relationship> {
        let src = *self.id_to_index.get(source)?;
        let dst = *self.id_to_index.get(target)?;
        self.pair_to_edge
            .get(&(src, dst))
            .map(|&edge_id| &self.edges[edge_id as usize].relationship)
    }

    /// Relationships in order of first creation.
    pub fn relationships(&self) -> impl Iterator<Item = &Relationship> + '_ {
        self.edges.iter().map(|edge| &edge.relationship)
    }

    pub fn successors(&self, id: &str) -> Vec<&str> {
        match self.id_to_index.get(id) {
            Some(&idx) => self
                .topology
                .successors(idx)
                .map(|(n, _)| self.nodes[n as usize].id.as_str())
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn predecessors(&self, id: &str) -> Vec<&str> {
        match self.id_to_index.get(id) {
            Some(&idx) => self
                .topology
                .predecessors(idx)
                .map(|(n, _)| self.nodes[n as usize].id.as_str())
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn in_degree(&self, id: &str) -> usize {
        self.id_to_index
            .get(id)
            .map_or(0, |&idx| self.topology.in_degree(idx))
    }

    pub fn out_degree(&self, id: &str) -> usize {
        self.id_to_index
            .get(id)
            .map_or(0, |&idx| self.topology.out_degree(idx))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `edges / (n * (n - 1))`, or 0 for graphs with fewer than two nodes.
    pub fn density(&self) -> f64 {
        let n = self.node_count();
        if n > 1 {
            self.edge_count() as f64 / (n * (n - 1)) as f64
        } else {
            0.0
        }
    }

    /// max(stored follower_count, in-degree); 0 for unknown ids.
    pub fn effective_followers(&self, id: &str) -> u64 {
        match self.index_of(id) {
            Some(idx) => self.effective_followers_at(idx),
            None => 0,
        }
    }

    /// Copy of the store induced by the nodes within `radius` hops of
    /// `center`, following edges in either direction.
    pub fn subgraph(&self, center: &str, radius: usize) -> GraphStore {
        let mut sub = GraphStore::new();
        let Some(start) = self.index_of(center) else {
            return sub;
        };

        let mut keep: HashSet<usize> = HashSet::from([start]);
        let mut queue = VecDeque::from([(start, 0usize)]);
        while let Some((node, depth)) = queue.pop_front() {
            if depth == radius {
                continue;
            }
            for (neighbor, _) in self.out_edges(node).chain(self.in_edges(node)) {
                if keep.insert(neighbor) {
                    queue.push_back((neighbor, depth + 1));
                }
            }
        }

        for (idx, entity) in self.nodes.iter().enumerate() {
            if keep.contains(&idx) {
                sub.insert_node(entity.clone());
            }
        }
        for edge in &self.edges {
            if keep.contains(&(edge.source as usize)) && keep.contains(&(edge.target as usize)) {
                // Already resolved, so bypass the follows rule.
                let src = sub.id_to_index[&edge.relationship.source];
                let dst = sub.id_to_index[&edge.relationship.target];
                let edge_id = sub.edges.len() as u32;
                sub.edges.push(EdgeRecord {
                    source: src,
                    target: dst,
                    relationship: edge.relationship.clone(),
                });
                sub.pair_to_edge.insert((src, dst), edge_id);
                sub.topology.add_edge(src, dst, edge_id);
            }
        }
        sub
    }

    // Index-level access for the analytics, which work on dense node indices.

    pub(crate) fn index_of(&self, id: &str) -> Option<usize> {
        self.id_to_index.get(id).map(|&idx| idx as usize)
    }

    pub(crate) fn entity_at(&self, idx: usize) -> &Entity {
        &self.nodes[idx]
    }

    pub(crate) fn edge_records(&self) -> &[EdgeRecord] {
        &self.edges
    }

    /// `(target index, weight)` for each outgoing edge of `idx`.
    pub(crate) fn out_edges(&self, idx: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.topology.successors(idx as u32).map(move |(n, edge_id)| {
            (n as usize, self.edges[edge_id as usize].relationship.weight)
        })
    }

    /// `(source index, weight)` for each incoming edge of `idx`.
    pub(crate) fn in_edges(&self, idx: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.topology.predecessors(idx as u32).map(move |(n, edge_id)| {
            (n as usize, self.edges[edge_id as usize].relationship.weight)
        })
    }

    pub(crate) fn in_degree_at(&self, idx: usize) -> usize {
        self.topology.in_degree(idx as u32)
    }

    pub(crate) fn out_degree_at(&self, idx: usize) -> usize {
        self.topology.out_degree(idx as u32)
    }

    pub(crate) fn effective_followers_at(&self, idx: usize) -> u64 {
        self.nodes[idx]
            .follower_count
            .max(self.in_degree_at(idx) as u64)
    }
}
