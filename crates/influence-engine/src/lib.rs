pub mod topology {
    /// A Dynamic Graph Topology represented as Adjacency Lists in both directions.
    /// Entries are `(NeighborID, EdgeID)`; IDs are dense insertion indices.
    #[derive(Debug, Clone, Default)]
    pub struct GraphTopology {
        /// Outgoing adjacency: NodeID -> Vec<(TargetID, EdgeID)>
        pub outgoing: Vec<Vec<(u32, u32)>>,
        /// Incoming adjacency: NodeID -> Vec<(SourceID, EdgeID)>
        pub incoming: Vec<Vec<(u32, u32)>>,
    }

    impl GraphTopology {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn successors(&self, node_id: u32) -> impl Iterator<Item = (u32, u32)> + '_ {
            self.outgoing.get(node_id as usize).into_iter().flatten().copied()
        }

        pub fn predecessors(&self, node_id: u32) -> impl Iterator<Item = (u32, u32)> + '_ {
            self.incoming.get(node_id as usize).into_iter().flatten().copied()
        }

        pub fn out_degree(&self, node_id: u32) -> usize {
            self.outgoing.get(node_id as usize).map_or(0, Vec::len)
        }

        pub fn in_degree(&self, node_id: u32) -> usize {
            self.incoming.get(node_id as usize).map_or(0, Vec::len)
        }

        pub fn add_node(&mut self) -> u32 {
            let id = self.outgoing.len() as u32;
            self.outgoing.push(Vec::new());
            self.incoming.push(Vec::new());
            id
        }

        pub fn add_edge(&mut self, src: u32, dst: u32, edge_id: u32) {
            if src as usize >= self.outgoing.len() || dst as usize >= self.outgoing.len() {
                return; // Safety check
            }
            self.outgoing[src as usize].push((dst, edge_id));
            self.incoming[dst as usize].push((src, edge_id));
        }

        pub fn clear(&mut self) {
            self.outgoing.clear();
            self.incoming.clear();
        }
    }
}

pub mod analytics;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod ingest;
pub mod mcp;
pub mod mcp_stdio;
pub mod mcp_types;
pub mod store;

pub use config::EngineConfig;
pub use engine::InfluenceEngine;
pub use error::{Degeneracy, InfluenceError, Result};
pub use store::{Entity, GraphStore, Relationship, UpsertOutcome};
