//! Service facade over a shared [`GraphStore`].
//!
//! Writers (upserts, imports, clear) hold the write lock for the whole
//! mutation; every query holds the read lock for its whole computation, so
//! a query never sees half of an import.

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::analytics::{
    AnalyticsSummary, CommunityDetector, CommunityReport, InfluenceChain, InfluenceScorer,
    Influencer, MutualEngagement, NetworkMetrics, NodeCentrality,
};
use crate::config::EngineConfig;
use crate::error::{InfluenceError, Result};
use crate::export::{self, GraphData, GraphDocument};
use crate::ingest::extractor::FormatReport;
use crate::ingest::ontology::RelationshipSchema;
use crate::ingest::{ImportFormat, ImportReport, IngestionEngine};
use crate::store::{Entity, GraphStore, Relationship, UpsertOutcome, DEFAULT_NODE_TYPE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UserAdded {
    pub created: bool,
    pub node_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RelationshipAdded {
    #[serde(flatten)]
    pub outcome: UpsertOutcome,
    pub edge_count: usize,
}

#[derive(Clone)]
pub struct InfluenceEngine {
    graph: Arc<RwLock<GraphStore>>,
    config: Arc<EngineConfig>,
    schema: Option<Arc<RelationshipSchema>>,
}

impl Default for InfluenceEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl InfluenceEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            graph: Arc::new(RwLock::new(GraphStore::new())),
            config: Arc::new(config),
            schema: None,
        }
    }

    /// Build from configuration, loading the relationship schema if one is configured.
    pub fn from_config(config: EngineConfig) -> anyhow::Result<Self> {
        let schema = match &config.schema_path {
            Some(path) => Some(RelationshipSchema::load(path)?),
            None => None,
        };
        let engine = Self::new(config);
        Ok(match schema {
            Some(schema) => engine.with_schema(schema),
            None => engine,
        })
    }

    pub fn with_schema(mut self, schema: RelationshipSchema) -> Self {
        self.schema = Some(Arc::new(schema));
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn read(&self) -> RwLockReadGuard<'_, GraphStore> {
        self.graph.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, GraphStore> {
        self.graph.write().unwrap_or_else(PoisonError::into_inner)
    }

    // --- Mutations ---

    /// Create or fully replace a user.
    pub fn add_user(&self, entity: Entity) -> UserAdded {
        let mut graph = self.write();
        let id = entity.id.clone();
        let created = graph.upsert_entity(entity);
        debug!(user = %id, created, "user upserted");
        UserAdded {
            created,
            node_count: graph.node_count(),
        }
    }

    /// Add a relationship, rejecting it before any mutation when its weight
    /// is not finite or when a schema is configured and the endpoint types
    /// do not match.
    pub fn add_relationship(&self, relationship: Relationship) -> Result<RelationshipAdded> {
        relationship.check_weight()?;
        let mut graph = self.write();

        if let Some(schema) = &self.schema {
            let node_type = |id: &str| {
                graph
                    .entity(id)
                    .map_or(DEFAULT_NODE_TYPE.to_string(), |e| e.node_type.clone())
            };
            let source_type = node_type(&relationship.source);
            let target_type = node_type(&relationship.target);
            if !schema.allows(&source_type, &relationship.relationship_type, &target_type) {
                warn!(
                    source = %relationship.source,
                    target = %relationship.target,
                    relationship_type = %relationship.relationship_type,
                    "relationship rejected by schema"
                );
                return Err(InfluenceError::InvalidRelationship {
                    source_type,
                    relationship_type: relationship.relationship_type,
                    target_type,
                });
            }
        }

        let outcome = graph.upsert_relationship(relationship);
        Ok(RelationshipAdded {
            outcome,
            edge_count: graph.edge_count(),
        })
    }

    pub async fn import_file(&self, path: &Path) -> Result<ImportReport> {
        IngestionEngine::new(self.graph.clone())
            .ingest_file(path)
            .await
            .map_err(into_influence_error)
    }

    pub fn import_content(&self, content: &str, format: ImportFormat) -> Result<ImportReport> {
        let report = IngestionEngine::new(self.graph.clone())
            .ingest_content(content, format)
            .map_err(into_influence_error)?;
        info!(
            ?format,
            nodes_added = report.nodes_added,
            edges_added = report.edges_added,
            "import finished"
        );
        Ok(report)
    }

    pub async fn validate_file(&self, path: &Path) -> Result<FormatReport> {
        IngestionEngine::new(self.graph.clone())
            .validate_file(path)
            .await
            .map_err(into_influence_error)
    }

    pub fn clear(&self) {
        let mut graph = self.write();
        let (nodes, edges) = (graph.node_count(), graph.edge_count());
        graph.clear();
        info!(nodes, edges, "graph cleared");
    }

    // --- Queries ---

    pub fn node_count(&self) -> usize {
        self.read().node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.read().edge_count()
    }

    pub fn graph_data(&self) -> GraphData {
        GraphData::from_store(&self.read())
    }

    /// Visualization of the neighborhood of `center`; empty when it is absent.
    pub fn subgraph(&self, center: &str, radius: usize) -> GraphData {
        GraphData::from_store(&self.read().subgraph(center, radius))
    }

    pub fn influence_score(&self, user: &str) -> f64 {
        let graph = self.read();
        InfluenceScorer::new(&graph, &self.config.pagerank).score(user)
    }

    /// Chain up to `depth` hops, or the configured default depth.
    pub fn influence_chain(&self, user: &str, depth: Option<usize>) -> Result<InfluenceChain> {
        let depth = depth.unwrap_or(self.config.chain_depth);
        InfluenceChain::compute(&self.read(), user, depth, &self.config.pagerank)
    }

    pub fn top_influencers(&self, limit: Option<usize>) -> Vec<Influencer> {
        let limit = limit.unwrap_or(self.config.top_limit);
        Influencer::top(&self.read(), limit, &self.config.pagerank, &self.config.budget())
    }

    pub fn mutual_engagement<S: AsRef<str>>(&self, users: &[S]) -> Result<MutualEngagement> {
        MutualEngagement::compute(&self.read(), users)
    }

    pub fn communities(&self) -> CommunityReport {
        CommunityDetector::detect(
            &self.read(),
            &self.config.pagerank,
            &self.config.budget(),
            self.config.community_top_k,
        )
    }

    pub fn node_centrality(&self) -> Vec<NodeCentrality> {
        NodeCentrality::for_all(&self.read(), &self.config.pagerank, &self.config.budget())
    }

    pub fn analytics(&self) -> AnalyticsSummary {
        AnalyticsSummary::compute(
            &self.read(),
            &self.config.pagerank,
            self.config.analytics_pagerank_limit,
        )
    }

    pub fn network_metrics(&self) -> Result<NetworkMetrics> {
        NetworkMetrics::compute(&self.read(), &self.config.budget())
    }

    // --- Export ---

    pub fn export_document(&self) -> GraphDocument {
        GraphDocument::from_store(&self.read())
    }

    pub fn export_json(&self, path: &Path) -> Result<()> {
        self.export_document().write(path)
    }

    pub fn export_csv(&self, path: &Path) -> Result<()> {
        export::write_csv(&self.read(), path)
    }
}

/// Keep typed errors raised below the ingest layer; wrap everything else.
fn into_influence_error(err: anyhow::Error) -> InfluenceError {
    match err.downcast::<InfluenceError>() {
        Ok(typed) => typed,
        Err(other) => InfluenceError::Import(format!("{other:#}")),
    }
}
