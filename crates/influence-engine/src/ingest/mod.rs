use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::error::InfluenceError;
use crate::store::GraphStore;

pub mod extractor;
pub mod ontology;

use extractor::{CsvExtractor, Extractor, FormatReport, GraphRecord, JsonExtractor};

/// Supported bulk import formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportFormat {
    Csv,
    Json,
}

impl ImportFormat {
    pub fn from_path(path: &Path) -> Result<Self, InfluenceError> {
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase();
        match extension.as_str() {
            "csv" => Ok(ImportFormat::Csv),
            "json" => Ok(ImportFormat::Json),
            _ => Err(InfluenceError::UnsupportedFormat(extension)),
        }
    }

    fn extractor(self) -> Box<dyn Extractor + Send + Sync> {
        match self {
            ImportFormat::Csv => Box::new(CsvExtractor::new()),
            ImportFormat::Json => Box::new(JsonExtractor),
        }
    }
}

/// Counters of one bulk import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub nodes_added: usize,
    /// Newly created resolved pairs; overwrites are not counted.
    pub edges_added: usize,
    pub records_processed: usize,
}

/// Applies extracted records to a shared graph, one write lock per import.
pub struct IngestionEngine {
    graph: Arc<RwLock<GraphStore>>,
}

impl IngestionEngine {
    pub fn new(graph: Arc<RwLock<GraphStore>>) -> Self {
        Self { graph }
    }

    pub async fn ingest_file(&self, path: &Path) -> Result<ImportReport> {
        let format = ImportFormat::from_path(path)?;
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read file: {:?}", path))?;

        let report = self.ingest_content(&content, format)?;
        info!(
            path = %path.display(),
            nodes_added = report.nodes_added,
            edges_added = report.edges_added,
            records = report.records_processed,
            "import finished"
        );
        Ok(report)
    }

    /// Extract everything first so a malformed input leaves the graph untouched.
    pub fn ingest_content(&self, content: &str, format: ImportFormat) -> Result<ImportReport> {
        let extraction = format
            .extractor()
            .extract(content)
            .with_context(|| format!("Error processing {:?} input", format))?;

        let mut graph = self.graph.write().unwrap_or_else(PoisonError::into_inner);
        let mut report = apply_records(&mut graph, extraction.records);
        report.records_processed = extraction.records_processed;
        Ok(report)
    }

    pub async fn validate_file(&self, path: &Path) -> Result<FormatReport> {
        let format = ImportFormat::from_path(path)?;
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read file: {:?}", path))?;
        Ok(format.extractor().validate(&content))
    }
}

/// Apply records in order. Nodes are only created when absent.
pub fn apply_records(
    graph: &mut GraphStore,
    records: impl IntoIterator<Item = GraphRecord>,
) -> ImportReport {
    let mut report = ImportReport::default();
    for record in records {
        match record {
            GraphRecord::Node(entity) => {
                if !graph.exists(&entity.id) {
                    graph.upsert_entity(entity);
                    report.nodes_added += 1;
                }
            }
            GraphRecord::Edge(relationship) => {
                let outcome = graph.upsert_relationship(relationship);
                report.nodes_added +=
                    usize::from(outcome.source_created) + usize::from(outcome.target_created);
                report.edges_added += usize::from(outcome.edge_created);
            }
        }
    }
    report
}
