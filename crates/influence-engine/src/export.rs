//! Serializable views of the store: the visualization graph and the
//! CSV/JSON exports that the importers read back.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::store::{Entity, GraphStore, Relationship};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualNode {
    pub id: String,
    pub name: String,
    pub follower_count: u64,
    pub engagement_score: f64,
    pub node_type: String,
    pub size: i64,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualLink {
    pub source: String,
    pub target: String,
    pub relationship_type: String,
    pub weight: f64,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphMetadata {
    pub node_count: usize,
    pub edge_count: usize,
    pub density: f64,
}

/// Node/link graph for the front-end; links run in stored (influence) direction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphData {
    pub nodes: Vec<VisualNode>,
    pub links: Vec<VisualLink>,
    pub metadata: GraphMetadata,
}

impl GraphData {
    pub fn from_store(graph: &GraphStore) -> Self {
        let nodes = graph
            .entities()
            .map(|entity| VisualNode {
                id: entity.id.clone(),
                name: entity.id.clone(),
                follower_count: entity.follower_count,
                engagement_score: entity.engagement_score,
                node_type: entity.node_type.clone(),
                size: node_size(entity),
                color: node_color(entity.follower_count),
            })
            .collect();
        let links = graph
            .relationships()
            .map(|rel| VisualLink {
                source: rel.source.clone(),
                target: rel.target.clone(),
                relationship_type: rel.relationship_type.clone(),
                weight: rel.weight,
                color: edge_color(&rel.relationship_type),
            })
            .collect();

        Self {
            nodes,
            links,
            metadata: GraphMetadata {
                node_count: graph.node_count(),
                edge_count: graph.edge_count(),
                density: graph.density(),
            },
        }
    }
}

/// `trunc(10 + min(followers / 1000, 20) + engagement * 5)`
pub fn node_size(entity: &Entity) -> i64 {
    let follower_bonus = (entity.follower_count as f64 / 1000.0).min(20.0);
    (10.0 + follower_bonus + entity.engagement_score * 5.0) as i64
}

pub fn node_color(follower_count: u64) -> &'static str {
    match follower_count {
        c if c > 100_000 => "#ff4444",
        c if c > 10_000 => "#ff8844",
        c if c > 1_000 => "#ffaa44",
        _ => "#4488ff",
    }
}

pub fn edge_color(relationship_type: &str) -> &'static str {
    match relationship_type {
        "follows" => "#666666",
        "mentions" => "#44aa44",
        "likes" => "#ff6666",
        "shares" => "#6666ff",
        "created" => "#aa44aa",
        "comments" => "#44aaaa",
        _ => "#999999",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub node_count: usize,
    pub edge_count: usize,
    pub export_timestamp: DateTime<Utc>,
}

/// Full JSON export. Edges are written as they would be given on input,
/// so a `follows` edge reads follower -> followed again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub nodes: Vec<Entity>,
    pub edges: Vec<Relationship>,
    pub metadata: DocumentMetadata,
}

impl GraphDocument {
    pub fn from_store(graph: &GraphStore) -> Self {
        let nodes: Vec<Entity> = graph.entities().cloned().collect();
        let edges: Vec<Relationship> = graph.relationships().map(as_given).collect();
        Self {
            metadata: DocumentMetadata {
                node_count: nodes.len(),
                edge_count: edges.len(),
                export_timestamp: Utc::now(),
            },
            nodes,
            edges,
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!(path = %path.display(), nodes = self.nodes.len(), edges = self.edges.len(), "graph exported as json");
        Ok(())
    }
}

/// One row per relationship, in the column layout the CSV importer reads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CsvExportRow {
    pub source_entity: String,
    pub target_entity: String,
    pub relationship_type: String,
    pub weight: f64,
    pub source_followers: u64,
    pub target_followers: u64,
    pub source_engagement: f64,
    pub target_engagement: f64,
}

pub fn csv_rows(graph: &GraphStore) -> Vec<CsvExportRow> {
    graph
        .relationships()
        .map(as_given)
        .map(|rel| {
            let source = graph.entity(&rel.source);
            let target = graph.entity(&rel.target);
            CsvExportRow {
                source_followers: source.map_or(0, |e| e.follower_count),
                source_engagement: source.map_or(0.0, |e| e.engagement_score),
                target_followers: target.map_or(0, |e| e.follower_count),
                target_engagement: target.map_or(0.0, |e| e.engagement_score),
                source_entity: rel.source,
                target_entity: rel.target,
                relationship_type: rel.relationship_type,
                weight: rel.weight,
            }
        })
        .collect()
}

pub fn to_csv_string(graph: &GraphStore) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in csv_rows(graph) {
        writer.serialize(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn write_csv(graph: &GraphStore, path: &Path) -> Result<()> {
    fs::write(path, to_csv_string(graph)?)?;
    info!(path = %path.display(), edges = graph.edge_count(), "graph exported as csv");
    Ok(())
}

// Stored follows edges are reversed; resolving again restores the given direction.
fn as_given(rel: &Relationship) -> Relationship {
    rel.clone().resolved()
}
