use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::{Entity, Relationship, DEFAULT_NODE_TYPE, DEFAULT_WEIGHT};

pub const REQUIRED_CSV_COLUMNS: [&str; 2] = ["source_entity", "target_entity"];
pub const OPTIONAL_CSV_COLUMNS: [&str; 6] = [
    "relationship_type",
    "weight",
    "source_followers",
    "target_followers",
    "source_engagement",
    "target_engagement",
];

/// Relationship type used when a record does not name one.
pub const UNKNOWN_RELATIONSHIP: &str = "unknown";

const SAMPLE_SIZE: usize = 3;

/// One instruction for the graph, applied in order.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphRecord {
    /// Create the entity only if no entity with its id exists.
    Node(Entity),
    /// Upsert the relationship, creating missing endpoints with defaults.
    Edge(Relationship),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionResult {
    pub records: Vec<GraphRecord>,
    /// CSV rows, or JSON node plus edge entries, read from the input.
    pub records_processed: usize,
}

/// Shape check of an input file, without touching the graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FormatReport {
    Csv(CsvValidation),
    Json(JsonValidation),
}

impl FormatReport {
    pub fn is_valid(&self) -> bool {
        match self {
            FormatReport::Csv(report) => report.is_valid,
            FormatReport::Json(report) => report.is_valid,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CsvValidation {
    pub is_valid: bool,
    pub total_rows: usize,
    pub columns: Vec<String>,
    pub missing_required_columns: Vec<String>,
    pub available_optional_columns: Vec<String>,
    pub sample_data: Vec<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JsonValidation {
    pub is_valid: bool,
    pub has_nodes: bool,
    pub has_edges: bool,
    pub node_count: usize,
    pub edge_count: usize,
    pub node_sample: Vec<Value>,
    pub edge_sample: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub trait Extractor {
    fn extract(&self, content: &str) -> Result<ExtractionResult>;

    fn validate(&self, content: &str) -> FormatReport;
}

/// One row of a relationship CSV; only the endpoints are required.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default)]
    source_entity: String,
    #[serde(default)]
    target_entity: String,
    #[serde(default)]
    relationship_type: Option<String>,
    #[serde(default)]
    weight: Option<f64>,
    #[serde(default)]
    source_followers: Option<f64>,
    #[serde(default)]
    target_followers: Option<f64>,
    #[serde(default)]
    source_engagement: Option<f64>,
    #[serde(default)]
    target_engagement: Option<f64>,
}

pub struct CsvExtractor {
    pub delimiter: u8,
}

impl Default for CsvExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvExtractor {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    fn reader<'a>(&self, content: &'a str) -> csv::Reader<&'a [u8]> {
        csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes())
    }

    fn endpoint(id: &str, followers: Option<f64>, engagement: Option<f64>) -> Entity {
        Entity::new(id)
            .with_followers(followers.map_or(0, |f| f.max(0.0) as u64))
            .with_engagement(engagement.unwrap_or(0.0))
    }
}

impl Extractor for CsvExtractor {
    fn extract(&self, content: &str) -> Result<ExtractionResult> {
        let mut rdr = self.reader(content);

        let headers = rdr.headers().context("Failed to read CSV header")?.clone();
        let missing: Vec<&str> = REQUIRED_CSV_COLUMNS
            .into_iter()
            .filter(|col| !headers.iter().any(|h| h == *col))
            .collect();
        if !missing.is_empty() {
            anyhow::bail!("CSV is missing required columns: {}", missing.join(", "));
        }

        let mut records = Vec::new();
        let mut rows = 0;
        for (line, result) in rdr.deserialize::<CsvRow>().enumerate() {
            let row = result.with_context(|| format!("Invalid CSV row {}", line + 1))?;
            rows += 1;

            let source = row.source_entity.trim();
            let target = row.target_entity.trim();
            if !source.is_empty() {
                records.push(GraphRecord::Node(Self::endpoint(
                    source,
                    row.source_followers,
                    row.source_engagement,
                )));
            }
            if !target.is_empty() {
                records.push(GraphRecord::Node(Self::endpoint(
                    target,
                    row.target_followers,
                    row.target_engagement,
                )));
            }
            if !source.is_empty() && !target.is_empty() {
                let relationship_type = row
                    .relationship_type
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| UNKNOWN_RELATIONSHIP.to_string());
                let relationship = Relationship::new(source, target, relationship_type)
                    .with_weight(row.weight.unwrap_or(DEFAULT_WEIGHT));
                relationship
                    .check_weight()
                    .with_context(|| format!("Invalid CSV row {}", line + 1))?;
                records.push(GraphRecord::Edge(relationship));
            }
        }

        Ok(ExtractionResult {
            records,
            records_processed: rows,
        })
    }

    fn validate(&self, content: &str) -> FormatReport {
        let mut rdr = self.reader(content);
        let headers = match rdr.headers() {
            Ok(headers) => headers.clone(),
            Err(e) => {
                return FormatReport::Csv(CsvValidation {
                    error: Some(e.to_string()),
                    ..Default::default()
                })
            }
        };
        let columns: Vec<String> = headers.iter().map(str::to_string).collect();

        let mut total_rows = 0;
        let mut sample_data = Vec::new();
        for result in rdr.records() {
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    return FormatReport::Csv(CsvValidation {
                        columns,
                        error: Some(e.to_string()),
                        ..Default::default()
                    })
                }
            };
            total_rows += 1;
            if sample_data.len() < SAMPLE_SIZE {
                sample_data.push(
                    columns
                        .iter()
                        .cloned()
                        .zip(record.iter().map(str::to_string))
                        .collect(),
                );
            }
        }

        let has = |col: &&str| columns.iter().any(|c| c == col);
        let missing_required_columns: Vec<String> = REQUIRED_CSV_COLUMNS
            .iter()
            .filter(|c| !has(c))
            .map(|c| c.to_string())
            .collect();
        let available_optional_columns = OPTIONAL_CSV_COLUMNS
            .iter()
            .filter(|c| has(c))
            .map(|c| c.to_string())
            .collect();

        FormatReport::Csv(CsvValidation {
            is_valid: missing_required_columns.is_empty(),
            total_rows,
            columns,
            missing_required_columns,
            available_optional_columns,
            sample_data,
            error: None,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct JsonNode {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    follower_count: Option<f64>,
    #[serde(default)]
    engagement_score: Option<f64>,
    #[serde(default)]
    node_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct JsonEdge {
    #[serde(default)]
    source: Value,
    #[serde(default)]
    target: Value,
    #[serde(default)]
    relationship_type: Option<String>,
    #[serde(default)]
    weight: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct JsonGraph {
    #[serde(default)]
    nodes: Vec<JsonNode>,
    #[serde(default)]
    edges: Vec<JsonEdge>,
}

/// Ids may be strings or numbers; anything else counts as missing.
fn id_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

pub struct JsonExtractor;

impl Extractor for JsonExtractor {
    fn extract(&self, content: &str) -> Result<ExtractionResult> {
        let graph: JsonGraph =
            serde_json::from_str(content).context("Failed to parse graph JSON")?;
        let records_processed = graph.nodes.len() + graph.edges.len();

        let nodes = graph.nodes.into_iter().filter_map(|node| {
            let id = id_string(&node.id);
            if id.is_empty() {
                return None;
            }
            let entity = Entity::new(id)
                .with_followers(node.follower_count.map_or(0, |f| f.max(0.0) as u64))
                .with_engagement(node.engagement_score.unwrap_or(0.0))
                .with_node_type(node.node_type.unwrap_or_else(|| DEFAULT_NODE_TYPE.to_string()));
            Some(GraphRecord::Node(entity))
        });

        let mut records: Vec<GraphRecord> = nodes.collect();
        for (index, edge) in graph.edges.into_iter().enumerate() {
            let (source, target) = (id_string(&edge.source), id_string(&edge.target));
            if source.is_empty() || target.is_empty() {
                continue;
            }
            let relationship_type = edge
                .relationship_type
                .unwrap_or_else(|| UNKNOWN_RELATIONSHIP.to_string());
            let relationship = Relationship::new(source, target, relationship_type)
                .with_weight(edge.weight.unwrap_or(DEFAULT_WEIGHT));
            relationship
                .check_weight()
                .with_context(|| format!("Invalid JSON edge {}", index))?;
            records.push(GraphRecord::Edge(relationship));
        }

        Ok(ExtractionResult {
            records,
            records_processed,
        })
    }

    fn validate(&self, content: &str) -> FormatReport {
        let data: Value = match serde_json::from_str(content) {
            Ok(data) => data,
            Err(e) => {
                return FormatReport::Json(JsonValidation {
                    error: Some(e.to_string()),
                    ..Default::default()
                })
            }
        };

        let nodes = data.get("nodes").and_then(Value::as_array);
        let edges = data.get("edges").and_then(Value::as_array);
        let sample = |items: Option<&Vec<Value>>| {
            items.map_or_else(Vec::new, |v| v.iter().take(SAMPLE_SIZE).cloned().collect())
        };

        FormatReport::Json(JsonValidation {
            is_valid: nodes.is_some() || edges.is_some(),
            has_nodes: nodes.is_some(),
            has_edges: edges.is_some(),
            node_count: nodes.map_or(0, Vec::len),
            edge_count: edges.map_or(0, Vec::len),
            node_sample: sample(nodes),
            edge_sample: sample(edges),
            error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InfluenceError;

    #[test]
    fn csv_rows_become_nodes_then_edge() {
        let csv = "source_entity,target_entity,relationship_type,weight,source_followers,target_followers\n\
                   alice,bob,mentions,2.5,1200,\n\
                   carol,,likes,,,\n";
        let result = CsvExtractor::new().extract(csv).unwrap();
        assert_eq!(result.records_processed, 2);
        assert_eq!(result.records.len(), 4);

        match &result.records[0] {
            GraphRecord::Node(entity) => {
                assert_eq!(entity.id, "alice");
                assert_eq!(entity.follower_count, 1200);
            }
            other => panic!("unexpected record {other:?}"),
        }
        match &result.records[2] {
            GraphRecord::Edge(rel) => {
                assert_eq!(rel.relationship_type, "mentions");
                assert_eq!(rel.weight, 2.5);
            }
            other => panic!("unexpected record {other:?}"),
        }
        assert!(matches!(&result.records[3], GraphRecord::Node(e) if e.id == "carol"));
    }

    #[test]
    fn csv_defaults_for_missing_columns() {
        let csv = "source_entity,target_entity\na,b\n";
        let result = CsvExtractor::new().extract(csv).unwrap();
        match &result.records[2] {
            GraphRecord::Edge(rel) => {
                assert_eq!(rel.relationship_type, UNKNOWN_RELATIONSHIP);
                assert_eq!(rel.weight, 1.0);
            }
            other => panic!("unexpected record {other:?}"),
        }
    }

    #[test]
    fn csv_without_required_columns_fails() {
        let err = CsvExtractor::new().extract("from,to\na,b\n").unwrap_err();
        assert!(err.to_string().contains("source_entity"));
    }

    #[test]
    fn csv_validation_lists_columns() {
        let csv = "source_entity,weight,extra\na,1,x\nb,2,y\nc,3,z\nd,4,w\n";
        let FormatReport::Csv(report) = CsvExtractor::new().validate(csv) else {
            panic!("expected csv report");
        };
        assert!(!report.is_valid);
        assert_eq!(report.total_rows, 4);
        assert_eq!(report.missing_required_columns, vec!["target_entity"]);
        assert_eq!(report.available_optional_columns, vec!["weight"]);
        assert_eq!(report.sample_data.len(), 3);
        assert_eq!(report.sample_data[0]["extra"], "x");
    }

    #[test]
    fn json_nodes_and_edges() {
        let json = r#"{
            "nodes": [{"id": "alice", "follower_count": 5000, "node_type": "brand"}, {"id": ""}],
            "edges": [{"source": "alice", "target": 42, "relationship_type": "follows"},
                      {"source": "alice"}]
        }"#;
        let result = JsonExtractor.extract(json).unwrap();
        assert_eq!(result.records_processed, 4);
        assert_eq!(result.records.len(), 2);
        assert!(matches!(&result.records[0], GraphRecord::Node(e) if e.node_type == "brand"));
        assert!(matches!(&result.records[1], GraphRecord::Edge(r) if r.target == "42" && r.weight == 1.0));
    }

    #[test]
    fn non_finite_weights_abort_extraction() {
        let csv = "source_entity,target_entity,relationship_type,weight\n\
                   a,b,mentions,1\n\
                   b,c,mentions,NaN\n";
        let err = CsvExtractor::new().extract(csv).unwrap_err();
        assert!(err.to_string().contains("row 2"));
        assert!(matches!(
            err.downcast_ref::<InfluenceError>(),
            Some(InfluenceError::InvalidWeight { .. })
        ));

        let csv = "source_entity,target_entity,weight\nc,a,inf\n";
        assert!(CsvExtractor::new().extract(csv).is_err());

        let json = r#"{"edges": [{"source": "a", "target": "b", "weight": 1e400}]}"#;
        assert!(JsonExtractor.extract(json).is_err());
    }

    #[test]
    fn json_validation() {
        let FormatReport::Json(report) = JsonExtractor.validate(r#"{"edges": [{}, {}]}"#) else {
            panic!("expected json report");
        };
        assert!(report.is_valid);
        assert!(!report.has_nodes);
        assert_eq!(report.edge_count, 2);

        let report = JsonExtractor.validate("not json");
        assert!(!report.is_valid());
    }
}
