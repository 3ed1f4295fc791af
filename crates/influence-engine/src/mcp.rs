use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::engine::InfluenceEngine;
use crate::error::InfluenceError;
use crate::mcp_types::{McpError, McpRequest, McpResponse, ToolSpec, METHOD_NOT_FOUND};
use crate::store::{Entity, Relationship, DEFAULT_NODE_TYPE, DEFAULT_WEIGHT};

pub const SERVER_NAME: &str = "influence-mcp";
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Request payload for the `add_user` tool.
#[derive(Debug, Deserialize)]
pub struct AddUserParams {
    #[serde(alias = "user_handle")]
    pub id: String,
    #[serde(default)]
    pub follower_count: u64,
    #[serde(default)]
    pub engagement_score: f64,
    pub node_type: Option<String>,
}

/// Request payload for the `add_relationship` tool.
#[derive(Debug, Deserialize)]
pub struct AddRelationshipParams {
    #[serde(alias = "source_entity")]
    pub source: String,
    #[serde(alias = "target_entity")]
    pub target: String,
    pub relationship_type: String,
    pub weight: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct PathParams {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
}

#[derive(Debug, Deserialize)]
pub struct ExportParams {
    pub path: PathBuf,
    pub format: ExportFormat,
}

#[derive(Debug, Default, Deserialize)]
pub struct GraphDataParams {
    pub center: Option<String>,
    pub radius: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct InfluenceChainParams {
    #[serde(alias = "user_id")]
    pub user: String,
    pub depth: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TopInfluencersParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct MutualEngagementParams {
    pub users: Vec<String>,
}

/// Radius used by `graph_data` when a center is given without one.
const DEFAULT_SUBGRAPH_RADIUS: usize = 2;

/// JSON-RPC adapter exposing the engine as MCP tools.
pub struct McpServer {
    engine: InfluenceEngine,
}

impl McpServer {
    pub fn new(engine: InfluenceEngine) -> Self {
        Self { engine }
    }

    pub fn list_tools(&self) -> Vec<ToolSpec> {
        let empty = json!({ "type": "object", "properties": {} });
        vec![
            ToolSpec {
                name: "add_user",
                description: "Create or replace a user and its attributes",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "id": { "type": "string" },
                        "follower_count": { "type": "integer", "minimum": 0 },
                        "engagement_score": { "type": "number" },
                        "node_type": { "type": "string", "default": DEFAULT_NODE_TYPE }
                    },
                    "required": ["id"]
                }),
            },
            ToolSpec {
                name: "add_relationship",
                description: "Add a directed relationship; 'follows' is stored as followed -> follower",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "source": { "type": "string" },
                        "target": { "type": "string" },
                        "relationship_type": { "type": "string" },
                        "weight": { "type": "number", "default": DEFAULT_WEIGHT }
                    },
                    "required": ["source", "target", "relationship_type"]
                }),
            },
            ToolSpec {
                name: "import_file",
                description: "Import a CSV or JSON file of users and relationships",
                input_schema: path_schema(),
            },
            ToolSpec {
                name: "validate_file",
                description: "Check the shape of a CSV or JSON file without importing it",
                input_schema: path_schema(),
            },
            ToolSpec {
                name: "export_graph",
                description: "Write the graph to a CSV or JSON file",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "path": { "type": "string" },
                        "format": { "type": "string", "enum": ["csv", "json"] }
                    },
                    "required": ["path", "format"]
                }),
            },
            ToolSpec {
                name: "graph_data",
                description: "Nodes and links for visualization, optionally around a center user",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "center": { "type": "string" },
                        "radius": { "type": "integer", "minimum": 0, "default": DEFAULT_SUBGRAPH_RADIUS }
                    }
                }),
            },
            ToolSpec {
                name: "influence_chain",
                description: "Users influenced by and influencing a user within a hop limit",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "user": { "type": "string" },
                        "depth": { "type": "integer", "minimum": 0 }
                    },
                    "required": ["user"]
                }),
            },
            ToolSpec {
                name: "top_influencers",
                description: "Users ranked by composite influence score",
                input_schema: json!({
                    "type": "object",
                    "properties": { "limit": { "type": "integer", "minimum": 0 } }
                }),
            },
            ToolSpec {
                name: "mutual_engagement",
                description: "Direct connections and shared neighbors among a set of users",
                input_schema: json!({
                    "type": "object",
                    "properties": { "users": { "type": "array", "items": { "type": "string" } } },
                    "required": ["users"]
                }),
            },
            ToolSpec {
                name: "communities",
                description: "Greedy modularity communities with their top members",
                input_schema: empty.clone(),
            },
            ToolSpec {
                name: "analytics",
                description: "Graph summary: size, density, connectivity, clustering, PageRank",
                input_schema: empty.clone(),
            },
            ToolSpec {
                name: "network_metrics",
                description: "Degree averages, clustering and path metrics",
                input_schema: empty.clone(),
            },
            ToolSpec {
                name: "clear_graph",
                description: "Remove every user and relationship",
                input_schema: empty,
            },
        ]
    }

    /// Handles one request; notifications get no response.
    pub async fn handle(&self, request: McpRequest) -> Option<McpResponse> {
        if request.is_notification() {
            debug!(method = %request.method, "notification ignored");
            return None;
        }

        let id = request.id;
        let params = Value::Object(request.params.unwrap_or_default());
        let response = match request.method.as_str() {
            "initialize" => McpResponse::success(
                id,
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": { "tools": {} },
                    "serverInfo": {
                        "name": SERVER_NAME,
                        "version": env!("CARGO_PKG_VERSION")
                    }
                }),
            ),
            "tools/list" => McpResponse::success(id, json!({ "tools": self.list_tools() })),
            "tools/call" => {
                let name = params["name"].as_str().unwrap_or("").to_string();
                let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
                match self.call_tool(&name, arguments).await {
                    Ok(result) => McpResponse::success(id, result),
                    Err(error) => McpResponse::failure(id, error),
                }
            }
            "ping" => McpResponse::success(id, json!({})),
            other => McpResponse::failure(
                id,
                McpError::new(METHOD_NOT_FOUND, format!("Method not found: {}", other)),
            ),
        };
        Some(response)
    }

    /// Runs a tool. Engine errors come back as a tool result flagged
    /// `isError`; unknown tools and bad arguments are protocol errors.
    pub async fn call_tool(&self, tool_name: &str, arguments: Value) -> Result<Value, McpError> {
        let outcome = match tool_name {
            "add_user" => {
                let params: AddUserParams = parse(arguments)?;
                let mut entity = Entity::new(params.id)
                    .with_followers(params.follower_count)
                    .with_engagement(params.engagement_score);
                if let Some(node_type) = params.node_type {
                    entity = entity.with_node_type(node_type);
                }
                to_value(self.engine.add_user(entity))
            }
            "add_relationship" => {
                let params: AddRelationshipParams = parse(arguments)?;
                let relationship =
                    Relationship::new(params.source, params.target, params.relationship_type)
                        .with_weight(params.weight.unwrap_or(DEFAULT_WEIGHT));
                self.engine.add_relationship(relationship).and_then(to_value)
            }
            "import_file" => {
                let params: PathParams = parse(arguments)?;
                self.engine.import_file(&params.path).await.and_then(to_value)
            }
            "validate_file" => {
                let params: PathParams = parse(arguments)?;
                self.engine.validate_file(&params.path).await.and_then(to_value)
            }
            "export_graph" => {
                let params: ExportParams = parse(arguments)?;
                let written = match params.format {
                    ExportFormat::Csv => self.engine.export_csv(&params.path),
                    ExportFormat::Json => self.engine.export_json(&params.path),
                };
                written.map(|()| json!({ "path": params.path }))
            }
            "graph_data" => {
                let params: GraphDataParams = parse(arguments)?;
                match params.center {
                    Some(center) => to_value(
                        self.engine
                            .subgraph(&center, params.radius.unwrap_or(DEFAULT_SUBGRAPH_RADIUS)),
                    ),
                    None => to_value(self.engine.graph_data()),
                }
            }
            "influence_chain" => {
                let params: InfluenceChainParams = parse(arguments)?;
                self.engine
                    .influence_chain(&params.user, params.depth)
                    .and_then(to_value)
            }
            "top_influencers" => {
                let params: TopInfluencersParams = parse(arguments)?;
                to_value(self.engine.top_influencers(params.limit))
            }
            "mutual_engagement" => {
                let params: MutualEngagementParams = parse(arguments)?;
                self.engine.mutual_engagement(&params.users).and_then(to_value)
            }
            "communities" => to_value(self.engine.communities()),
            "analytics" => to_value(self.engine.analytics()),
            "network_metrics" => self.engine.network_metrics().and_then(to_value),
            "clear_graph" => {
                self.engine.clear();
                Ok(json!({ "status": "success" }))
            }
            _ => {
                return Err(McpError::new(
                    METHOD_NOT_FOUND,
                    format!("Tool not found: {}", tool_name),
                ))
            }
        };

        Ok(match outcome {
            Ok(value) => json!({
                "content": [{ "type": "text", "text": value.to_string() }],
                "isError": false
            }),
            Err(err) => {
                debug!(tool = tool_name, error = %err, "tool failed");
                json!({
                    "content": [{ "type": "text", "text": err.to_string() }],
                    "isError": true
                })
            }
        })
    }
}

fn path_schema() -> Value {
    json!({
        "type": "object",
        "properties": { "path": { "type": "string" } },
        "required": ["path"]
    })
}

fn parse<T: DeserializeOwned>(arguments: Value) -> Result<T, McpError> {
    serde_json::from_value(arguments).map_err(McpError::invalid_params)
}

fn to_value<T: Serialize>(value: T) -> Result<Value, InfluenceError> {
    Ok(serde_json::to_value(value)?)
}
