use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Allowed endpoint types for one relationship type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipRule {
    pub domain: String,
    pub range: String,
}

/// Domain/range constraints keyed by relationship type.
///
/// ```json
/// { "relationships": { "follows": { "domain": "User", "range": "User" } } }
/// ```
///
/// Node types are compared after capitalization (`"user"` matches `"User"`).
/// A relationship type without a rule is rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipSchema {
    #[serde(default)]
    pub relationships: BTreeMap<String, RelationshipRule>,
}

impl RelationshipSchema {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read relationship schema: {:?}", path))?;
        let schema = Self::from_json(&content)
            .with_context(|| format!("Invalid relationship schema: {:?}", path))?;
        info!(
            path = %path.display(),
            rules = schema.relationships.len(),
            "relationship schema loaded"
        );
        Ok(schema)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn with_rule(
        mut self,
        relationship_type: impl Into<String>,
        domain: impl Into<String>,
        range: impl Into<String>,
    ) -> Self {
        self.relationships.insert(
            relationship_type.into(),
            RelationshipRule {
                domain: domain.into(),
                range: range.into(),
            },
        );
        self
    }

    /// Whether `source_type -relationship_type-> target_type` is allowed.
    pub fn allows(&self, source_type: &str, relationship_type: &str, target_type: &str) -> bool {
        self.relationships
            .get(relationship_type)
            .is_some_and(|rule| {
                rule.domain == capitalize(source_type) && rule.range == capitalize(target_type)
            })
    }
}

/// First character upper case, the rest lower case.
pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
