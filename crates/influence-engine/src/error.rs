//! Error types for the influence engine.

use thiserror::Error;

/// Why a numerical metric could not be computed for the current graph shape.
///
/// These never surface as hard failures from the centrality or community
/// computations; they travel inside [`crate::analytics::Metric::Unavailable`]
/// and the caller substitutes a documented default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Degeneracy {
    /// The graph has no nodes.
    #[error("graph is empty")]
    EmptyGraph,

    /// The metric needs at least one relationship.
    #[error("graph has no edges")]
    NoEdges,

    /// The metric needs more nodes than the graph has.
    #[error("graph has fewer than {required} nodes")]
    TooFewNodes {
        /// Minimum node count for the metric.
        required: usize,
    },

    /// The metric needs a (strongly) connected graph.
    #[error("graph is not connected")]
    Disconnected,

    /// Shortest paths are undefined with negative distances.
    #[error("graph contains negative edge weights")]
    NegativeWeight,

    /// Total edge weight is zero or negative.
    #[error("total edge weight is not positive")]
    NonPositiveWeight,

    /// The iteration cap was reached before the tolerance.
    #[error("did not converge within {iterations} iterations")]
    NotConverged {
        /// Iterations performed.
        iterations: usize,
    },

    /// The configured node limit or deadline was exceeded.
    #[error("compute budget exceeded")]
    BudgetExceeded,
}

/// Errors reported to callers of the engine.
#[derive(Debug, Error)]
pub enum InfluenceError {
    /// A traversal was requested for an unknown user.
    #[error("User {0} not found in graph")]
    UserNotFound(String),

    /// No users were supplied to a subset query.
    #[error("No users provided")]
    EmptyInput,

    /// None of the supplied users exist in the graph.
    #[error("None of the specified users found in graph")]
    NoValidUsers,

    /// A metric is undefined for the current graph.
    #[error("computation degenerate: {0}")]
    ComputationDegenerate(#[from] Degeneracy),

    /// A relationship violates the configured relationship schema.
    #[error("Invalid relationship per schema: {source_type} -{relationship_type}-> {target_type}")]
    InvalidRelationship {
        source_type: String,
        relationship_type: String,
        target_type: String,
    },

    /// An edge weight is NaN or infinite.
    #[error("Invalid weight {weight} for relationship {source_entity} -> {target_entity}")]
    InvalidWeight {
        source_entity: String,
        target_entity: String,
        weight: f64,
    },

    /// The import file type is not supported.
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    /// A bulk import record could not be interpreted.
    #[error("import error: {0}")]
    Import(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl InfluenceError {
    /// Whether the error was caused by the caller's request rather than the engine.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound(_)
                | Self::EmptyInput
                | Self::NoValidUsers
                | Self::InvalidRelationship { .. }
                | Self::InvalidWeight { .. }
                | Self::UnsupportedFormat(_)
        )
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, InfluenceError>;
