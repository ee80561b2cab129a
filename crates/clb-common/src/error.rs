//! Error types for checklist building

use thiserror::Error;

/// Result type alias for checklist operations
pub type Result<T> = std::result::Result<T, ClbError>;

/// Main error type for checklist building
#[derive(Error, Debug)]
pub enum ClbError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Duplicate taxon identifier: {0}")]
    DuplicateIdentifier(String),

    #[error("Unknown node: {0}")]
    UnknownNode(u64),

    #[error("Self-referencing {relation} edge on node {node}")]
    SelfReference { node: u64, relation: String },

    #[error("Node {node} already has a {relation} edge")]
    DuplicateRelation { node: u64, relation: String },

    #[error("Malformed traversal: {0}")]
    MalformedTraversal(String),

    #[error("Commit failed: {0}")]
    Commit(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl ClbError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedTraversal(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Whether this error invalidates the interval index of the current run
    pub fn is_fatal_for_index(&self) -> bool {
        matches!(self, Self::MalformedTraversal(_) | Self::Commit(_))
    }
}
