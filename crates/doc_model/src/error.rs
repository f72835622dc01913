//! Error types for document model operations

use crate::NodeType;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DocModelError {
    #[error("Node not found: {0}")]
    NodeNotFound(Uuid),

    #[error("Invalid position: node {node_id}, offset {offset}")]
    InvalidPosition { node_id: Uuid, offset: usize },

    #[error("{child:?} cannot be placed inside {parent:?}")]
    InvalidNesting { parent: NodeType, child: NodeType },

    #[error("Unexpected node type: expected {expected:?}, found {found:?}")]
    UnexpectedNodeType { expected: NodeType, found: NodeType },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Tree structure error: {0}")]
    TreeStructureError(String),
}

pub type Result<T> = std::result::Result<T, DocModelError>;
