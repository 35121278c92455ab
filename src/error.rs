//! GraphError: unified error type for dirty-dag public APIs
//!
//! This error type is used throughout the dirty-dag library to provide robust,
//! non-panicking error handling for all public APIs.

use thiserror::Error;

/// Unified error type for dependency-graph operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Attempted to construct a `NodeId` with a zero value (invalid).
    #[error("NodeId must be non-zero (0 is reserved as invalid/sentinel)")]
    InvalidNodeId,
    /// An operation dereferenced an id absent from the node map.
    #[error("Graph error: node `{0}` not found")]
    NodeNotFound(String),
    /// A node's child list and cursor list disagree in length.
    #[error("Graph error: node `{node}` tracks {children} children but {cursors} cursors")]
    CursorDesync {
        /// Owner of the mismatched lists, `Debug`-formatted.
        node: String,
        /// Length of the child list.
        children: usize,
        /// Length of the cursor list.
        cursors: usize,
    },
    /// An edge is recorded on one endpoint but missing its mirror on the other.
    #[error("Graph error: edge `{parent}` -> `{child}` lost its mirror entry")]
    EdgeMirrorBroken {
        /// Producer endpoint, `Debug`-formatted.
        parent: String,
        /// Dependent endpoint, `Debug`-formatted.
        child: String,
    },
    /// A parent's child list names the same dependent twice.
    #[error("Graph error: duplicate edge `{parent}` -> `{child}`")]
    DuplicateEdge {
        /// Producer endpoint, `Debug`-formatted.
        parent: String,
        /// Dependent endpoint, `Debug`-formatted.
        child: String,
    },
    /// A computed evaluation order contains a repeated id.
    #[error("Evaluation order error: node `{0}` appears more than once")]
    DuplicateInEvalOrder(String),
}
