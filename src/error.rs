//! # Error Types
//!
//! This module defines the error type shared by visitation, execution,
//! and the document loaders.

use thiserror::Error;

use crate::document::NodeType;

/// Main error type for compiler operations.
///
/// Every variant is fatal: a partially built opcode sequence or a partially
/// executed target must be discarded by the caller.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The visitor has no handler for a node's tag.
    #[error("Cannot visit unknown type {0}")]
    UnknownNodeType(NodeType),

    /// The handler table has no entry for an opcode's name.
    #[error("Cannot compile unknown opcode '{name}' at position {index}")]
    UnknownOpcode { name: String, index: usize },

    /// A fixed-arity handler received the wrong number of params.
    #[error("Opcode '{name}' expects {expected} parameter(s), got {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    /// A handler received a param of the wrong shape.
    #[error("Invalid parameter {index}: expected {expected}, got {found}")]
    InvalidParam {
        index: usize,
        expected: &'static str,
        found: String,
    },

    /// A target received an opcode outside the structure it belongs to.
    #[error("Opcode '{name}' is not valid here: {reason}")]
    Misplaced {
        name: &'static str,
        reason: &'static str,
    },

    /// Input could not be read as Mobiledoc.
    #[error("Invalid mobiledoc: {0}")]
    InvalidMobiledoc(String),

    /// JSON error wrapper
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
