//! Error types for codegraph-taint
//!
//! Provides unified error handling across the crate.

use thiserror::Error;

use crate::config::ConfigError;
use crate::features::taint_analysis::domain::Symbol;

/// Main error type for taint analysis operations
#[derive(Debug, Error)]
pub enum TaintError {
    /// Cooperative cancellation was observed
    #[error("Analysis cancelled")]
    Cancelled,

    /// A method's control-flow graph references blocks that do not exist
    #[error("Malformed control-flow graph for {method}: {reason}")]
    MalformedCfg { method: Symbol, reason: String },

    /// An actual argument has no corresponding formal parameter
    #[error("Arity mismatch calling {callee}: {arguments} argument(s), {parameters} parameter(s)")]
    ArityMismatch {
        callee: Symbol,
        arguments: usize,
        parameters: usize,
    },

    /// The callee's formal parameters are unknown to the symbol index
    #[error("Missing signature for {0}")]
    MissingSignature(Symbol),

    /// An operation does not have the shape its node kind requires
    #[error("Malformed operation at {node}: {reason}")]
    MalformedOperation { node: String, reason: String },

    /// Node id not present in the ICFG arena
    #[error("Unknown ICFG node #{0}")]
    UnknownNode(u32),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl TaintError {
    /// Create a malformed operation error
    pub fn malformed_operation(node: impl ToString, reason: impl Into<String>) -> Self {
        TaintError::MalformedOperation {
            node: node.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this error aborts the whole run rather than a single edge
    pub fn is_fatal(&self) -> bool {
        matches!(self, TaintError::Cancelled | TaintError::Config(_))
    }
}

/// Result type alias for taint operations
pub type Result<T> = std::result::Result<T, TaintError>;
