//! Error types for the graph model and scheduler.

use thiserror::Error;

use crate::node::NodeId;

/// Result type alias using [`GraphError`].
pub type Result<T> = std::result::Result<T, GraphError>;

/// Hard failures of the graph model.
///
/// Note that most rejected operations are *not* errors: connecting
/// incompatible slot types, disconnecting an empty slot or removing an
/// unknown node are no-ops that return a falsy value and log at debug
/// level. `GraphError` is reserved for conditions the caller must see.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Adding one more node would exceed the configured capacity.
    #[error("maximum number of nodes reached ({max})")]
    NodeLimit { max: usize },

    /// A node id did not resolve in this graph.
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    /// A slot index is out of range for the node's current slot arrays.
    #[error("slot {slot} out of range for node {node}")]
    SlotOutOfRange { node: NodeId, slot: usize },

    /// A type name is not present in the registry.
    #[error("unknown node type: {0}")]
    UnknownNodeType(String),

    /// Serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Fault raised by a node's step function during [`run_step`].
///
/// Guarded execution records the fault on the graph and stops the loop;
/// unguarded execution returns it to the caller.
///
/// [`run_step`]: crate::graph::Graph::run_step
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("step fault in node {node}: {message}")]
pub struct StepFault {
    pub node: NodeId,
    pub message: String,
}
