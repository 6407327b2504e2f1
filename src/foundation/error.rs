use std::fmt;

use crate::foundation::core::{Frame, NodeId};

/// Errors raised while resolving the evaluation plan from the host graph.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A requested or referenced node does not exist in the host graph.
    #[error("unknown node '{0}'")]
    UnknownNode(NodeId),

    /// The stream edges reachable from the request form a cycle through `node_id`.
    #[error("cycle detected through node '{node_id}'")]
    Cycle {
        /// A node that lies on the cycle.
        node_id: NodeId,
    },
}

/// Errors raised by [`GraphCollaborator::connect`](crate::GraphCollaborator::connect).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    /// Either endpoint does not exist.
    #[error("unknown node '{0}'")]
    UnknownNode(NodeId),

    /// The port name is not declared by the node's operator kind.
    #[error("node '{node_id}' has no {direction} port '{port}'")]
    UnknownPort {
        /// Node the port was looked up on.
        node_id: NodeId,
        /// Requested port name.
        port: String,
        /// `"input"` or `"output"`.
        direction: &'static str,
    },

    /// The input port already has a producer (single-producer rule).
    #[error("input '{port}' on node '{node_id}' is already fed by '{producer}'")]
    InputOccupied {
        /// Consumer node.
        node_id: NodeId,
        /// Occupied input port.
        port: String,
        /// Current producer.
        producer: NodeId,
    },
}

/// Errors raised while populating a graph from a scene description.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// A node entry has an empty id.
    #[error("scene node #{index} has an empty id")]
    BlankId {
        /// Position in the `nodes` array.
        index: usize,
    },

    /// Two node entries share an id.
    #[error("duplicate scene node '{0}'")]
    DuplicateNode(NodeId),

    /// A connection was rejected by the graph.
    #[error("invalid connection: {0}")]
    Connect(#[from] ConnectError),
}

/// Failure reported by the execution engine collaborator for one node on one frame.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A parameter value cannot be used by the operator.
    #[error("bad parameter '{param}': {reason}")]
    BadParameter {
        /// Parameter name.
        param: String,
        /// Human readable cause.
        reason: String,
    },

    /// An external resource (typically a file) is missing or unreadable.
    #[error("missing resource '{path}' (from '{param}'): {reason}")]
    MissingResource {
        /// Parameter that named the resource.
        param: String,
        /// Resolved resource path.
        path: String,
        /// Human readable cause.
        reason: String,
    },

    /// Any other engine-level failure.
    #[error("engine failure: {0}")]
    Failed(String),
}

impl EngineError {
    /// Build an [`EngineError::BadParameter`] value.
    pub fn bad_parameter(param: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BadParameter {
            param: param.into(),
            reason: reason.into(),
        }
    }

    /// Build an [`EngineError::MissingResource`] value.
    pub fn missing_resource(
        param: impl Into<String>,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MissingResource {
            param: param.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Build an [`EngineError::Failed`] value.
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

/// What a dry run found wrong.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// A required stream input has no incoming edge and no default.
    #[error("required input '{port}' is not connected")]
    UnresolvedInput {
        /// Unconnected input port.
        port: String,
    },

    /// A parameter is missing, mistyped, out of domain, or names an unusable resource.
    #[error("bad parameter '{param}': {reason}")]
    BadParameter {
        /// Parameter name (or resource description).
        param: String,
        /// Human readable cause.
        reason: String,
    },

    /// The reachable graph contains a cycle.
    #[error("cycle in stream connections")]
    Cycle,

    /// No terminal nodes were requested.
    #[error("no nodes requested")]
    EmptyRequest,

    /// The frame range is malformed (`start > end`).
    #[error("frame range is empty")]
    EmptyRange,

    /// A requested node no longer exists in the host graph.
    #[error("node does not exist")]
    UnknownNode,

    /// The engine refused the dry run for a reason other than a parameter or resource.
    #[error("engine rejected dry run: {reason}")]
    EngineRejected {
        /// Engine message.
        reason: String,
    },
}

/// Structured dry-run failure: what went wrong, on which node, at which frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Failure category.
    pub kind: ValidationErrorKind,
    /// Offending node, when the failure is attributable to one.
    pub node_id: Option<NodeId>,
    /// Frame at which the failure was first observed.
    pub frame: Option<Frame>,
}

impl ValidationError {
    /// Failure with no node or frame attached.
    pub fn new(kind: ValidationErrorKind) -> Self {
        Self {
            kind,
            node_id: None,
            frame: None,
        }
    }

    /// Failure attributed to `node_id` at `frame`.
    pub fn at(kind: ValidationErrorKind, node_id: NodeId, frame: Frame) -> Self {
        Self {
            kind,
            node_id: Some(node_id),
            frame: Some(frame),
        }
    }

    /// Map a dry-run engine failure into a validation failure.
    pub fn from_engine(err: EngineError, node_id: NodeId, frame: Frame) -> Self {
        let kind = match err {
            EngineError::BadParameter { param, reason } => {
                ValidationErrorKind::BadParameter { param, reason }
            }
            EngineError::MissingResource {
                param,
                path,
                reason,
            } => ValidationErrorKind::BadParameter {
                param,
                reason: format!("{path}: {reason}"),
            },
            EngineError::Failed(reason) => ValidationErrorKind::EngineRejected { reason },
        };
        Self::at(kind, node_id, frame)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(node_id) = &self.node_id {
            write!(f, " (node '{node_id}'")?;
            if let Some(frame) = self.frame {
                write!(f, ", frame {frame}")?;
            }
            write!(f, ")")?;
        } else if let Some(frame) = self.frame {
            write!(f, " (frame {frame})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

impl From<GraphError> for ValidationError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::UnknownNode(id) => Self {
                kind: ValidationErrorKind::UnknownNode,
                node_id: Some(id),
                frame: None,
            },
            GraphError::Cycle { node_id } => Self {
                kind: ValidationErrorKind::Cycle,
                node_id: Some(node_id),
                frame: None,
            },
        }
    }
}

/// Top-level error taxonomy returned by [`ExecutionController::run`](crate::ExecutionController::run).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// The request names no nodes.
    #[error("execution request names no nodes")]
    EmptyRequest,

    /// `start > end`.
    #[error("frame range is empty: start {start} is after end {end}")]
    EmptyRange {
        /// Requested start frame.
        start: Frame,
        /// Requested end frame.
        end: Frame,
    },

    /// A requested node is gone from the host graph (stale selection).
    #[error("unknown node '{0}'")]
    UnknownNode(NodeId),

    /// Structural defect: the reachable graph is cyclic.
    #[error("cycle detected through node '{node_id}'")]
    Cycle {
        /// A node that lies on the cycle.
        node_id: NodeId,
    },

    /// The dry run failed; nothing was evaluated.
    #[error("validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),

    /// The engine failed during real evaluation. Frames before `frame` stay committed.
    #[error("node '{node_id}' failed at frame {frame}: {cause}")]
    RuntimeFailure {
        /// Node being evaluated.
        node_id: NodeId,
        /// Frame being evaluated.
        frame: Frame,
        /// Engine-reported cause.
        #[source]
        cause: EngineError,
    },

    /// A cancellation request was observed between frames.
    #[error("execution cancelled before frame {frame} ({frames_completed} frames committed)")]
    Cancelled {
        /// First frame that was not evaluated.
        frame: Frame,
        /// Frames fully evaluated before cancellation.
        frames_completed: u64,
    },
}

impl ExecutionError {
    /// Build an [`ExecutionError::RuntimeFailure`] value.
    pub fn runtime(node_id: NodeId, frame: Frame, cause: EngineError) -> Self {
        Self::RuntimeFailure {
            node_id,
            frame,
            cause,
        }
    }

    /// Return `true` when the failed call left no externally visible state behind, so the caller
    /// may fix its inputs and retry without cleanup.
    pub fn is_side_effect_free(&self) -> bool {
        !matches!(self, Self::RuntimeFailure { .. } | Self::Cancelled { .. })
    }
}

impl From<GraphError> for ExecutionError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::UnknownNode(id) => Self::UnknownNode(id),
            GraphError::Cycle { node_id } => Self::Cycle { node_id },
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
