//! Error types for compiling and parsing.

use std::fmt;

use verba_cache::{CacheError, NodePath};

use crate::element::Primitive;
use crate::node_type::CapabilityName;

/// The pipeline step in which a caller-supplied callback failed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Stage {
    /// A node type's `observe`.
    Observe,
    /// An external source processor.
    Source,
    /// The registration callback.
    Register,
    /// A node type's `describe`.
    Describe,
    /// A node type's `visit`.
    Visit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Observe => "observe",
            Stage::Source => "source",
            Stage::Register => "register",
            Stage::Describe => "describe",
            Stage::Visit => "visit",
        };
        f.write_str(name)
    }
}

/// Errors that abort a compile or parse call.
///
/// There is no partial result: the first error stops the whole pass.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// A node type lacks a capability the tree requires of it.
    #[error("node type `{kind}` is missing required capability `{capability}`")]
    MissingCapability {
        /// Name of the node type.
        kind: String,
        /// The capability that was needed.
        capability: CapabilityName,
    },

    /// A caller-supplied callback reported a fault.
    #[error("{stage} failed for node type `{kind}`: {source}")]
    Fault {
        /// Name of the node type being processed.
        kind: String,
        /// The callback that failed.
        stage: Stage,
        /// The fault as reported by the callback.
        source: NodeFault,
    },

    /// A built-in primitive carries props it cannot be traversed with.
    #[error("malformed `{primitive}` node: {reason}")]
    Primitive {
        /// The primitive kind.
        primitive: Primitive,
        /// What is wrong with it.
        reason: String,
    },

    /// Nested describe output went deeper than the configured limit.
    #[error("expansion exceeded depth limit {limit} at {path}")]
    DepthExceeded {
        /// The configured `expansion.max_depth`.
        limit: usize,
        /// Position at which the limit was crossed.
        path: NodePath,
    },

    /// Re-entrant traversal nested deeper than the configured limit.
    #[error("traversal exceeded depth limit {limit} at node `{kind}`")]
    TraversalDepthExceeded {
        /// The configured `expansion.max_depth`.
        limit: usize,
        /// Name of the node being traversed when the limit was crossed.
        kind: String,
    },

    /// The memo cache broke one of its invariants.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// A failure reported by a caller-supplied callback.
///
/// Callbacks that call back into the engine (a `visit` delegating to
/// [`Traverser`](crate::Traverser)) can propagate engine errors with `?`; such
/// a fault carries the original [`CompileError`], which resurfaces unchanged
/// when the fault crosses back into the engine.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct NodeFault {
    /// Description of the failure.
    pub message: String,
    #[source]
    nested: Option<Box<CompileError>>,
}

impl NodeFault {
    /// Creates a fault with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            nested: None,
        }
    }

    /// Returns the engine error this fault wraps, if any.
    pub fn nested(&self) -> Option<&CompileError> {
        self.nested.as_deref()
    }

    /// Converts the fault into the error surfaced to the engine's caller.
    pub(crate) fn into_compile_error(self, kind: &str, stage: Stage) -> CompileError {
        match self.nested {
            Some(err) => *err,
            None => CompileError::Fault {
                kind: kind.to_string(),
                stage,
                source: self,
            },
        }
    }
}

impl From<CompileError> for NodeFault {
    fn from(err: CompileError) -> Self {
        Self {
            message: err.to_string(),
            nested: Some(Box::new(err)),
        }
    }
}

impl From<String> for NodeFault {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for NodeFault {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}
