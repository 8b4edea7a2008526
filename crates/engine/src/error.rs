//! Error types for graph resolution and lifecycle management.

use std::{fmt, path::PathBuf};

use blockwire_types::{GraphError, NodeId};
use thiserror::Error;

/// A capability that could not be found in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    /// No type registered under this name.
    Type { type_name: String },
    StaticFactory { type_name: String, operation: String },
    InstanceFactory { type_name: String, operation: String },
    /// Single-string-argument factory used for unrecognized constant kinds.
    LiteralFactory { type_name: String },
    Output { type_name: String, slot: String },
    Input { type_name: String, slot: String },
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Type { type_name } => write!(f, "type '{type_name}'"),
            Capability::StaticFactory { type_name, operation } => write!(f, "static factory '{type_name}.{operation}'"),
            Capability::InstanceFactory { type_name, operation } => {
                write!(f, "instance factory '{operation}' on {type_name}")
            }
            Capability::LiteralFactory { type_name } => write!(f, "single-string factory for '{type_name}'"),
            Capability::Output { type_name, slot } => write!(f, "output '{slot}' on {type_name}"),
            Capability::Input { type_name, slot } => write!(f, "input '{slot}' on {type_name}"),
        }
    }
}

/// A single resource that failed to release.
#[derive(Debug)]
pub struct ReleaseFailure {
    pub node: NodeId,
    pub error: anyhow::Error,
}

/// Aggregate of every release failure observed during one teardown.
#[derive(Debug, Error)]
#[error("{} resource(s) failed to release: {}", .failures.len(), render_failures(.failures))]
pub struct TeardownError {
    failures: Vec<ReleaseFailure>,
}

impl TeardownError {
    /// Returns `None` when nothing failed.
    pub(crate) fn from_failures(failures: Vec<ReleaseFailure>) -> Option<Self> {
        if failures.is_empty() { None } else { Some(Self { failures }) }
    }

    pub fn failures(&self) -> &[ReleaseFailure] {
        &self.failures
    }

    /// Nodes whose release failed, in the order they were released.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.failures.iter().map(|failure| failure.node).collect()
    }
}

fn render_failures(failures: &[ReleaseFailure]) -> String {
    failures
        .iter()
        .map(|failure| format!("node {}: {:#}", failure.node, failure.error))
        .collect::<Vec<_>>()
        .join("; ")
}

fn render_ids(ids: &[NodeId]) -> String {
    ids.iter().map(NodeId::to_string).collect::<Vec<_>>().join(", ")
}

/// Errors surfaced by loading, resolving, or starting a graph.
///
/// Releasing reports [`TeardownError`] on its own; here it only rides along
/// on [`EngineError::Aborted`].
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to load graph from {path}")]
    Load {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("invalid graph: {0}")]
    Graph(#[from] GraphError),

    #[error("node {node}: cannot convert {literal:?} to {kind}: {reason}")]
    Parse {
        node: NodeId,
        kind: String,
        literal: String,
        reason: String,
    },

    #[error("node {node}: no such capability: {capability}")]
    NoSuchCapability { node: NodeId, capability: Capability },

    #[error("node {node}: circular dependency while nodes [{}] are in progress", render_ids(.in_progress))]
    CircularDependency { node: NodeId, in_progress: Vec<NodeId> },

    #[error("node {node}: construction failed")]
    Resolution {
        node: NodeId,
        #[source]
        source: anyhow::Error,
    },

    #[error("node {node}: start failed")]
    Start {
        node: NodeId,
        #[source]
        source: anyhow::Error,
    },

    /// A fatal failure whose cleanup also failed.
    #[error("{cause} (teardown also failed: {teardown})")]
    Aborted {
        #[source]
        cause: Box<EngineError>,
        teardown: TeardownError,
    },
}

impl EngineError {
    /// Attaches a teardown failure, if any, as a secondary cause.
    pub(crate) fn with_teardown(self, teardown: Option<TeardownError>) -> Self {
        match teardown {
            Some(teardown) => EngineError::Aborted {
                cause: Box::new(self),
                teardown,
            },
            None => self,
        }
    }

    /// The primary failure, looking through any attached teardown failure.
    pub fn root(&self) -> &EngineError {
        match self {
            EngineError::Aborted { cause, .. } => cause.root(),
            other => other,
        }
    }

    /// Teardown failure attached to a fatal error.
    pub fn teardown(&self) -> Option<&TeardownError> {
        match self {
            EngineError::Aborted { teardown, .. } => Some(teardown),
            _ => None,
        }
    }

    /// Node the primary failure is attributed to.
    pub fn node(&self) -> Option<NodeId> {
        match self.root() {
            EngineError::Parse { node, .. }
            | EngineError::NoSuchCapability { node, .. }
            | EngineError::CircularDependency { node, .. }
            | EngineError::Resolution { node, .. }
            | EngineError::Start { node, .. } => Some(*node),
            EngineError::Graph(GraphError::UnknownNode { node }) => Some(*node),
            _ => None,
        }
    }

    pub(crate) fn missing(node: NodeId, capability: Capability) -> Self {
        EngineError::NoSuchCapability { node, capability }
    }
}
