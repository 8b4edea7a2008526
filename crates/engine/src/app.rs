//! The resolved runtime: every node's value plus the lifecycle lists that
//! were populated while they were built.

use std::any::Any;

use blockwire_types::NodeId;
use serde::Serialize;
use tracing::{error, warn};

use crate::{
    error::{EngineError, TeardownError},
    lifecycle::LifecycleCoordinator,
    resolver::ResolutionReport,
    value::Value,
};

/// Handle to a fully resolved and wired graph.
///
/// Dropping the handle without calling [`RuntimeApp::close`] still releases
/// every closeable value, logging any failure instead of returning it.
#[derive(Debug)]
pub struct RuntimeApp {
    values: Vec<Option<Value>>,
    lifecycle: LifecycleCoordinator,
    report: ResolutionReport,
}

/// Serializable overview of a runtime, as printed by the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeSummary {
    pub report: ResolutionReport,
    pub nodes: Vec<NodeSummary>,
    pub pending_start: Vec<NodeId>,
    pub pending_release: Vec<NodeId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeSummary {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub type_name: String,
}

impl RuntimeApp {
    pub(crate) fn new(values: Vec<Option<Value>>, lifecycle: LifecycleCoordinator, report: ResolutionReport) -> Self {
        Self {
            values,
            lifecycle,
            report,
        }
    }

    /// Memoized value of a node.
    pub fn value(&self, node: NodeId) -> Option<&Value> {
        self.values.get(node.index()).and_then(Option::as_ref)
    }

    /// Clone of a node's value when it holds a `T`.
    pub fn get<T: Any + Clone>(&self, node: NodeId) -> Option<T> {
        self.value(node).and_then(Value::cloned)
    }

    /// Borrows a node's value as `T` for the duration of `read`.
    pub fn with_value<T: Any, R>(&self, node: NodeId, read: impl FnOnce(&T) -> R) -> Option<R> {
        self.value(node).and_then(|value| value.with_ref(read))
    }

    /// Every resolved node in ascending id order.
    pub fn values(&self) -> impl Iterator<Item = (NodeId, &Value)> {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(index, value)| value.as_ref().map(|value| (NodeId(index as u32), value)))
    }

    pub fn report(&self) -> &ResolutionReport {
        &self.report
    }

    pub fn lifecycle(&self) -> &LifecycleCoordinator {
        &self.lifecycle
    }

    /// Starts every startable value in creation order. See [`LifecycleCoordinator::run`].
    pub fn run(&mut self) -> Result<(), EngineError> {
        self.lifecycle.run()
    }

    /// Releases every closeable value in reverse creation order.
    pub fn close(&mut self) -> Result<(), TeardownError> {
        self.lifecycle.close()
    }

    pub fn summary(&self) -> RuntimeSummary {
        RuntimeSummary {
            report: self.report.clone(),
            nodes: self
                .values()
                .map(|(id, value)| NodeSummary {
                    id,
                    type_name: value.type_name().to_string(),
                })
                .collect(),
            pending_start: self.lifecycle.startable_nodes(),
            pending_release: self.lifecycle.closeable_nodes(),
        }
    }
}

impl Drop for RuntimeApp {
    fn drop(&mut self) {
        if !self.lifecycle.has_pending_release() {
            return;
        }
        warn!(pending = self.lifecycle.closeable_nodes().len(), "runtime dropped without close; releasing");
        if let Err(failure) = self.lifecycle.close() {
            error!(error = %failure, "release failed while dropping runtime");
        }
    }
}
