//! Lifecycle coordination for startable and closeable values.
//!
//! Values are tracked at the moment they are successfully constructed, so the
//! lists reflect creation order exactly. Starting walks that order forwards;
//! closing walks it backwards and never stops at the first failure.

use std::sync::Arc;

use blockwire_types::NodeId;
use tracing::{debug, info, warn};

use crate::{
    capability::TypeCapabilities,
    error::{EngineError, ReleaseFailure, TeardownError},
    value::Value,
};

struct Managed {
    node: NodeId,
    value: Value,
    capabilities: Arc<TypeCapabilities>,
}

/// Ordered startable and closeable lists populated during resolution.
#[derive(Default)]
pub struct LifecycleCoordinator {
    startable: Vec<Managed>,
    closeable: Vec<Managed>,
}

impl std::fmt::Debug for LifecycleCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let nodes = |entries: &[Managed]| entries.iter().map(|entry| entry.node).collect::<Vec<_>>();
        f.debug_struct("LifecycleCoordinator")
            .field("startable", &nodes(&self.startable))
            .field("closeable", &nodes(&self.closeable))
            .finish()
    }
}

impl LifecycleCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a freshly constructed value if its type has start or release hooks.
    pub(crate) fn track(&mut self, node: NodeId, value: &Value, capabilities: &Arc<TypeCapabilities>) {
        if capabilities.is_startable() {
            debug!(node = %node, type_name = %capabilities.type_name(), "tracking startable");
            self.startable.push(Managed {
                node,
                value: value.clone(),
                capabilities: Arc::clone(capabilities),
            });
        }
        if capabilities.is_closeable() {
            debug!(node = %node, type_name = %capabilities.type_name(), "tracking closeable");
            self.closeable.push(Managed {
                node,
                value: value.clone(),
                capabilities: Arc::clone(capabilities),
            });
        }
    }

    /// Nodes awaiting start, in creation order.
    pub fn startable_nodes(&self) -> Vec<NodeId> {
        self.startable.iter().map(|entry| entry.node).collect()
    }

    /// Nodes awaiting release, in creation order.
    pub fn closeable_nodes(&self) -> Vec<NodeId> {
        self.closeable.iter().map(|entry| entry.node).collect()
    }

    pub fn has_pending_release(&self) -> bool {
        !self.closeable.is_empty()
    }

    /// Starts every startable in creation order.
    ///
    /// The first failure stops the walk, releases everything tracked so far,
    /// and is returned with any release failure attached.
    pub fn run(&mut self) -> Result<(), EngineError> {
        let startable = std::mem::take(&mut self.startable);
        for entry in startable {
            debug!(node = %entry.node, type_name = %entry.capabilities.type_name(), "starting");
            if let Err(source) = entry.capabilities.start(&entry.value) {
                warn!(node = %entry.node, error = %format!("{source:#}"), "start failed; tearing down");
                let failure = EngineError::Start { node: entry.node, source };
                return Err(failure.with_teardown(self.close().err()));
            }
        }
        Ok(())
    }

    /// Releases every closeable in reverse creation order.
    ///
    /// Every value gets its chance to release; failures are merged into one
    /// [`TeardownError`]. The list is drained, so calling this again is a no-op.
    pub fn close(&mut self) -> Result<(), TeardownError> {
        self.startable.clear();
        let mut failures = Vec::new();
        let mut released = 0usize;
        while let Some(entry) = self.closeable.pop() {
            debug!(node = %entry.node, type_name = %entry.capabilities.type_name(), "releasing");
            match entry.capabilities.close(&entry.value) {
                Ok(()) => released += 1,
                Err(error) => {
                    warn!(node = %entry.node, error = %format!("{error:#}"), "release failed");
                    failures.push(ReleaseFailure { node: entry.node, error });
                }
            }
        }
        if released > 0 || !failures.is_empty() {
            info!(released, failed = failures.len(), "teardown complete");
        }
        TeardownError::from_failures(failures).map_or(Ok(()), Err)
    }
}
