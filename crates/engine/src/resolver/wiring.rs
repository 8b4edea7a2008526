//! Post-construction wiring of input links.
//!
//! Planning binds every input group against memoized values without
//! mutating anything; only once the whole plan is bound are the mutators
//! applied, in ascending target id then slot declaration order.

use std::sync::Arc;

use blockwire_types::NodeId;
use tracing::{debug, trace};

use super::GraphResolver;
use crate::{
    capability::Input,
    error::EngineError,
    value::{Arg, Value},
};

/// One pending mutator invocation.
pub(crate) struct WiringCall {
    target: NodeId,
    slot: String,
    receiver: Value,
    input: Arc<Input>,
    argument: Arg,
}

impl GraphResolver<'_> {
    pub(super) fn plan_wiring(&mut self) -> Result<Vec<WiringCall>, EngineError> {
        let graph = self.graph;
        let mut calls = Vec::new();
        for node in graph.nodes() {
            for (slot, links) in graph.input_groups(node.id) {
                let receiver = self.produce(node.id)?;
                let input = self.registry.input(node.id, &receiver, slot)?;
                let argument = self.bind_slot(input.param(), links)?;
                trace!(node = %node.id, slot, links = links.len(), "input bound");
                calls.push(WiringCall {
                    target: node.id,
                    slot: slot.to_string(),
                    receiver,
                    input,
                    argument,
                });
            }
        }
        debug!(calls = calls.len(), "wiring planned");
        Ok(calls)
    }

    pub(super) fn apply_wiring(&mut self, calls: Vec<WiringCall>) -> Result<(), EngineError> {
        for call in calls {
            debug!(node = %call.target, slot = %call.slot, "wiring input");
            call.input
                .apply(&call.receiver, call.argument)
                .map_err(|error| EngineError::Resolution {
                    node: call.target,
                    source: error.context(format!("applying input '{}'", call.slot)),
                })?;
            self.report.wiring_calls += 1;
        }
        Ok(())
    }
}
