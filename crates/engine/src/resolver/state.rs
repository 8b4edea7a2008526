//! Per-run resolution state, indexed by node id.

use std::collections::HashMap;

use blockwire_types::NodeId;

use crate::value::Value;

#[derive(Debug, Default)]
struct Slot {
    value: Option<Value>,
    in_progress: bool,
    outputs: HashMap<String, Value>,
}

/// Memo, in-progress markers, and output cache for one run.
#[derive(Debug, Default)]
pub(crate) struct ResolutionState {
    slots: Vec<Slot>,
}

impl ResolutionState {
    /// Sizes the arena for ids `0..=max_node_id`.
    pub(crate) fn with_max_node_id(max_node_id: Option<NodeId>) -> Self {
        let len = max_node_id.map_or(0, |id| id.index() + 1);
        Self {
            slots: (0..len).map(|_| Slot::default()).collect(),
        }
    }

    fn slot_mut(&mut self, node: NodeId) -> &mut Slot {
        let index = node.index();
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, Slot::default);
        }
        &mut self.slots[index]
    }

    pub(crate) fn value(&self, node: NodeId) -> Option<&Value> {
        self.slots.get(node.index()).and_then(|slot| slot.value.as_ref())
    }

    pub(crate) fn is_in_progress(&self, node: NodeId) -> bool {
        self.slots.get(node.index()).is_some_and(|slot| slot.in_progress)
    }

    /// Nodes currently under construction, in ascending id order.
    pub(crate) fn in_progress(&self) -> Vec<NodeId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.in_progress)
            .map(|(index, _)| NodeId(index as u32))
            .collect()
    }

    pub(crate) fn begin(&mut self, node: NodeId) {
        self.slot_mut(node).in_progress = true;
    }

    pub(crate) fn abandon(&mut self, node: NodeId) {
        self.slot_mut(node).in_progress = false;
    }

    pub(crate) fn finish(&mut self, node: NodeId, value: Value) {
        let slot = self.slot_mut(node);
        slot.in_progress = false;
        slot.value = Some(value);
    }

    pub(crate) fn cached_output(&self, node: NodeId, output: &str) -> Option<&Value> {
        self.slots.get(node.index()).and_then(|slot| slot.outputs.get(output))
    }

    pub(crate) fn cache_output(&mut self, node: NodeId, output: &str, value: Value) {
        self.slot_mut(node).outputs.insert(output.to_string(), value);
    }

    /// Consumes the state, keeping only the memoized values.
    pub(crate) fn into_values(self) -> Vec<Option<Value>> {
        self.slots.into_iter().map(|slot| slot.value).collect()
    }
}
