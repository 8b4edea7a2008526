//! # Graph Model
//!
//! Immutable description of an application: value producers (nodes) and the
//! directed data dependencies between them (links). A [`Graph`] is built once
//! per run from an external loader and is read-only afterwards.
//!
//! Links are grouped by `(target, slot)` into two orderings:
//!
//! - **argument-time** links feed factory parameters while a node is constructed
//! - **input-time** links feed mutators after every node has been constructed
//!
//! Each group is sorted by `target_index`, so declaration order carries no
//! meaning for how multi-valued slots are filled.

use std::{collections::BTreeMap, fmt, str::FromStr};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Identifier of a node within one graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Position of this node in an id-indexed table.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Where a block obtains its factory operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// A static operation on a declared top-level type.
    Static { type_name: String, operation: String },
    /// An instance operation on the value already produced by `parent`.
    Dependent { parent: NodeId, operation: String },
}

impl Origin {
    pub fn operation(&self) -> &str {
        match self {
            Origin::Static { operation, .. } | Origin::Dependent { operation, .. } => operation,
        }
    }
}

/// The two kinds of graph vertices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// A dependency-free literal, converted according to `producer_kind`.
    Constant { producer_kind: String, literal: String },
    /// A factory invocation.
    Block { origin: Origin },
}

/// A graph vertex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
}

impl Node {
    pub fn constant(id: impl Into<NodeId>, producer_kind: impl Into<String>, literal: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: NodeKind::Constant {
                producer_kind: producer_kind.into(),
                literal: literal.into(),
            },
        }
    }

    pub fn block(id: impl Into<NodeId>, type_name: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: NodeKind::Block {
                origin: Origin::Static {
                    type_name: type_name.into(),
                    operation: operation.into(),
                },
            },
        }
    }

    pub fn dependent(id: impl Into<NodeId>, parent: impl Into<NodeId>, operation: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: NodeKind::Block {
                origin: Origin::Dependent {
                    parent: parent.into(),
                    operation: operation.into(),
                },
            },
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.kind, NodeKind::Constant { .. })
    }

    /// True when the factory is an instance operation on another node's value.
    pub fn is_dependent(&self) -> bool {
        matches!(self.kind, NodeKind::Block { origin: Origin::Dependent { .. } })
    }

    /// Short human-readable description used in logs.
    pub fn describe(&self) -> String {
        match &self.kind {
            NodeKind::Constant { producer_kind, literal } => format!("{producer_kind}({literal:?})"),
            NodeKind::Block {
                origin: Origin::Static { type_name, operation },
            } => format!("{type_name}.{operation}"),
            NodeKind::Block {
                origin: Origin::Dependent { parent, operation },
            } => format!("{parent}.{operation}"),
        }
    }
}

/// Source side of a link ("spot").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceSlot {
    /// `"*"`: the whole produced value.
    Whole,
    /// A named zero-argument accessor on the produced value.
    Output(String),
}

impl SourceSlot {
    pub const WHOLE: &'static str = "*";

    pub fn as_str(&self) -> &str {
        match self {
            SourceSlot::Whole => Self::WHOLE,
            SourceSlot::Output(name) => name,
        }
    }
}

impl From<&str> for SourceSlot {
    fn from(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed == Self::WHOLE {
            SourceSlot::Whole
        } else {
            SourceSlot::Output(trimmed.to_string())
        }
    }
}

impl FromStr for SourceSlot {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(SourceSlot::from(value))
    }
}

impl fmt::Display for SourceSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directed edge from a source node's output to a target node's slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub source: NodeId,
    pub source_slot: SourceSlot,
    pub target: NodeId,
    /// Factory parameter name (argument-time) or mutator name (input-time).
    pub target_slot: String,
    /// Position within a multi-valued slot; `None` for single-valued slots.
    pub target_index: Option<u32>,
    pub is_argument: bool,
}

impl Link {
    /// Argument-time link feeding the whole source value into `target_slot`.
    pub fn argument(source: impl Into<NodeId>, target: impl Into<NodeId>, target_slot: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            source_slot: SourceSlot::Whole,
            target: target.into(),
            target_slot: target_slot.into(),
            target_index: None,
            is_argument: true,
        }
    }

    /// Input-time link invoking the `target_slot` mutator after construction.
    pub fn input(source: impl Into<NodeId>, target: impl Into<NodeId>, target_slot: impl Into<String>) -> Self {
        Self {
            is_argument: false,
            ..Self::argument(source, target, target_slot)
        }
    }

    pub fn from_output(mut self, output: impl Into<String>) -> Self {
        self.source_slot = SourceSlot::Output(output.into());
        self
    }

    pub fn at_index(mut self, index: u32) -> Self {
        self.target_index = Some(index);
        self
    }
}

/// Violations of the graph invariants detected while building a [`Graph`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("node {id} is declared more than once")]
    DuplicateNode { id: NodeId },

    #[error("link {source_node} -> {target_node}.{slot} references unknown node {missing}")]
    UnknownEndpoint {
        source_node: NodeId,
        target_node: NodeId,
        slot: String,
        missing: NodeId,
    },

    #[error("node {node} depends on unknown parent node {parent}")]
    UnknownParent { node: NodeId, parent: NodeId },

    #[error("node {id} is out of range: ids must stay below {limit} for a graph of this size")]
    NodeIdOutOfRange { id: NodeId, limit: u64 },

    #[error("node {node} is not part of the graph")]
    UnknownNode { node: NodeId },

    #[error("malformed record for node {id}: {reason}")]
    MalformedNode { id: NodeId, reason: String },

    #[error("malformed link {source_node} -> {target_node}: {reason}")]
    MalformedLink {
        source_node: NodeId,
        target_node: NodeId,
        reason: String,
    },
}

/// Links bound to one `(target, slot)` pair, ordered by target index.
pub type LinkGroup = [Link];

type SlotGroups = IndexMap<String, Vec<Link>>;

/// Smallest id bound; ids below it are accepted however small the graph is.
pub const MIN_NODE_ID_LIMIT: u64 = 1024;

/// Exclusive upper bound on node ids for a graph of `len` nodes.
///
/// Resolution state is indexed by id, so ids must stay close to the node count.
pub fn node_id_limit(len: usize) -> u64 {
    (len as u64).saturating_mul(4).max(MIN_NODE_ID_LIMIT)
}

/// Read-only graph of nodes and grouped links.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: BTreeMap<NodeId, Node>,
    argument_links: BTreeMap<NodeId, SlotGroups>,
    input_links: BTreeMap<NodeId, SlotGroups>,
}

impl Graph {
    /// Builds a graph, validating that ids are unique and every link endpoint exists.
    pub fn new(nodes: impl IntoIterator<Item = Node>, links: impl IntoIterator<Item = Link>) -> Result<Self, GraphError> {
        let mut table = BTreeMap::new();
        for node in nodes {
            let id = node.id;
            if table.insert(id, node).is_some() {
                return Err(GraphError::DuplicateNode { id });
            }
        }

        let limit = node_id_limit(table.len());
        if let Some(&id) = table.keys().next_back()
            && u64::from(id.0) >= limit
        {
            return Err(GraphError::NodeIdOutOfRange { id, limit });
        }

        for node in table.values() {
            if let NodeKind::Block {
                origin: Origin::Dependent { parent, .. },
            } = &node.kind
                && !table.contains_key(parent)
            {
                return Err(GraphError::UnknownParent {
                    node: node.id,
                    parent: *parent,
                });
            }
        }

        let mut graph = Graph {
            nodes: table,
            ..Default::default()
        };
        for link in links {
            for endpoint in [link.source, link.target] {
                if !graph.nodes.contains_key(&endpoint) {
                    return Err(GraphError::UnknownEndpoint {
                        source_node: link.source,
                        target_node: link.target,
                        slot: link.target_slot.clone(),
                        missing: endpoint,
                    });
                }
            }
            graph.insert_link(link);
        }

        for groups in graph.argument_links.values_mut().chain(graph.input_links.values_mut()) {
            for links in groups.values_mut() {
                links.sort_by_key(|link| link.target_index.unwrap_or(0));
            }
        }

        Ok(graph)
    }

    fn insert_link(&mut self, link: Link) {
        let table = if link.is_argument {
            &mut self.argument_links
        } else {
            &mut self.input_links
        };
        let group = table
            .entry(link.target)
            .or_default()
            .entry(link.target_slot.clone())
            .or_default();

        if link.target_index.is_none() {
            if !group.is_empty() {
                warn!(
                    target_node = %link.target,
                    slot = %link.target_slot,
                    replaced = group.len(),
                    "single-valued slot bound more than once; keeping the last link"
                );
                group.clear();
            }
        } else if group.iter().any(|existing| existing.target_index.is_none()) {
            warn!(
                target_node = %link.target,
                slot = %link.target_slot,
                "indexed link mixed with a single-valued link on the same slot"
            );
        }
        group.push(link);
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// All nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Largest node id, used to size id-indexed tables. `None` for an empty graph.
    pub fn max_node_id(&self) -> Option<NodeId> {
        self.nodes.keys().next_back().copied()
    }

    /// Argument-time links bound to `(target, slot)`, ordered by index.
    pub fn argument_links(&self, target: NodeId, slot: &str) -> &LinkGroup {
        Self::group(&self.argument_links, target, slot)
    }

    /// Input-time links bound to `(target, slot)`, ordered by index.
    pub fn input_links(&self, target: NodeId, slot: &str) -> &LinkGroup {
        Self::group(&self.input_links, target, slot)
    }

    /// Every input-time slot bound on `target`, in first-declaration order.
    pub fn input_groups(&self, target: NodeId) -> impl Iterator<Item = (&str, &LinkGroup)> {
        self.input_links
            .get(&target)
            .into_iter()
            .flat_map(|groups| groups.iter().map(|(slot, links)| (slot.as_str(), links.as_slice())))
    }

    fn group<'a>(table: &'a BTreeMap<NodeId, SlotGroups>, target: NodeId, slot: &str) -> &'a LinkGroup {
        table
            .get(&target)
            .and_then(|groups| groups.get(slot))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
