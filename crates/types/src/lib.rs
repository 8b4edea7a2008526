//! # Blockwire Types
//!
//! Shared graph model consumed by the Blockwire engine: nodes (constants and
//! blocks), links between their slots, and the serialized document format an
//! external loader produces.

pub mod document;
pub mod graph;

pub use document::{GraphDocument, LinkRecord, NodeRecord, NodeRecordKind};
pub use graph::{
    Graph, GraphError, Link, LinkGroup, MIN_NODE_ID_LIMIT, Node, NodeId, NodeKind, Origin, SourceSlot, node_id_limit,
};
