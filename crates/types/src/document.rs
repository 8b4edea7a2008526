//! Serialized node and link tables.
//!
//! The on-disk layout mirrors the relation consumed by the resolver: a node
//! table (`id`, `kind`, `factory`, `method`, `value`, `parent`) and a link
//! table (`source`, `spot`, `target`, `slot`, `index`, `argument`). Parsing
//! the text itself (JSON or YAML) is left to the caller.

use serde::{Deserialize, Serialize};

use crate::graph::{Graph, GraphError, Link, Node, NodeId, SourceSlot};

/// Kind tag of a serialized node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NodeRecordKind {
    Constant,
    #[default]
    Block,
}

/// One row of the node table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: u32,
    #[serde(default)]
    pub kind: NodeRecordKind,
    /// Declared type name for static blocks; producer kind for constants.
    #[serde(default)]
    pub factory: Option<String>,
    /// Factory operation name for blocks.
    #[serde(default)]
    pub method: Option<String>,
    /// Literal for constants.
    #[serde(default)]
    pub value: Option<String>,
    /// Producing node for dependent blocks.
    #[serde(default)]
    pub parent: Option<u32>,
}

/// One row of the link table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub source: u32,
    #[serde(default = "default_spot")]
    pub spot: String,
    pub target: u32,
    pub slot: String,
    #[serde(default = "default_index")]
    pub index: i64,
    #[serde(default = "default_argument")]
    pub argument: bool,
}

fn default_spot() -> String {
    SourceSlot::WHOLE.to_string()
}

fn default_index() -> i64 {
    -1
}

fn default_argument() -> bool {
    true
}

/// A complete graph document as produced by an external loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GraphDocument {
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub links: Vec<LinkRecord>,
}

impl GraphDocument {
    /// Converts the tables into a validated [`Graph`].
    pub fn into_graph(self) -> Result<Graph, GraphError> {
        let nodes = self.nodes.into_iter().map(NodeRecord::into_node).collect::<Result<Vec<_>, _>>()?;
        let links = self.links.into_iter().map(LinkRecord::into_link).collect::<Result<Vec<_>, _>>()?;
        Graph::new(nodes, links)
    }
}

impl NodeRecord {
    fn into_node(self) -> Result<Node, GraphError> {
        let id = NodeId(self.id);
        let malformed = |reason: &str| GraphError::MalformedNode {
            id,
            reason: reason.to_string(),
        };

        match self.kind {
            NodeRecordKind::Constant => {
                let producer_kind = self.factory.ok_or_else(|| malformed("constant is missing its 'factory' kind"))?;
                let literal = self.value.ok_or_else(|| malformed("constant is missing its 'value' literal"))?;
                Ok(Node::constant(id, producer_kind, literal))
            }
            NodeRecordKind::Block => {
                let operation = self.method.ok_or_else(|| malformed("block is missing its 'method'"))?;
                match (self.parent, self.factory) {
                    (Some(parent), _) => Ok(Node::dependent(id, parent, operation)),
                    (None, Some(type_name)) => Ok(Node::block(id, type_name, operation)),
                    (None, None) => Err(malformed("block needs either a 'factory' type or a 'parent' node")),
                }
            }
        }
    }
}

impl LinkRecord {
    fn into_link(self) -> Result<Link, GraphError> {
        let target_index = match self.index {
            -1 => None,
            index => Some(u32::try_from(index).map_err(|_| GraphError::MalformedLink {
                source_node: NodeId(self.source),
                target_node: NodeId(self.target),
                reason: format!("index {index} is out of range"),
            })?),
        };

        Ok(Link {
            source: NodeId(self.source),
            source_slot: SourceSlot::from(self.spot.as_str()),
            target: NodeId(self.target),
            target_slot: self.slot,
            target_index,
            is_argument: self.argument,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{NodeKind, Origin};

    #[test]
    fn yaml_document_applies_link_defaults() {
        let document: GraphDocument = serde_yaml::from_str(
            r#"
nodes:
  - { id: 1, kind: constant, factory: int, value: "42" }
  - { id: 2, factory: demo.Counter, method: of }
links:
  - { source: 1, target: 2, slot: value }
"#,
        )
        .expect("parse yaml");

        let graph = document.into_graph().expect("graph");
        let link = &graph.argument_links(NodeId(2), "value")[0];
        assert_eq!(link.source_slot, SourceSlot::Whole);
        assert_eq!(link.target_index, None);
        assert!(link.is_argument);
    }

    #[test]
    fn json_document_builds_dependent_nodes() {
        let document: GraphDocument = serde_json::from_str(
            r#"{
                "nodes": [
                    { "id": 1, "factory": "demo.Pool", "method": "create" },
                    { "id": 2, "parent": 1, "method": "open" }
                ],
                "links": [
                    { "source": 1, "spot": "size", "target": 2, "slot": "capacity", "index": 0, "argument": false }
                ]
            }"#,
        )
        .expect("parse json");

        let graph = document.into_graph().expect("graph");
        let node = graph.node(NodeId(2)).expect("node 2");
        assert_eq!(
            node.kind,
            NodeKind::Block {
                origin: Origin::Dependent {
                    parent: NodeId(1),
                    operation: "open".into()
                }
            }
        );
        let link = &graph.input_links(NodeId(2), "capacity")[0];
        assert_eq!(link.source_slot, SourceSlot::Output("size".into()));
        assert_eq!(link.target_index, Some(0));
    }

    #[test]
    fn constant_without_literal_is_malformed() {
        let document = GraphDocument {
            nodes: vec![NodeRecord {
                id: 3,
                kind: NodeRecordKind::Constant,
                factory: Some("int".into()),
                method: None,
                value: None,
                parent: None,
            }],
            links: Vec::new(),
        };

        let error = document.into_graph().expect_err("missing literal");
        assert!(matches!(error, GraphError::MalformedNode { id: NodeId(3), .. }), "{error}");
    }

    #[test]
    fn negative_index_below_sentinel_is_rejected() {
        let document = GraphDocument {
            nodes: vec![
                NodeRecord {
                    id: 1,
                    kind: NodeRecordKind::Constant,
                    factory: Some("int".into()),
                    method: None,
                    value: Some("1".into()),
                    parent: None,
                },
                NodeRecord {
                    id: 2,
                    kind: NodeRecordKind::Block,
                    factory: Some("demo.Sum".into()),
                    method: Some("of".into()),
                    value: None,
                    parent: None,
                },
            ],
            links: vec![LinkRecord {
                source: 1,
                spot: "*".into(),
                target: 2,
                slot: "values".into(),
                index: -4,
                argument: true,
            }],
        };

        let error = document.into_graph().expect_err("bad index");
        assert!(error.to_string().contains("out of range"), "{error}");
    }
}
