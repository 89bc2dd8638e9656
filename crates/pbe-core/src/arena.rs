//! Session-scoped node storage.
//!
//! Nodes are addressed by [`NodeId`] handles allocated from a per-arena
//! counter. The arena owns the graph, so node payloads and adjacency always
//! agree on which handles exist. Attributes are edges to interned
//! [`ConstantNode`]s; callers compare their literals, never their handles.

use std::collections::{BTreeMap, HashMap};

use crate::error::{EngineError, Result};
use crate::graph::{DiGraph, EdgeType, NodeId};
use crate::node::{ConstantNode, Node, NodeKind, ObjectNode, OutputNode, ValueNode};

#[derive(Clone, Debug, Default)]
pub struct Arena {
    nodes: BTreeMap<NodeId, Node>,
    graph: DiGraph,
    /// Interning cache keyed by (attribute, literal).
    constants: HashMap<(EdgeType, String), NodeId>,
    next_id: u64,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn graph(&self) -> &DiGraph {
        &self.graph
    }

    pub(crate) fn graph_mut(&mut self) -> &mut DiGraph {
        &mut self.graph
    }

    /// Allocate a handle for `kind` and register it in the graph.
    pub fn insert(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, Node::new(id, kind));
        self.graph.add_node(id);
        id
    }

    /// Remove a node and all its edges.
    pub fn remove(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.remove(&id)
            && let NodeKind::Constant(_) = node.kind
        {
            self.constants.retain(|_, v| *v != id);
        }
        self.graph.remove_node(id);
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(&id).ok_or(EngineError::NodeNotFound(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(&id).ok_or(EngineError::NodeNotFound(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Handles in creation order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn all_done(&self) -> bool {
        self.nodes.values().all(|n| n.done)
    }

    // -----------------------------------------------------------------------
    // Typed access
    // -----------------------------------------------------------------------

    pub fn value_node(&self, id: NodeId) -> Result<&ValueNode> {
        match &self.node(id)?.kind {
            NodeKind::Value(v) => Ok(v),
            other => Err(wrong_kind(id, "value node", other)),
        }
    }

    pub fn object(&self, id: NodeId) -> Result<&ObjectNode> {
        match &self.node(id)?.kind {
            NodeKind::Object(o) => Ok(o),
            other => Err(wrong_kind(id, "object node", other)),
        }
    }

    pub fn output(&self, id: NodeId) -> Result<&OutputNode> {
        match &self.node(id)?.kind {
            NodeKind::Output(o) => Ok(o),
            other => Err(wrong_kind(id, "output node", other)),
        }
    }

    // -----------------------------------------------------------------------
    // Attributes
    // -----------------------------------------------------------------------

    /// Find or create the constant holding `literal` for attribute `edge`.
    pub fn constant(&mut self, edge: EdgeType, literal: &str) -> NodeId {
        let key = (edge, literal.to_string());
        if let Some(&id) = self.constants.get(&key) {
            return id;
        }
        let id = self.insert(NodeKind::Constant(ConstantNode {
            literal: literal.to_string(),
        }));
        self.constants.insert(key, id);
        id
    }

    /// Point attribute `edge` of `node` at `literal`, replacing any previous
    /// value of that attribute.
    pub fn set_attribute(&mut self, node: NodeId, edge: EdgeType, literal: &str) -> Result<()> {
        self.clear_attribute(node, edge)?;
        let constant = self.constant(edge, literal);
        self.graph.add_edge(node, constant, edge);
        Ok(())
    }

    /// Drop every `edge` attribute of `node`.
    pub fn clear_attribute(&mut self, node: NodeId, edge: EdgeType) -> Result<()> {
        for old in self.graph.next_nodes(node, Some(edge))? {
            self.graph.remove_edge(node, old)?;
        }
        Ok(())
    }

    /// Constant node behind attribute `edge` of `node`.
    pub fn attribute_node(&self, node: NodeId, edge: EdgeType) -> Result<NodeId> {
        self.graph
            .next_node_exactly_one(node, Some(edge))?
            .ok_or(EngineError::MissingNeighbor { node, edge })
    }

    /// Literal of attribute `edge` of `node`.
    pub fn attribute(&self, node: NodeId, edge: EdgeType) -> Result<&str> {
        let constant = self.attribute_node(node, edge)?;
        match &self.node(constant)?.kind {
            NodeKind::Constant(c) => Ok(&c.literal),
            other => Err(wrong_kind(constant, "constant node", other)),
        }
    }

    pub fn int_attribute(&self, node: NodeId, edge: EdgeType) -> Result<i64> {
        let literal = self.attribute(node, edge)?;
        literal
            .parse()
            .map_err(|_| EngineError::MalformedAttribute {
                node,
                edge,
                literal: literal.to_string(),
            })
    }

    /// The single `child` of `node`; a missing child is a structural error.
    pub fn only_child(&self, node: NodeId) -> Result<NodeId> {
        self.graph
            .next_node_exactly_one(node, Some(EdgeType::Child))?
            .ok_or(EngineError::MissingNeighbor {
                node,
                edge: EdgeType::Child,
            })
    }

    // -----------------------------------------------------------------------
    // Chains
    // -----------------------------------------------------------------------

    /// Install `tokens` as value nodes linked by `seq` edges.
    pub fn install_chain(&mut self, tokens: &[String], tag: &str) -> Result<Vec<NodeId>> {
        let mut chain = Vec::with_capacity(tokens.len());
        for (pos, token) in tokens.iter().enumerate() {
            let id = self.insert(NodeKind::Value(ValueNode {
                value: token.clone(),
                pos,
                tag: format!("{tag}.{pos}"),
            }));
            self.set_attribute(id, EdgeType::PosAttr, &pos.to_string())?;
            self.set_attribute(id, EdgeType::ValueAttr, token)?;
            if let Some(&prev) = chain.last() {
                self.graph.add_edge(prev, id, EdgeType::Seq);
            }
            chain.push(id);
        }
        Ok(chain)
    }

    /// Install `len` empty output nodes linked by `seq` edges.
    pub fn install_output_chain(&mut self, len: usize) -> Result<Vec<NodeId>> {
        let mut chain = Vec::with_capacity(len);
        for pos in 0..len {
            let id = self.insert(NodeKind::Output(OutputNode { pos }));
            self.set_attribute(id, EdgeType::PosAttr, &pos.to_string())?;
            self.set_attribute(id, EdgeType::ValueAttr, "")?;
            if let Some(&prev) = chain.last() {
                self.graph.add_edge(prev, id, EdgeType::Seq);
            }
            chain.push(id);
        }
        Ok(chain)
    }
}

fn wrong_kind(node: NodeId, expected: &'static str, found: &NodeKind) -> EngineError {
    EngineError::WrongKind {
        node,
        expected,
        found: found.name(),
    }
}
