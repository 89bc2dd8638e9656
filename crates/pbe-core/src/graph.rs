//! Typed directed-edge store over node handles.
//!
//! Holds at most one edge per ordered pair: adding a second edge between the
//! same endpoints overwrites its type. Adjacency is kept in both directions so
//! predecessor queries are as cheap as successor queries. All queries iterate
//! in ascending handle order, which is creation order.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Stable handle of a node within one session arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeType {
    /// Sequence order: position i -> position i+1.
    Seq,
    /// Ownership, parent -> child.
    Child,
    /// Rule -> the value node it is keyed by.
    In,
    /// Rule -> the classification it produces.
    Out,
    /// Generalizer -> rule.
    Rule,
    ValueAttr,
    PosAttr,
    TypeAttr,
    DeltaAttr,
    /// Classification -> the before-side value node it originated from.
    InputValue,
}

impl EdgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seq => "seq",
            Self::Child => "child",
            Self::In => "in",
            Self::Out => "out",
            Self::Rule => "rule",
            Self::ValueAttr => "value",
            Self::PosAttr => "pos",
            Self::TypeAttr => "type",
            Self::DeltaAttr => "delta",
            Self::InputValue => "input-value",
        }
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type Adjacency = BTreeMap<NodeId, BTreeMap<NodeId, EdgeType>>;

#[derive(Clone, Debug, Default)]
pub struct DiGraph {
    succ: Adjacency,
    pred: Adjacency,
}

impl DiGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node with empty adjacency. No-op if already present.
    pub fn add_node(&mut self, n: NodeId) {
        self.succ.entry(n).or_default();
        self.pred.entry(n).or_default();
    }

    /// Add `u -> v`, registering both endpoints. Replaces any existing edge
    /// between the same ordered pair.
    pub fn add_edge(&mut self, u: NodeId, v: NodeId, edge: EdgeType) {
        self.add_node(u);
        self.add_node(v);
        self.succ.entry(u).or_default().insert(v, edge);
        self.pred.entry(v).or_default().insert(u, edge);
    }

    pub fn remove_edge(&mut self, u: NodeId, v: NodeId) -> Result<()> {
        let removed = self.succ.get_mut(&u).and_then(|nbrs| nbrs.remove(&v));
        if removed.is_none() {
            return Err(EngineError::EdgeNotFound { from: u, to: v });
        }
        if let Some(nbrs) = self.pred.get_mut(&v) {
            nbrs.remove(&u);
        }
        Ok(())
    }

    /// Remove `n` and every incident edge. Absent nodes are ignored.
    pub fn remove_node(&mut self, n: NodeId) {
        if let Some(out) = self.succ.remove(&n) {
            for v in out.keys() {
                if let Some(nbrs) = self.pred.get_mut(v) {
                    nbrs.remove(&n);
                }
            }
        }
        if let Some(inc) = self.pred.remove(&n) {
            for u in inc.keys() {
                if let Some(nbrs) = self.succ.get_mut(u) {
                    nbrs.remove(&n);
                }
            }
        }
    }

    pub fn contains(&self, n: NodeId) -> bool {
        self.succ.contains_key(&n)
    }

    pub fn node_count(&self) -> usize {
        self.succ.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.succ.keys().copied()
    }

    /// Type of the edge `u -> v`, if present.
    pub fn edge(&self, u: NodeId, v: NodeId) -> Option<EdgeType> {
        self.succ.get(&u).and_then(|nbrs| nbrs.get(&v)).copied()
    }

    /// Every edge as `(from, to, type)`.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId, EdgeType)> + '_ {
        self.succ
            .iter()
            .flat_map(|(&u, nbrs)| nbrs.iter().map(move |(&v, &e)| (u, v, e)))
    }

    pub fn successors(&self, n: NodeId) -> Result<Vec<NodeId>> {
        self.next_nodes(n, None)
    }

    pub fn next_nodes(&self, n: NodeId, edge: Option<EdgeType>) -> Result<Vec<NodeId>> {
        Ok(filter(adjacent(&self.succ, n)?, edge))
    }

    pub fn previous_nodes(&self, n: NodeId, edge: Option<EdgeType>) -> Result<Vec<NodeId>> {
        Ok(filter(adjacent(&self.pred, n)?, edge))
    }

    /// The single successor of `n` over `edge`, or `None` if there is none.
    pub fn next_node_exactly_one(&self, n: NodeId, edge: Option<EdgeType>) -> Result<Option<NodeId>> {
        at_most_one(n, edge, self.next_nodes(n, edge)?)
    }

    /// The single predecessor of `n` over `edge`, or `None` if there is none.
    pub fn previous_node_exactly_one(
        &self,
        n: NodeId,
        edge: Option<EdgeType>,
    ) -> Result<Option<NodeId>> {
        at_most_one(n, edge, self.previous_nodes(n, edge)?)
    }

    /// All outgoing `(neighbour, type)` pairs of `n`.
    pub fn next_edges(&self, n: NodeId) -> Result<Vec<(NodeId, EdgeType)>> {
        Ok(adjacent(&self.succ, n)?
            .iter()
            .map(|(&v, &e)| (v, e))
            .collect())
    }
}

fn adjacent(adj: &Adjacency, n: NodeId) -> Result<&BTreeMap<NodeId, EdgeType>> {
    adj.get(&n).ok_or(EngineError::NodeNotFound(n))
}

fn filter(nbrs: &BTreeMap<NodeId, EdgeType>, edge: Option<EdgeType>) -> Vec<NodeId> {
    nbrs.iter()
        .filter(|&(_, e)| edge.is_none_or(|want| *e == want))
        .map(|(&v, _)| v)
        .collect()
}

fn at_most_one(n: NodeId, edge: Option<EdgeType>, nodes: Vec<NodeId>) -> Result<Option<NodeId>> {
    match nodes.as_slice() {
        [] => Ok(None),
        [only] => Ok(Some(*only)),
        _ => Err(EngineError::MultiplicityViolation {
            node: n,
            edge,
            found: nodes.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u64) -> NodeId {
        NodeId(n)
    }

    #[test]
    fn test_add_node_idempotent() {
        let mut g = DiGraph::new();
        g.add_node(id(1));
        g.add_edge(id(1), id(2), EdgeType::Seq);
        g.add_node(id(1));
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.successors(id(1)).unwrap(), vec![id(2)]);
    }

    #[test]
    fn test_second_edge_overwrites_type() {
        let mut g = DiGraph::new();
        g.add_edge(id(1), id(2), EdgeType::Seq);
        g.add_edge(id(1), id(2), EdgeType::Child);
        assert_eq!(g.edge(id(1), id(2)), Some(EdgeType::Child));
        assert!(g.next_nodes(id(1), Some(EdgeType::Seq)).unwrap().is_empty());
        assert_eq!(g.previous_nodes(id(2), Some(EdgeType::Child)).unwrap(), vec![id(1)]);
        assert_eq!(g.edges().count(), 1);
    }

    #[test]
    fn test_type_filter() {
        let mut g = DiGraph::new();
        g.add_edge(id(0), id(1), EdgeType::Child);
        g.add_edge(id(0), id(2), EdgeType::ValueAttr);
        g.add_edge(id(0), id(3), EdgeType::Child);
        assert_eq!(
            g.next_nodes(id(0), Some(EdgeType::Child)).unwrap(),
            vec![id(1), id(3)]
        );
        assert_eq!(g.next_nodes(id(0), None).unwrap().len(), 3);
    }

    #[test]
    fn test_unknown_node() {
        let g = DiGraph::new();
        assert_eq!(g.successors(id(9)), Err(EngineError::NodeNotFound(id(9))));
        assert_eq!(
            g.previous_nodes(id(9), None),
            Err(EngineError::NodeNotFound(id(9)))
        );
    }

    #[test]
    fn test_exactly_one() {
        let mut g = DiGraph::new();
        g.add_edge(id(0), id(1), EdgeType::Seq);
        g.add_edge(id(1), id(2), EdgeType::Seq);
        assert_eq!(g.next_node_exactly_one(id(0), Some(EdgeType::Seq)), Ok(Some(id(1))));
        assert_eq!(g.previous_node_exactly_one(id(0), Some(EdgeType::Seq)), Ok(None));
        assert_eq!(g.next_node_exactly_one(id(2), Some(EdgeType::Seq)), Ok(None));

        g.add_edge(id(0), id(5), EdgeType::Seq);
        assert_eq!(
            g.next_node_exactly_one(id(0), Some(EdgeType::Seq)),
            Err(EngineError::MultiplicityViolation {
                node: id(0),
                edge: Some(EdgeType::Seq),
                found: 2
            })
        );
    }

    #[test]
    fn test_remove_edge() {
        let mut g = DiGraph::new();
        g.add_edge(id(0), id(1), EdgeType::Child);
        g.remove_edge(id(0), id(1)).unwrap();
        assert!(g.successors(id(0)).unwrap().is_empty());
        assert!(g.previous_nodes(id(1), None).unwrap().is_empty());
        assert_eq!(
            g.remove_edge(id(0), id(1)),
            Err(EngineError::EdgeNotFound {
                from: id(0),
                to: id(1)
            })
        );
    }

    #[test]
    fn test_remove_node_drops_incident_edges() {
        let mut g = DiGraph::new();
        g.add_edge(id(0), id(1), EdgeType::Child);
        g.add_edge(id(1), id(2), EdgeType::ValueAttr);
        g.add_edge(id(3), id(1), EdgeType::Child);
        g.remove_node(id(1));
        assert!(!g.contains(id(1)));
        assert!(g.successors(id(0)).unwrap().is_empty());
        assert!(g.successors(id(3)).unwrap().is_empty());
        assert!(g.previous_nodes(id(2), None).unwrap().is_empty());
        assert_eq!(g.edges().count(), 0);
    }

    #[test]
    fn test_next_edges() {
        let mut g = DiGraph::new();
        g.add_edge(id(4), id(5), EdgeType::PosAttr);
        g.add_edge(id(4), id(6), EdgeType::ValueAttr);
        assert_eq!(
            g.next_edges(id(4)).unwrap(),
            vec![(id(5), EdgeType::PosAttr), (id(6), EdgeType::ValueAttr)]
        );
    }
}
