//! Bounded two-sided positional search.
//!
//! A search node starts on one value node and walks outward along `seq`
//! edges, alternating sides, until its `child` points at a node holding the
//! target value or it runs out of energy. Energy pays for probes only;
//! checking the current candidate is free, so a search needs at most
//! `energy + 2` steps to settle.

use tracing::debug;

use crate::arena::Arena;
use crate::error::Result;
use crate::graph::{EdgeType, NodeId};
use crate::node::{Node, NodeKind};
use crate::step::{Effect, GraphOp, NodeUpdate};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

/// Mutable part of a search. `None` probe counters mean that side has run
/// off the end of the chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchCursor {
    pub energy_units: u32,
    pub left_index: Option<u32>,
    pub right_index: Option<u32>,
    pub left_node: Option<NodeId>,
    pub right_node: Option<NodeId>,
}

impl SearchCursor {
    pub fn new(energy_units: u32) -> Self {
        Self {
            energy_units,
            left_index: Some(0),
            right_index: Some(0),
            left_node: None,
            right_node: None,
        }
    }

    /// Side to probe next: left while it is live and not ahead of the right.
    pub fn direction(&self) -> Option<Direction> {
        match (self.left_index, self.right_index) {
            (Some(l), Some(r)) if l <= r => Some(Direction::Left),
            (Some(_), None) => Some(Direction::Left),
            (_, Some(_)) => Some(Direction::Right),
            (None, None) => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SearchNode {
    pub target: String,
    /// Value node the search started on.
    pub origin: NodeId,
    pub cursor: SearchCursor,
}

impl SearchNode {
    pub fn new(target: &str, origin: NodeId, energy_units: u32) -> Self {
        Self {
            target: target.to_string(),
            origin,
            cursor: SearchCursor::new(energy_units),
        }
    }
}

/// Install a search rooted at `origin` with its initial `child` edge.
pub fn install(arena: &mut Arena, target: &str, origin: NodeId, energy_units: u32) -> NodeId {
    let id = arena.insert(NodeKind::Search(SearchNode::new(target, origin, energy_units)));
    arena.graph_mut().add_edge(id, origin, EdgeType::Child);
    id
}

pub(crate) fn plan(arena: &Arena, node: &Node, search: &SearchNode) -> Result<Effect> {
    if node.score >= 1.0 {
        return Effect::idle(arena, node.id);
    }

    let current = arena.only_child(node.id)?;
    if arena.attribute(current, EdgeType::ValueAttr)? == search.target {
        debug!(node = %node.id, target = %search.target, at = %current, "search matched");
        return Ok(Effect {
            node: node.id,
            score: 1.0,
            done: true,
            update: None,
            ops: Vec::new(),
        });
    }

    let mut cursor = search.cursor;
    let Some(direction) = cursor.direction().filter(|_| cursor.energy_units > 0) else {
        if !node.done {
            debug!(node = %node.id, target = %search.target, "search exhausted");
        }
        return Ok(Effect {
            node: node.id,
            score: 0.0,
            done: true,
            update: None,
            ops: Vec::new(),
        });
    };

    cursor.energy_units -= 1;
    let graph = arena.graph();
    let mut ops = Vec::new();
    match direction {
        Direction::Left => {
            let from = cursor.left_node.unwrap_or(search.origin);
            match graph.previous_node_exactly_one(from, Some(EdgeType::Seq))? {
                Some(found) => {
                    debug!(node = %node.id, %found, "search moving left");
                    ops.push(retarget(node.id, current, found));
                    cursor.left_node = Some(found);
                    cursor.left_index = cursor.left_index.map(|i| i + 1);
                }
                None => cursor.left_index = None,
            }
        }
        Direction::Right => {
            let from = cursor.right_node.unwrap_or(search.origin);
            match graph.next_node_exactly_one(from, Some(EdgeType::Seq))? {
                Some(found) => {
                    debug!(node = %node.id, %found, "search moving right");
                    ops.push(retarget(node.id, current, found));
                    cursor.right_node = Some(found);
                    cursor.right_index = cursor.right_index.map(|i| i + 1);
                }
                None => cursor.right_index = None,
            }
        }
    }

    Ok(Effect {
        node: node.id,
        score: 0.0,
        done: false,
        update: Some(NodeUpdate::Search(cursor)),
        ops,
    })
}

fn retarget(source: NodeId, from: NodeId, to: NodeId) -> GraphOp {
    GraphOp::Retarget {
        source,
        from,
        to,
        edge: EdgeType::Child,
    }
}
