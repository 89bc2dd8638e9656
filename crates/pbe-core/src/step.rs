//! Evaluate-then-commit stepping.
//!
//! A tick first asks every node for an [`Effect`] computed against the
//! unchanged arena, then commits the effects in order. No node observes
//! another node's changes from the same tick, so evaluation order inside a
//! tick does not affect the result.

use crate::apply;
use crate::arena::Arena;
use crate::constants::COPYABLE_ATTRIBUTES;
use crate::error::{EngineError, Result};
use crate::generalize::{self, RuleConflict};
use crate::graph::{EdgeType, NodeId};
use crate::matcher;
use crate::node::{Classification, NodeKind, ObjectNode, RuleNode};
use crate::search::{self, SearchCursor};

/// Change to a node's own state.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeUpdate {
    Search(SearchCursor),
    /// Pop the work queue of a generalize or apply-rules node.
    Advance,
    /// Pop the generalizer queue and record a conflict.
    Conflict(RuleConflict),
}

/// Change to the shared graph.
#[derive(Clone, Debug, PartialEq)]
pub enum GraphOp {
    /// Move the `edge` from `source` off `from` and onto `to`.
    Retarget {
        source: NodeId,
        from: NodeId,
        to: NodeId,
        edge: EdgeType,
    },
    AddEdge {
        source: NodeId,
        target: NodeId,
        edge: EdgeType,
    },
    RemoveNode(NodeId),
    /// Create an object node and hang it above `matcher`.
    Classify {
        matcher: NodeId,
        classification: Classification,
        input: Option<NodeId>,
    },
    /// Create a rule owned by `owner` mapping `input` to `output`.
    AddRule {
        owner: NodeId,
        input: NodeId,
        output: NodeId,
    },
    /// Overwrite the copyable attributes of `target` with those of `source`.
    CopyAttributes { source: NodeId, target: NodeId },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Effect {
    pub node: NodeId,
    pub score: f64,
    pub done: bool,
    pub update: Option<NodeUpdate>,
    pub ops: Vec<GraphOp>,
}

impl Effect {
    /// An effect that leaves the node exactly as it is.
    pub fn idle(arena: &Arena, node: NodeId) -> Result<Self> {
        let n = arena.node(node)?;
        Ok(Self {
            node,
            score: n.score,
            done: n.done,
            update: None,
            ops: Vec::new(),
        })
    }

    pub fn is_idle(&self) -> bool {
        self.update.is_none() && self.ops.is_empty()
    }
}

/// Evaluate one node's step against the current arena.
pub fn plan(arena: &Arena, id: NodeId) -> Result<Effect> {
    let node = arena.node(id)?;
    match &node.kind {
        NodeKind::Search(s) => search::plan(arena, node, s),
        NodeKind::Matcher(m) => matcher::plan(arena, node, m),
        NodeKind::Generalize(g) => generalize::plan(arena, node, g),
        NodeKind::ApplyRules(a) => apply::plan(arena, node, a),
        NodeKind::Value(_)
        | NodeKind::Constant(_)
        | NodeKind::Object(_)
        | NodeKind::Rule(_)
        | NodeKind::Output(_) => Effect::idle(arena, id),
    }
}

/// Run one tick over every node in the arena. Returns whether every node is
/// done afterwards.
///
/// Effects are planned for a snapshot of the node set, then committed in
/// snapshot order. A node removed by an earlier commit of the same tick has
/// its effect dropped. Nodes created while committing are first stepped on the
/// next tick.
pub fn tick(arena: &mut Arena) -> Result<bool> {
    let effects = arena
        .node_ids()
        .into_iter()
        .map(|id| plan(arena, id))
        .collect::<Result<Vec<_>>>()?;
    for effect in effects {
        if !arena.contains(effect.node) {
            continue;
        }
        commit(arena, effect)?;
    }
    Ok(arena.all_done())
}

/// Apply an effect produced by [`plan`].
pub fn commit(arena: &mut Arena, effect: Effect) -> Result<()> {
    let Effect {
        node,
        score,
        done,
        update,
        ops,
    } = effect;

    {
        let n = arena.node_mut(node)?;
        n.score = score;
        n.done = done;
        match (update, &mut n.kind) {
            (None, _) => {}
            (Some(NodeUpdate::Search(cursor)), NodeKind::Search(s)) => s.cursor = cursor,
            (Some(NodeUpdate::Advance), NodeKind::Generalize(g)) => {
                g.queue.pop();
            }
            (Some(NodeUpdate::Advance), NodeKind::ApplyRules(a)) => {
                a.queue.pop();
            }
            (Some(NodeUpdate::Conflict(conflict)), NodeKind::Generalize(g)) => {
                g.queue.pop();
                g.conflict = Some(conflict);
            }
            (Some(update), kind) => {
                return Err(EngineError::Unsupported(format!(
                    "update {update:?} cannot be applied to a {}",
                    kind.name()
                )));
            }
        }
    }

    for op in ops {
        apply_op(arena, op)?;
    }
    Ok(())
}

fn apply_op(arena: &mut Arena, op: GraphOp) -> Result<()> {
    match op {
        GraphOp::Retarget {
            source,
            from,
            to,
            edge,
        } => {
            let graph = arena.graph_mut();
            graph.remove_edge(source, from)?;
            graph.add_edge(source, to, edge);
        }
        GraphOp::AddEdge {
            source,
            target,
            edge,
        } => arena.graph_mut().add_edge(source, target, edge),
        GraphOp::RemoveNode(id) => arena.remove(id),
        GraphOp::Classify {
            matcher,
            classification,
            input,
        } => {
            let value = classification.value.clone();
            let kind = classification.kind;
            let delta = classification.delta;
            let object = arena.insert(NodeKind::Object(ObjectNode {
                classification,
                input,
            }));
            arena.set_attribute(object, EdgeType::ValueAttr, &value)?;
            arena.set_attribute(object, EdgeType::TypeAttr, kind.as_str())?;
            arena.set_attribute(object, EdgeType::DeltaAttr, &delta.to_string())?;
            if let Some(input) = input {
                arena.graph_mut().add_edge(object, input, EdgeType::InputValue);
            }
            arena.graph_mut().add_edge(object, matcher, EdgeType::Child);
        }
        GraphOp::AddRule {
            owner,
            input,
            output,
        } => {
            let rule = arena.insert(NodeKind::Rule(RuleNode));
            let graph = arena.graph_mut();
            graph.add_edge(rule, input, EdgeType::In);
            graph.add_edge(rule, output, EdgeType::Out);
            graph.add_edge(owner, rule, EdgeType::Rule);
        }
        GraphOp::CopyAttributes { source, target } => {
            for edge in COPYABLE_ATTRIBUTES {
                arena.clear_attribute(target, edge)?;
            }
            for edge in COPYABLE_ATTRIBUTES {
                let constant = arena.attribute_node(source, edge)?;
                arena.graph_mut().add_edge(target, constant, edge);
            }
        }
    }
    Ok(())
}
