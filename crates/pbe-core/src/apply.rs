//! Rule application onto a fresh input.
//!
//! The applier walks the new input chain newest-position-first, looks up the
//! learned rule for each non-empty value and copies the rule's recorded value
//! onto the output node the rule points at. Copies overwrite, so applying the
//! same rules twice leaves the output unchanged.

use tracing::{debug, info};

use crate::arena::Arena;
use crate::error::{EngineError, Result};
use crate::generalize::{find_rule, rule_output};
use crate::graph::{EdgeType, NodeId};
use crate::node::{ClassKind, Node, NodeKind};
use crate::step::{Effect, GraphOp, NodeUpdate};

#[derive(Clone, Debug)]
pub struct ApplyRulesNode {
    /// Generalizer whose rules are applied.
    pub generalizer: NodeId,
    /// Input value nodes still to process; the last one is next.
    pub queue: Vec<NodeId>,
    /// Output nodes indexed by position.
    pub outputs: Vec<NodeId>,
    pub total: usize,
}

pub fn install(
    arena: &mut Arena,
    generalizer: NodeId,
    inputs: Vec<NodeId>,
    outputs: Vec<NodeId>,
) -> NodeId {
    info!(positions = inputs.len(), "installing rule applier");
    let total = inputs.len();
    arena.insert(NodeKind::ApplyRules(ApplyRulesNode {
        generalizer,
        queue: inputs,
        outputs,
        total,
    }))
}

/// Walk `delta` steps from `start` along the output chain: backwards for a
/// positive delta, forwards for a negative one. Landing position is
/// `pos - delta`.
pub fn walk(arena: &Arena, start: NodeId, pos: usize, delta: i64) -> Result<NodeId> {
    let needed = delta.unsigned_abs();
    let mut current = start;
    for walked in 0..needed {
        let next = if delta > 0 {
            arena
                .graph()
                .previous_node_exactly_one(current, Some(EdgeType::Seq))?
        } else {
            arena.graph().next_node_exactly_one(current, Some(EdgeType::Seq))?
        };
        current = next.ok_or(EngineError::ChainExhausted {
            pos,
            walked,
            needed,
        })?;
    }
    Ok(current)
}

pub(crate) fn plan(arena: &Arena, node: &Node, a: &ApplyRulesNode) -> Result<Effect> {
    let Some(&input) = a.queue.last() else {
        return Ok(Effect {
            node: node.id,
            score: 1.0,
            done: true,
            update: None,
            ops: Vec::new(),
        });
    };

    let pos = arena.value_node(input)?.pos;
    let output = *a.outputs.get(pos).ok_or(EngineError::MissingNeighbor {
        node: input,
        edge: EdgeType::Seq,
    })?;
    let value = arena.attribute(input, EdgeType::ValueAttr)?;

    let remaining = a.queue.len() - 1;
    let mut ops = vec![GraphOp::AddEdge {
        source: node.id,
        target: input,
        edge: EdgeType::Child,
    }];

    if value.is_empty() {
        debug!(pos, "skipping empty input");
    } else {
        let rule = find_rule(arena, a.generalizer, value)?
            .ok_or_else(|| EngineError::NoRuleFound(value.to_string()))?;
        let object = rule_output(arena, rule)?;
        let classification = &arena.object(object)?.classification;
        let target = match classification.kind {
            ClassKind::Stay => Some(output),
            ClassKind::Move => Some(walk(arena, output, pos, classification.delta)?),
            ClassKind::Gone => None,
            ClassKind::Appear => {
                return Err(EngineError::Unsupported(format!(
                    "appear rule for value {value:?} cannot be applied"
                )));
            }
        };
        debug!(
            pos,
            value,
            kind = %classification.kind,
            delta = classification.delta,
            "applying rule"
        );
        if let Some(target) = target {
            ops.push(GraphOp::CopyAttributes {
                source: object,
                target,
            });
        }
    }

    ops.push(GraphOp::AddEdge {
        source: node.id,
        target: output,
        edge: EdgeType::Child,
    });

    Ok(Effect {
        node: node.id,
        score: (a.total - remaining) as f64 / a.total as f64,
        done: remaining == 0,
        update: Some(NodeUpdate::Advance),
        ops,
    })
}
