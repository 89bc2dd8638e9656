//! Per-position match classification.
//!
//! A matcher owns two searches for the same target value: one anchored in the
//! before chain, one in the after chain. Once either side has matched it
//! hangs an [`ObjectNode`](crate::node::ObjectNode) above itself describing
//! what happened to the value, replacing the previous one whenever the
//! classification type changes.

use tracing::debug;

use crate::arena::Arena;
use crate::error::{EngineError, Result};
use crate::graph::{EdgeType, NodeId};
use crate::node::{ClassKind, Classification, Node, NodeKind};
use crate::search;
use crate::step::{Effect, GraphOp};

#[derive(Clone, Debug)]
pub struct MatcherNode {
    pub before: NodeId,
    pub after: NodeId,
    /// Search anchored at `before`.
    pub left: NodeId,
    /// Search anchored at `after`.
    pub right: NodeId,
}

/// A search that found its target: where it landed.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Hit {
    node: NodeId,
    value: String,
    pos: i64,
}

/// Install a matcher for one position pair along with both of its searches.
/// The target is the before value, or the after value when before is empty.
pub fn install(arena: &mut Arena, before: NodeId, after: NodeId, energy_units: u32) -> Result<NodeId> {
    let before_value = arena.attribute(before, EdgeType::ValueAttr)?;
    let target = if before_value.is_empty() {
        arena.attribute(after, EdgeType::ValueAttr)?.to_string()
    } else {
        before_value.to_string()
    };

    let left = search::install(arena, &target, before, energy_units);
    let right = search::install(arena, &target, after, energy_units);
    let id = arena.insert(NodeKind::Matcher(MatcherNode {
        before,
        after,
        left,
        right,
    }));
    let graph = arena.graph_mut();
    graph.add_edge(id, left, EdgeType::Child);
    graph.add_edge(id, right, EdgeType::Child);
    Ok(id)
}

/// Classify a pair of search outcomes. `None` when neither side matched.
pub fn classify(left: Option<(&str, i64)>, right: Option<(&str, i64)>) -> Option<Classification> {
    let (value, kind, delta) = match (left, right) {
        (Some((value, l)), Some((_, r))) if l == r => (value, ClassKind::Stay, 0),
        (Some((value, l)), Some((_, r))) => (value, ClassKind::Move, l - r),
        (Some((value, _)), None) => (value, ClassKind::Gone, 0),
        (None, Some((value, _))) => (value, ClassKind::Appear, 0),
        (None, None) => return None,
    };
    Some(Classification {
        value: value.to_string(),
        kind,
        delta,
    })
}

fn hit(arena: &Arena, search: &Node) -> Result<Option<Hit>> {
    if search.score < 1.0 {
        return Ok(None);
    }
    let node = arena.only_child(search.id)?;
    Ok(Some(Hit {
        node,
        value: arena.attribute(node, EdgeType::ValueAttr)?.to_string(),
        pos: arena.int_attribute(node, EdgeType::PosAttr)?,
    }))
}

pub(crate) fn plan(arena: &Arena, node: &Node, matcher: &MatcherNode) -> Result<Effect> {
    let left = arena.node(matcher.left)?;
    let right = arena.node(matcher.right)?;
    let score = (left.score + right.score) / 2.0;
    let done = left.done && right.done;

    let mut effect = Effect {
        node: node.id,
        score,
        done,
        update: None,
        ops: Vec::new(),
    };
    if score <= 0.0 {
        return Ok(effect);
    }

    let left_hit = hit(arena, left)?;
    let right_hit = hit(arena, right)?;
    let classification = classify(
        left_hit.as_ref().map(|h| (h.value.as_str(), h.pos)),
        right_hit.as_ref().map(|h| (h.value.as_str(), h.pos)),
    )
    .ok_or_else(|| {
        EngineError::Unsupported(format!(
            "matcher {} scored {score} without a matched side",
            node.id
        ))
    })?;

    let parent = arena
        .graph()
        .previous_node_exactly_one(node.id, Some(EdgeType::Child))?;
    if let Some(parent) = parent {
        let current = &arena.object(parent)?.classification;
        if current.kind == classification.kind {
            return Ok(effect);
        }
        debug!(
            matcher = %node.id,
            from = %current.kind,
            to = %classification.kind,
            "replacing classification"
        );
        effect.ops.push(GraphOp::RemoveNode(parent));
    } else {
        debug!(
            matcher = %node.id,
            kind = %classification.kind,
            delta = classification.delta,
            value = %classification.value,
            "classified"
        );
    }

    effect.ops.push(GraphOp::Classify {
        matcher: node.id,
        classification,
        input: left_hit.map(|h| h.node),
    });
    Ok(effect)
}
