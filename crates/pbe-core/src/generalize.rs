//! Rule generalization.
//!
//! Folds every classification in the arena into at most one rule per
//! distinct input value. The queue is processed newest-first (stack order),
//! one classification per step. A classification that disagrees with the rule
//! already learned for its value halts generalization with a
//! [`RuleConflict`]; no winner is picked.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::arena::Arena;
use crate::error::{EngineError, Result};
use crate::graph::{EdgeType, NodeId};
use crate::node::{Classification, Node, NodeKind};
use crate::step::{Effect, GraphOp, NodeUpdate};

/// Two examples disagree on what happens to one value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RuleConflict {
    pub value: String,
    pub existing: Classification,
    pub incoming: Classification,
}

/// A learned rule as read back from the graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LearnedRule {
    pub value: String,
    pub output: Classification,
}

#[derive(Clone, Debug)]
pub struct GeneralizeNode {
    /// Classifications still to fold in; the last one is next.
    pub queue: Vec<NodeId>,
    pub total: usize,
    pub conflict: Option<RuleConflict>,
}

/// Install a generalizer seeded with every classification currently in the
/// arena.
pub fn install(arena: &mut Arena) -> NodeId {
    let queue: Vec<NodeId> = arena
        .nodes()
        .filter(|n| matches!(n.kind, NodeKind::Object(_)))
        .map(|n| n.id)
        .collect();
    info!(classifications = queue.len(), "installing generalizer");
    let total = queue.len();
    arena.insert(NodeKind::Generalize(GeneralizeNode {
        queue,
        total,
        conflict: None,
    }))
}

/// The rule of `owner` keyed by `value`, if one was learned.
pub fn find_rule(arena: &Arena, owner: NodeId, value: &str) -> Result<Option<NodeId>> {
    for rule in arena.graph().next_nodes(owner, Some(EdgeType::Rule))? {
        let input = arena
            .graph()
            .next_node_exactly_one(rule, Some(EdgeType::In))?
            .ok_or(EngineError::MissingNeighbor {
                node: rule,
                edge: EdgeType::In,
            })?;
        if arena.attribute(input, EdgeType::ValueAttr)? == value {
            return Ok(Some(rule));
        }
    }
    Ok(None)
}

/// The classification node a rule produces.
pub fn rule_output(arena: &Arena, rule: NodeId) -> Result<NodeId> {
    arena
        .graph()
        .next_node_exactly_one(rule, Some(EdgeType::Out))?
        .ok_or(EngineError::MissingNeighbor {
            node: rule,
            edge: EdgeType::Out,
        })
}

/// All rules learned by `owner`, in creation order.
pub fn rules(arena: &Arena, owner: NodeId) -> Result<Vec<LearnedRule>> {
    let mut out = Vec::new();
    for rule in arena.graph().next_nodes(owner, Some(EdgeType::Rule))? {
        let input = arena
            .graph()
            .next_node_exactly_one(rule, Some(EdgeType::In))?
            .ok_or(EngineError::MissingNeighbor {
                node: rule,
                edge: EdgeType::In,
            })?;
        let output = rule_output(arena, rule)?;
        out.push(LearnedRule {
            value: arena.attribute(input, EdgeType::ValueAttr)?.to_string(),
            output: arena.object(output)?.classification.clone(),
        });
    }
    Ok(out)
}

pub(crate) fn plan(arena: &Arena, node: &Node, g: &GeneralizeNode) -> Result<Effect> {
    if g.conflict.is_some() {
        return Effect::idle(arena, node.id);
    }
    let Some(&object_id) = g.queue.last() else {
        return Ok(Effect {
            node: node.id,
            score: 1.0,
            done: true,
            update: None,
            ops: Vec::new(),
        });
    };

    let object = arena.object(object_id)?;
    let input = object.input.ok_or_else(|| {
        EngineError::Unsupported(format!(
            "classification {object_id} ({}) has no originating value",
            object.classification.kind
        ))
    })?;
    let value = arena.attribute(input, EdgeType::ValueAttr)?;

    let remaining = g.queue.len() - 1;
    let score = (g.total - remaining) as f64 / g.total as f64;
    let mut ops = vec![GraphOp::AddEdge {
        source: node.id,
        target: object_id,
        edge: EdgeType::Child,
    }];

    match find_rule(arena, node.id, value)? {
        Some(rule) => {
            let existing = &arena.object(rule_output(arena, rule)?)?.classification;
            if !existing.same_output(&object.classification) {
                warn!(
                    value,
                    existing = %existing.kind,
                    incoming = %object.classification.kind,
                    "conflicting examples, generalization halted"
                );
                return Ok(Effect {
                    node: node.id,
                    score,
                    done: true,
                    update: Some(NodeUpdate::Conflict(RuleConflict {
                        value: value.to_string(),
                        existing: existing.clone(),
                        incoming: object.classification.clone(),
                    })),
                    ops,
                });
            }
            debug!(value, object = %object_id, "duplicate classification");
        }
        None => {
            debug!(value, kind = %object.classification.kind, "new rule");
            ops.push(GraphOp::AddRule {
                owner: node.id,
                input,
                output: object_id,
            });
        }
    }

    Ok(Effect {
        node: node.id,
        score,
        done: remaining == 0,
        update: Some(NodeUpdate::Advance),
        ops,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ClassKind;
    use crate::step;

    struct Fixture {
        arena: Arena,
        anchor: NodeId,
    }

    impl Fixture {
        fn new() -> Self {
            let mut arena = Arena::new();
            let anchor = arena.install_output_chain(1).unwrap()[0];
            Self { arena, anchor }
        }

        fn value(&mut self, value: &str) -> NodeId {
            self.arena.install_chain(&[value.to_string()], "In").unwrap()[0]
        }

        fn object(&mut self, input: Option<NodeId>, value: &str, kind: ClassKind, delta: i64) {
            let effect = Effect {
                node: self.anchor,
                score: 1.0,
                done: true,
                update: None,
                ops: vec![GraphOp::Classify {
                    matcher: self.anchor,
                    classification: Classification {
                        value: value.to_string(),
                        kind,
                        delta,
                    },
                    input,
                }],
            };
            step::commit(&mut self.arena, effect).unwrap();
        }

        fn run(&mut self) -> Result<NodeId> {
            let g = install(&mut self.arena);
            for _ in 0..100 {
                let effect = step::plan(&self.arena, g)?;
                step::commit(&mut self.arena, effect)?;
                if self.arena.node(g)?.done {
                    break;
                }
            }
            Ok(g)
        }

        fn conflict(&self, g: NodeId) -> Option<RuleConflict> {
            match &self.arena.node(g).unwrap().kind {
                NodeKind::Generalize(g) => g.conflict.clone(),
                _ => None,
            }
        }
    }

    #[test]
    fn test_duplicates_collapse() {
        let mut f = Fixture::new();
        let a0 = f.value("a");
        let a1 = f.value("a");
        f.object(Some(a0), "a", ClassKind::Move, -1);
        f.object(Some(a1), "a", ClassKind::Move, -1);
        let g = f.run().unwrap();
        let rules = rules(&f.arena, g).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].value, "a");
        assert_eq!(rules[0].output.delta, -1);
        assert!(f.conflict(g).is_none());
        assert_eq!(f.arena.node(g).unwrap().score, 1.0);
    }

    #[test]
    fn test_one_rule_per_value() {
        let mut f = Fixture::new();
        let a = f.value("a");
        let b = f.value("b");
        let empty = f.value("");
        f.object(Some(a), "a", ClassKind::Move, 2);
        f.object(Some(b), "b", ClassKind::Stay, 0);
        f.object(Some(empty), "", ClassKind::Stay, 0);
        let g = f.run().unwrap();
        let mut values: Vec<_> = rules(&f.arena, g)
            .unwrap()
            .into_iter()
            .map(|r| r.value)
            .collect();
        values.sort();
        assert_eq!(values, vec!["", "a", "b"]);
    }

    #[test]
    fn test_conflict_halts() {
        let mut f = Fixture::new();
        let a0 = f.value("a");
        let a1 = f.value("a");
        f.object(Some(a0), "a", ClassKind::Stay, 0);
        f.object(Some(a1), "a", ClassKind::Move, 1);
        let b = f.value("b");
        f.object(Some(b), "b", ClassKind::Stay, 0);
        let g = f.run().unwrap();

        let conflict = f.conflict(g).expect("conflict recorded");
        assert_eq!(conflict.value, "a");
        assert_eq!(conflict.existing.kind, ClassKind::Move);
        assert_eq!(conflict.incoming.kind, ClassKind::Stay);
        assert!(f.arena.node(g).unwrap().done);

        // Halted for good: further steps change nothing.
        let effect = step::plan(&f.arena, g).unwrap();
        assert!(effect.is_idle());
    }

    #[test]
    fn test_processed_newest_first() {
        let mut f = Fixture::new();
        let a = f.value("a");
        let b = f.value("b");
        f.object(Some(a), "a", ClassKind::Stay, 0);
        f.object(Some(b), "b", ClassKind::Stay, 0);
        let g = f.run().unwrap();
        let order: Vec<_> = rules(&f.arena, g)
            .unwrap()
            .into_iter()
            .map(|r| r.value)
            .collect();
        assert_eq!(order, vec!["b", "a"]);
    }

    #[test]
    fn test_missing_back_reference_is_unsupported() {
        let mut f = Fixture::new();
        f.object(None, "b", ClassKind::Appear, 0);
        let err = f.run().unwrap_err();
        assert!(matches!(err, EngineError::Unsupported(_)));
    }

    #[test]
    fn test_empty_queue_is_done() {
        let mut f = Fixture::new();
        let g = f.run().unwrap();
        assert!(f.arena.node(g).unwrap().done);
        assert!(rules(&f.arena, g).unwrap().is_empty());
    }
}
