use std::fmt;

use serde::{Deserialize, Serialize};

use crate::apply::ApplyRulesNode;
use crate::generalize::GeneralizeNode;
use crate::graph::NodeId;
use crate::matcher::MatcherNode;
use crate::search::SearchNode;

/// How a token value relates between the before and after sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassKind {
    Stay,
    Move,
    Gone,
    Appear,
}

impl ClassKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stay => "stay",
            Self::Move => "move",
            Self::Gone => "gone",
            Self::Appear => "appear",
        }
    }
}

impl fmt::Display for ClassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The recorded outcome of matching one position.
///
/// `delta` is before-position minus after-position; zero unless `kind` is
/// [`ClassKind::Move`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub value: String,
    pub kind: ClassKind,
    pub delta: i64,
}

impl Classification {
    /// Whether two classifications produce the same output (type and delta).
    pub fn same_output(&self, other: &Classification) -> bool {
        self.kind == other.kind && self.delta == other.delta
    }
}

/// One position of an installed sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValueNode {
    pub value: String,
    pub pos: usize,
    /// Diagnostic tag, e.g. `In.0`.
    pub tag: String,
}

/// Interned literal. Attribute edges point at these.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConstantNode {
    pub literal: String,
}

/// Classification record hung above a matcher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectNode {
    pub classification: Classification,
    /// Before-side value node the classification was derived from.
    pub input: Option<NodeId>,
}

/// Learned mapping from one input value to a classification. Its endpoints
/// live in the graph (`in` and `out` edges).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleNode;

/// Per-position output holder. The value lives on its `value` attribute edge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputNode {
    pub pos: usize,
}

#[derive(Clone, Debug)]
pub enum NodeKind {
    Value(ValueNode),
    Constant(ConstantNode),
    Search(SearchNode),
    Matcher(MatcherNode),
    Object(ObjectNode),
    Rule(RuleNode),
    Output(OutputNode),
    Generalize(GeneralizeNode),
    ApplyRules(ApplyRulesNode),
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Value(_) => "value node",
            Self::Constant(_) => "constant node",
            Self::Search(_) => "search node",
            Self::Matcher(_) => "matcher node",
            Self::Object(_) => "object node",
            Self::Rule(_) => "rule node",
            Self::Output(_) => "output node",
            Self::Generalize(_) => "generalize node",
            Self::ApplyRules(_) => "apply-rules node",
        }
    }

    /// Kinds that are complete from construction and never change.
    pub fn is_fixed(&self) -> bool {
        matches!(
            self,
            Self::Value(_) | Self::Constant(_) | Self::Object(_) | Self::Rule(_) | Self::Output(_)
        )
    }
}

/// A node in the session arena.
#[derive(Clone, Debug)]
pub struct Node {
    pub id: NodeId,
    pub score: f64,
    pub done: bool,
    pub kind: NodeKind,
}

impl Node {
    pub(crate) fn new(id: NodeId, kind: NodeKind) -> Self {
        let fixed = kind.is_fixed();
        Self {
            id,
            score: if fixed { 1.0 } else { 0.0 },
            done: fixed,
            kind,
        }
    }

    pub fn label(&self) -> String {
        match &self.kind {
            NodeKind::Value(v) => format!("ValueNode({})\n{}", v.value, v.tag),
            NodeKind::Constant(c) => format!("ConstantNode({})", c.literal),
            NodeKind::Search(s) => format!("SearchNode({})\nscore {}", s.target, self.score),
            NodeKind::Matcher(_) => format!("MatcherNode\nscore {}", self.score),
            NodeKind::Object(o) => format!(
                "ObjectNode {}{} - id: {}",
                o.classification.kind, o.classification.delta, self.id
            ),
            NodeKind::Rule(_) => "RuleNode".to_string(),
            NodeKind::Output(o) => format!("OutputNode\npos={}", o.pos),
            NodeKind::Generalize(_) => format!("GeneralizeNode - score {}", self.score),
            NodeKind::ApplyRules(_) => format!("ApplyRulesNode - score {}", self.score),
        }
    }
}
