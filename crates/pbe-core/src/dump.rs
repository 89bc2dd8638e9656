//! Diagnostics dump of the ownership tree.
//!
//! Only `child` edges are exported, and only nodes touching one of them, which
//! is what a visualizer needs to draw matchers, searches and phase drivers.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::arena::Arena;
use crate::graph::{EdgeType, NodeId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DumpNode {
    pub id: NodeId,
    pub label: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumpEdge {
    pub from: NodeId,
    pub to: NodeId,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDump {
    pub nodes: Vec<DumpNode>,
    pub edges: Vec<DumpEdge>,
}

impl GraphDump {
    pub fn from_arena(arena: &Arena) -> Self {
        let mut seen = BTreeSet::new();
        let edges: Vec<DumpEdge> = arena
            .graph()
            .edges()
            .filter(|&(_, _, e)| e == EdgeType::Child)
            .map(|(from, to, _)| {
                seen.insert(from);
                seen.insert(to);
                DumpEdge { from, to }
            })
            .collect();
        let nodes = arena
            .nodes()
            .filter(|n| seen.contains(&n.id))
            .map(|n| DumpNode {
                id: n.id,
                label: n.label(),
            })
            .collect();
        Self { nodes, edges }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
