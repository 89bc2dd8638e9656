use thiserror::Error;

use crate::graph::{EdgeType, NodeId};

/// Coarse grouping of fatal engine errors.
///
/// Exhaustion and conflicts are not errors: a failed search is a done node
/// with score 0 and a conflict is recorded on the generalizer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A multiplicity or presence assumption about the graph was broken.
    StructuralViolation,
    /// Input the engine does not cover.
    UnhandledCase,
    /// A rule or chain position could not be found while applying rules.
    LookupFailure,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("node {0} is not in the graph")]
    NodeNotFound(NodeId),

    #[error("edge {from} -> {to} is not in the graph")]
    EdgeNotFound { from: NodeId, to: NodeId },

    #[error("expected at most one {edge:?} neighbour of {node}, found {found}")]
    MultiplicityViolation {
        node: NodeId,
        edge: Option<EdgeType>,
        found: usize,
    },

    #[error("node {node} has no {edge} neighbour")]
    MissingNeighbor { node: NodeId, edge: EdgeType },

    #[error("node {node} is a {found}, expected a {expected}")]
    WrongKind {
        node: NodeId,
        expected: &'static str,
        found: &'static str,
    },

    #[error("attribute {edge} of node {node} is not an integer: {literal:?}")]
    MalformedAttribute {
        node: NodeId,
        edge: EdgeType,
        literal: String,
    },

    #[error("unsupported input: {0}")]
    Unsupported(String),

    #[error("before and after sequences differ in length ({before} vs {after})")]
    LengthMismatch { before: usize, after: usize },

    #[error("no rule found for value {0:?}")]
    NoRuleFound(String),

    #[error("output chain ended after {walked} of {needed} steps from position {pos}")]
    ChainExhausted {
        pos: usize,
        walked: u64,
        needed: u64,
    },
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NodeNotFound(_)
            | Self::EdgeNotFound { .. }
            | Self::MultiplicityViolation { .. }
            | Self::MissingNeighbor { .. }
            | Self::WrongKind { .. }
            | Self::MalformedAttribute { .. } => ErrorKind::StructuralViolation,
            Self::Unsupported(_) | Self::LengthMismatch { .. } => ErrorKind::UnhandledCase,
            Self::NoRuleFound(_) | Self::ChainExhausted { .. } => ErrorKind::LookupFailure,
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            EngineError::NodeNotFound(NodeId(3)).kind(),
            ErrorKind::StructuralViolation
        );
        assert_eq!(
            EngineError::Unsupported("x".into()).kind(),
            ErrorKind::UnhandledCase
        );
        assert_eq!(
            EngineError::NoRuleFound("a".into()).kind(),
            ErrorKind::LookupFailure
        );
        assert_eq!(
            EngineError::ChainExhausted {
                pos: 0,
                walked: 0,
                needed: 1
            }
            .kind(),
            ErrorKind::LookupFailure
        );
    }

    #[test]
    fn test_display() {
        let err = EngineError::MissingNeighbor {
            node: NodeId(7),
            edge: EdgeType::Child,
        };
        assert_eq!(err.to_string(), "node #7 has no child neighbour");
    }
}
