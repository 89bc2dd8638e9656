//! Positional programming-by-example engine.
//!
//! Learns how values move between a before and an after sequence, then
//! replays those moves on a new input. Everything lives in one typed graph:
//! value chains, bounded searches, matchers that classify each position,
//! a generalizer that folds classifications into rules, and an applier that
//! writes the rules onto an output chain. A [`Session`] steps all of it in
//! lock-step ticks until a fixpoint.
//!
//! Zero I/O. Parsing text and loading configuration files is left to callers.

pub mod apply;
pub mod arena;
pub mod config;
pub mod constants;
pub mod dump;
pub mod error;
pub mod generalize;
pub mod graph;
pub mod matcher;
pub mod node;
pub mod search;
pub mod sequence;
pub mod session;
pub mod step;

pub use arena::Arena;
pub use config::EngineConfig;
pub use constants::{ABSENT_TOKEN, DEFAULT_ENERGY_UNITS, DEFAULT_STEP_BUDGET};
pub use dump::{DumpEdge, DumpNode, GraphDump};
pub use error::{EngineError, ErrorKind, Result};
pub use generalize::{LearnedRule, RuleConflict};
pub use graph::{DiGraph, EdgeType, NodeId};
pub use node::{ClassKind, Classification, Node, NodeKind};
pub use search::{Direction, SearchCursor};
pub use sequence::{parse_sequence, render_sequence};
pub use session::{OutputValue, RunOutcome, Session};
