use crate::graph::EdgeType;

/// Probe budget given to every search node unless configured otherwise.
pub const DEFAULT_ENERGY_UNITS: u32 = 10;

/// Tick budget for a full session (matchers, generalize, apply).
pub const DEFAULT_STEP_BUDGET: usize = 100;

/// Text form of the empty (absent) token.
pub const ABSENT_TOKEN: &str = "_";

/// Attributes overwritten on an output node when a rule is applied.
pub const COPYABLE_ATTRIBUTES: [EdgeType; 1] = [EdgeType::ValueAttr];

/// Diagnostic tags for the chains a session installs.
pub const BEFORE_TAG: &str = "In";
pub const AFTER_TAG: &str = "Out";
pub const INPUT_TAG: &str = "Input";
