use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_ENERGY_UNITS, DEFAULT_STEP_BUDGET};

/// Engine tunables. Every field has a default, so partial TOML/JSON documents
/// deserialize.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Probe budget of each search node.
    pub energy_units: u32,
    /// Maximum ticks for one `run`.
    pub step_budget: usize,
    /// Install the generalizer once matching converges.
    pub generalize: bool,
    /// Install the rule applier once generalization converges.
    pub apply_rules: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            energy_units: DEFAULT_ENERGY_UNITS,
            step_budget: DEFAULT_STEP_BUDGET,
            generalize: true,
            apply_rules: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_document_uses_defaults() {
        let cfg: EngineConfig = serde_json::from_str(r#"{"energy_units": 4}"#).unwrap();
        assert_eq!(cfg.energy_units, 4);
        assert_eq!(cfg.step_budget, DEFAULT_STEP_BUDGET);
        assert!(cfg.generalize);
        assert!(cfg.apply_rules);
    }
}
