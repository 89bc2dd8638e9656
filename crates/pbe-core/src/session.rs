//! One inference session: the scheduler over a single arena.
//!
//! A session learns from one before/after example and applies what it
//! learned to one new input. Work happens in three phases, each installed only
//! once the graph has reached a fixpoint:
//!
//! 1. matchers classify every example position,
//! 2. the generalizer folds classifications into rules,
//! 3. the applier writes the rules' effect onto a fresh output chain.

use serde::Serialize;
use tracing::{debug, info};

use crate::apply;
use crate::arena::Arena;
use crate::config::EngineConfig;
use crate::constants::{AFTER_TAG, BEFORE_TAG, INPUT_TAG};
use crate::dump::GraphDump;
use crate::error::{EngineError, Result};
use crate::generalize::{self, LearnedRule, RuleConflict};
use crate::graph::{EdgeType, NodeId};
use crate::matcher;
use crate::node::{Classification, NodeKind};
use crate::step;

/// How a run ended.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RunOutcome {
    /// Every requested phase reached a fixpoint within the budget.
    Converged { steps: usize },
    /// The generalizer stopped on disagreeing examples. Rules were not applied.
    Conflicted {
        steps: usize,
        conflict: RuleConflict,
    },
    /// The step budget ran out first. The partial graph is left as it was.
    Incomplete,
}

impl RunOutcome {
    pub fn steps(&self) -> Option<usize> {
        match self {
            Self::Converged { steps } | Self::Conflicted { steps, .. } => Some(*steps),
            Self::Incomplete => None,
        }
    }
}

/// Read-back of one output position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OutputValue {
    pub pos: usize,
    pub value: String,
}

#[derive(Debug)]
pub struct Session {
    arena: Arena,
    config: EngineConfig,
    before: Vec<String>,
    after: Vec<String>,
    input: Vec<String>,
    matchers: Option<Vec<NodeId>>,
    generalizer: Option<NodeId>,
    applier: Option<NodeId>,
    ticks: usize,
}

impl Session {
    pub fn new(before: Vec<String>, after: Vec<String>, input: Vec<String>) -> Result<Self> {
        Self::with_config(before, after, input, EngineConfig::default())
    }

    pub fn with_config(
        before: Vec<String>,
        after: Vec<String>,
        input: Vec<String>,
        config: EngineConfig,
    ) -> Result<Self> {
        if before.len() != after.len() {
            return Err(EngineError::LengthMismatch {
                before: before.len(),
                after: after.len(),
            });
        }
        Ok(Self {
            arena: Arena::new(),
            config,
            before,
            after,
            input,
            matchers: None,
            generalizer: None,
            applier: None,
            ticks: 0,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Ticks executed so far across all runs.
    pub fn ticks(&self) -> usize {
        self.ticks
    }

    // -----------------------------------------------------------------------
    // Phase installation
    // -----------------------------------------------------------------------

    /// Install both example chains and one matcher per position.
    pub fn install_matchers(&mut self) -> Result<()> {
        if self.matchers.is_some() {
            return Ok(());
        }
        let before = self.arena.install_chain(&self.before, BEFORE_TAG)?;
        let after = self.arena.install_chain(&self.after, AFTER_TAG)?;
        let mut matchers = Vec::with_capacity(before.len());
        for (&b, &a) in before.iter().zip(&after) {
            matchers.push(matcher::install(
                &mut self.arena,
                b,
                a,
                self.config.energy_units,
            )?);
        }
        info!(positions = matchers.len(), "installed matchers");
        self.matchers = Some(matchers);
        Ok(())
    }

    pub fn install_generalize(&mut self) -> Result<()> {
        if self.generalizer.is_some() {
            return Ok(());
        }
        self.generalizer = Some(generalize::install(&mut self.arena));
        Ok(())
    }

    /// Install the new input chain, its empty output chain and the applier.
    pub fn install_apply_rules(&mut self) -> Result<()> {
        if self.applier.is_some() {
            return Ok(());
        }
        let generalizer = self.generalizer.ok_or_else(|| {
            EngineError::Unsupported("rules cannot be applied before generalization".to_string())
        })?;
        let inputs = self.arena.install_chain(&self.input, INPUT_TAG)?;
        let outputs = self.arena.install_output_chain(self.input.len())?;
        self.applier = Some(apply::install(&mut self.arena, generalizer, inputs, outputs));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Stepping
    // -----------------------------------------------------------------------

    /// Step every node once. Returns whether every node is done afterwards.
    ///
    /// All nodes are evaluated against the same state before any effect is
    /// committed; see [`step::tick`].
    pub fn do_step(&mut self) -> Result<bool> {
        let done = step::tick(&mut self.arena)?;
        self.ticks += 1;
        Ok(done)
    }

    /// Tick until every requested phase has converged, or `limit` ticks pass.
    ///
    /// Matchers are installed first if needed. On each fixpoint the next
    /// pending phase is installed and stepping continues.
    pub fn run_until_done(
        &mut self,
        limit: usize,
        generalize: bool,
        apply_rules: bool,
    ) -> Result<RunOutcome> {
        self.install_matchers()?;
        for i in 0..limit {
            if !self.do_step()? {
                continue;
            }
            let steps = i + 1;
            if generalize && self.generalizer.is_none() {
                debug!(steps, "matchers converged");
                self.install_generalize()?;
            } else if let Some(conflict) = self.conflict()?.cloned() {
                return Ok(RunOutcome::Conflicted { steps, conflict });
            } else if apply_rules && self.applier.is_none() {
                debug!(steps, "generalization converged");
                self.install_apply_rules()?;
            } else {
                info!(steps, "session converged");
                return Ok(RunOutcome::Converged { steps });
            }
        }
        Ok(RunOutcome::Incomplete)
    }

    /// [`run_until_done`](Self::run_until_done) driven by the session config.
    pub fn run(&mut self) -> Result<RunOutcome> {
        let EngineConfig {
            step_budget,
            generalize,
            apply_rules,
            ..
        } = self.config;
        self.run_until_done(step_budget, generalize, apply_rules)
    }

    // -----------------------------------------------------------------------
    // Read-back
    // -----------------------------------------------------------------------

    /// Output positions in node order. Callers sort by `pos` if they need to.
    pub fn outputs(&self) -> Result<Vec<OutputValue>> {
        let mut out = Vec::new();
        for node in self.arena.nodes() {
            if let NodeKind::Output(o) = &node.kind {
                out.push(OutputValue {
                    pos: o.pos,
                    value: self.arena.attribute(node.id, EdgeType::ValueAttr)?.to_string(),
                });
            }
        }
        Ok(out)
    }

    /// Output values ordered by position.
    pub fn output_sequence(&self) -> Result<Vec<String>> {
        let mut outputs = self.outputs()?;
        outputs.sort_by_key(|o| o.pos);
        Ok(outputs.into_iter().map(|o| o.value).collect())
    }

    /// Current classification of each matcher, in position order. Positions
    /// that are not classified yet are skipped.
    pub fn classifications(&self) -> Result<Vec<Classification>> {
        let Some(matchers) = &self.matchers else {
            return Ok(Vec::new());
        };
        let mut out = Vec::with_capacity(matchers.len());
        for &m in matchers {
            if let Some(parent) = self
                .arena
                .graph()
                .previous_node_exactly_one(m, Some(EdgeType::Child))?
            {
                out.push(self.arena.object(parent)?.classification.clone());
            }
        }
        Ok(out)
    }

    /// Rules learned so far, in the order they were created.
    pub fn rules(&self) -> Result<Vec<LearnedRule>> {
        match self.generalizer {
            Some(g) => generalize::rules(&self.arena, g),
            None => Ok(Vec::new()),
        }
    }

    /// The conflict that halted generalization, if any.
    pub fn conflict(&self) -> Result<Option<&RuleConflict>> {
        let Some(id) = self.generalizer else {
            return Ok(None);
        };
        match &self.arena.node(id)?.kind {
            NodeKind::Generalize(g) => Ok(g.conflict.as_ref()),
            other => Err(EngineError::WrongKind {
                node: id,
                expected: "generalize node",
                found: other.name(),
            }),
        }
    }

    pub fn dump(&self) -> GraphDump {
        GraphDump::from_arena(&self.arena)
    }
}
