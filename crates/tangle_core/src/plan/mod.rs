//! Change plans: ordered working-copy mutations.
//!
//! A [`ChangePlan`] is produced by a merge and consumed once. Its steps are
//! kept in the order they were appended, and that order is load-bearing: a
//! directory is created before anything is placed in it, and an entry is
//! moved out of the way before another one takes its name. Nothing here
//! ever sorts or reorders steps.

pub mod executor;
pub mod format;
pub mod merge_output;
pub mod stats;
pub mod step;

pub use executor::{ExecuteReport, PlanExecutor};
pub use format::{format_plan, format_stats, FormatOptions};
pub use merge_output::MergeOutput;
pub use stats::PlanStats;
pub use step::{Alteration, Change, ChangeStep, EntryRef, NewEntry, StepAction};

use crate::error::Result;
use crate::pending_tree::PendingTree;
use serde::{Deserialize, Serialize};

/// An append-only list of change steps with running statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PlanRepr", into = "PlanRepr")]
pub struct ChangePlan {
    steps: Vec<ChangeStep>,
    stats: PlanStats,
}

/// Plan files carry only the steps; stats are recomputed while appending.
#[derive(Serialize, Deserialize)]
struct PlanRepr {
    steps: Vec<ChangeStep>,
}

impl TryFrom<PlanRepr> for ChangePlan {
    type Error = crate::error::TangleError;

    fn try_from(repr: PlanRepr) -> Result<Self> {
        let mut plan = ChangePlan::new();
        for step in repr.steps {
            plan.append(step)?;
        }
        Ok(plan)
    }
}

impl From<ChangePlan> for PlanRepr {
    fn from(plan: ChangePlan) -> Self {
        PlanRepr { steps: plan.steps }
    }
}

impl ChangePlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a step and appends it.
    pub fn append(&mut self, step: ChangeStep) -> Result<()> {
        step.validate()?;
        self.stats.record(&step.action);
        self.steps.push(step);
        Ok(())
    }

    /// Shorthand for appending `ChangeStep::new(reason, action)`.
    pub fn push(&mut self, reason: impl Into<String>, action: StepAction) -> Result<()> {
        self.append(ChangeStep::new(reason, action))
    }

    /// Steps in execution order.
    pub fn steps(&self) -> &[ChangeStep] {
        &self.steps
    }

    pub fn stats(&self) -> PlanStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Applies every step to the working copy, then saves the pending tree.
    ///
    /// See [`PlanExecutor`] for failure behavior.
    pub fn execute(&self, tree: &mut PendingTree) -> Result<ExecuteReport> {
        PlanExecutor::new(tree).execute(self)
    }

    /// Renders the plan as preview text.
    pub fn format(&self, options: FormatOptions) -> String {
        format_plan(self, options)
    }
}
