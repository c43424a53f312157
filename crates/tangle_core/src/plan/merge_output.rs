//! What a merge hands to the working copy: a change plan and the issues it
//! could not settle.

use super::executor::{ExecuteProgressCallback, ExecuteReport, PlanExecutor};
use super::ChangePlan;
use crate::error::Result;
use crate::issue::Issue;
use crate::pending_tree::PendingTree;
use serde::{Deserialize, Serialize};
use tracing::info;

/// A change plan together with the conflict issues of the same merge.
///
/// On disk this is a plan file with an optional `issues` array next to
/// `steps`, so a bare plan file reads as output with no issues.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOutput {
    #[serde(flatten)]
    pub plan: ChangePlan,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<Issue>,
}

impl MergeOutput {
    pub fn new(plan: ChangePlan, issues: Vec<Issue>) -> Self {
        Self { plan, issues }
    }

    /// Executes the plan, then records the issues and saves.
    ///
    /// Issues are recorded only when every step applied. An interrupted
    /// plan leaves the issue set as it was.
    pub fn apply(
        &self,
        tree: &mut PendingTree,
        progress: Option<&ExecuteProgressCallback<'_>>,
    ) -> Result<ExecuteReport> {
        let report = PlanExecutor::new(tree).execute_with_progress(&self.plan, progress)?;

        if !self.issues.is_empty() {
            for issue in &self.issues {
                tree.record_issue(issue.clone());
            }
            tree.save()?;
            info!(issues = self.issues.len(), "recorded merge issues");
        }
        Ok(report)
    }

    /// Issues not yet resolved.
    pub fn unresolved(&self) -> usize {
        self.issues.iter().filter(|issue| !issue.is_resolved()).count()
    }
}
