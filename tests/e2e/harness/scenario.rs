use super::assertions::{Assertion, OutcomeMatch};
use super::runner::ScenarioRunner;
use super::steps::ScenarioStep;
use tangle_core::{Issue, ResolveVerb, StepAction};

/// Fluent DSL for building test scenarios
pub struct Scenario {
    name: String,
    steps: Vec<ScenarioStep>,
}

impl Scenario {
    /// Create a new scenario over a freshly initialized working copy
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            steps: Vec::new(),
        }
    }

    // ===== Working-copy setup =====

    /// Track an existing directory
    pub fn with_dir(mut self, gid: u128, path: &str) -> Self {
        self.steps.push(ScenarioStep::SeedDir {
            gid,
            path: path.to_string(),
        });
        self
    }

    /// Track an existing file with the given content
    pub fn with_file(mut self, gid: u128, path: &str, content: &[u8]) -> Self {
        self.steps.push(ScenarioStep::SeedFile {
            gid,
            path: path.to_string(),
            content: content.to_vec(),
        });
        self
    }

    /// Make content available in the blob store
    pub fn with_blob(mut self, content: &[u8]) -> Self {
        self.steps.push(ScenarioStep::StoreBlob {
            content: content.to_vec(),
        });
        self
    }

    /// Write a file the working copy does not track
    pub fn with_untracked(mut self, path: &str, content: &[u8]) -> Self {
        self.steps.push(ScenarioStep::WriteUntracked {
            path: path.to_string(),
            content: content.to_vec(),
        });
        self
    }

    /// Track a file in content conflict with staged merge inputs
    pub fn with_content_conflict(mut self, gid: u128, path: &str) -> Self {
        self.steps.push(ScenarioStep::ContentConflict {
            gid,
            path: path.to_string(),
            merge_steps: 1,
        });
        self
    }

    /// Like [`with_content_conflict`](Self::with_content_conflict) with a
    /// multi-step content merge plan
    pub fn with_multi_step_conflict(mut self, gid: u128, path: &str, steps: usize) -> Self {
        self.steps.push(ScenarioStep::ContentConflict {
            gid,
            path: path.to_string(),
            merge_steps: steps,
        });
        self
    }

    /// Record an arbitrary issue
    pub fn with_issue(mut self, issue: Issue) -> Self {
        self.steps.push(ScenarioStep::RecordIssue { issue });
        self
    }

    // ===== Plans =====

    /// Apply a plan that must succeed
    pub fn apply(mut self, steps: Vec<(&str, StepAction)>) -> Self {
        self.steps.push(ScenarioStep::ApplyPlan {
            steps: owned(steps),
        });
        self
    }

    /// Apply a plan that must stop at `failing_step`
    pub fn apply_fails_at(mut self, failing_step: usize, steps: Vec<(&str, StepAction)>) -> Self {
        self.steps.push(ScenarioStep::ApplyPlanFails {
            steps: owned(steps),
            failing_step,
        });
        self
    }

    /// Apply a plan file that also lists the merge's issues
    pub fn apply_file(mut self, steps: Vec<(&str, StepAction)>, issues: Vec<Issue>) -> Self {
        self.steps.push(ScenarioStep::ApplyPlanFile {
            steps: owned(steps),
            issues,
        });
        self
    }

    // ===== Resolve =====

    /// Configure a shell script as the merge tool.
    ///
    /// The script sees the merge tool's arguments; `$2` is the result path.
    pub fn merge_tool(mut self, body: &str) -> Self {
        self.steps.push(ScenarioStep::MergeToolScript {
            body: body.to_string(),
        });
        self
    }

    pub fn resolve(mut self, verb: ResolveVerb, targets: &[&str]) -> Self {
        self.steps.push(ScenarioStep::Resolve {
            verb,
            targets: targets.iter().map(|t| t.to_string()).collect(),
        });
        self
    }

    pub fn resolve_fails(
        mut self,
        verb: ResolveVerb,
        targets: &[&str],
        error_contains: &str,
    ) -> Self {
        self.steps.push(ScenarioStep::ResolveFails {
            verb,
            targets: targets.iter().map(|t| t.to_string()).collect(),
            error_contains: error_contains.to_string(),
        });
        self
    }

    /// Fix `target` while another handle resolves it during the merge
    pub fn resolve_racing(mut self, target: &str) -> Self {
        self.steps.push(ScenarioStep::ResolveRacing {
            target: target.to_string(),
        });
        self
    }

    // ===== Process control =====

    /// Drop the open tree and open it again from disk
    pub fn reopen(mut self) -> Self {
        self.steps.push(ScenarioStep::Reopen);
        self
    }

    // ===== Assertions =====

    /// Add a custom assertion
    pub fn assert(mut self, assertion: Assertion) -> Self {
        self.steps.push(ScenarioStep::Assert { assertion });
        self
    }

    pub fn assert_file(self, path: &str, content: &[u8]) -> Self {
        self.assert(Assertion::FileContent {
            path: path.to_string(),
            content: content.to_vec(),
        })
    }

    pub fn assert_file_missing(self, path: &str) -> Self {
        self.assert(Assertion::FileMissing {
            path: path.to_string(),
        })
    }

    pub fn assert_entry(self, path: &str, gid: u128) -> Self {
        self.assert(Assertion::EntryAt {
            path: path.to_string(),
            gid,
        })
    }

    pub fn assert_no_entry(self, path: &str) -> Self {
        self.assert(Assertion::NoEntryAt {
            path: path.to_string(),
        })
    }

    pub fn assert_resolved(self, path: &str) -> Self {
        self.assert(Assertion::IssueResolved {
            path: path.to_string(),
        })
    }

    pub fn assert_unresolved(self, path: &str) -> Self {
        self.assert(Assertion::IssueUnresolved {
            path: path.to_string(),
        })
    }

    pub fn assert_unresolved_count(self, count: usize) -> Self {
        self.assert(Assertion::UnresolvedCount(count))
    }

    pub fn assert_outcomes(self, outcomes: &[(&str, OutcomeMatch)]) -> Self {
        self.assert(Assertion::Outcomes(
            outcomes
                .iter()
                .map(|(path, outcome)| (path.to_string(), *outcome))
                .collect(),
        ))
    }

    pub fn assert_abandoned(self, paths: &[&str]) -> Self {
        self.assert(Assertion::Abandoned(strings(paths)))
    }

    pub fn assert_listed(self, paths: &[&str]) -> Self {
        self.assert(Assertion::Listed(strings(paths)))
    }

    pub fn assert_marked(self, paths: &[&str]) -> Self {
        self.assert(Assertion::Marked(strings(paths)))
    }

    // ===== Execution =====

    /// Execute the scenario and return results
    pub fn run(self) -> ScenarioResult {
        let mut runner = match ScenarioRunner::new() {
            Ok(r) => r,
            Err(e) => {
                return ScenarioResult {
                    name: self.name.clone(),
                    success: false,
                    steps_executed: 0,
                    failure_step: Some(0),
                    error: Some(format!("Failed to create runner: {}", e)),
                }
            }
        };

        match runner.execute(&self.steps) {
            Ok(()) => ScenarioResult {
                name: self.name,
                success: true,
                steps_executed: self.steps.len(),
                failure_step: None,
                error: None,
            },
            Err(e) => {
                let failure_step = runner.current_step();
                ScenarioResult {
                    name: self.name,
                    success: false,
                    steps_executed: failure_step,
                    failure_step: Some(failure_step),
                    error: Some(format!("{:?}", e)),
                }
            }
        }
    }
}

fn owned(steps: Vec<(&str, StepAction)>) -> Vec<(String, StepAction)> {
    steps
        .into_iter()
        .map(|(reason, action)| (reason.to_string(), action))
        .collect()
}

fn strings(paths: &[&str]) -> Vec<String> {
    paths.iter().map(|p| p.to_string()).collect()
}

/// Result of running a scenario
#[derive(Debug)]
pub struct ScenarioResult {
    pub name: String,
    pub success: bool,
    pub steps_executed: usize,
    pub failure_step: Option<usize>,
    pub error: Option<String>,
}

impl ScenarioResult {
    /// Unwrap the result, panicking if it failed
    pub fn unwrap(self) {
        if !self.success {
            panic!(
                "Scenario '{}' failed at step {}: {}",
                self.name,
                self.failure_step.unwrap_or(0),
                self.error.unwrap_or_else(|| "unknown error".to_string())
            );
        }
    }

    /// Expect the result to be successful
    pub fn expect(self, msg: &str) {
        if !self.success {
            panic!(
                "{}: Scenario '{}' failed at step {}: {}",
                msg,
                self.name,
                self.failure_step.unwrap_or(0),
                self.error.unwrap_or_else(|| "unknown error".to_string())
            );
        }
    }
}
