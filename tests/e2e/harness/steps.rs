use tangle_core::{Issue, ResolveVerb, StepAction};

use super::assertions::Assertion;

/// All possible actions in a test scenario
#[derive(Debug)]
pub enum ScenarioStep {
    // Working-copy setup
    SeedDir {
        gid: u128,
        path: String,
    },
    SeedFile {
        gid: u128,
        path: String,
        content: Vec<u8>,
    },
    StoreBlob {
        content: Vec<u8>,
    },
    /// A file on disk the pending tree does not track, relative to the top.
    WriteUntracked {
        path: String,
        content: Vec<u8>,
    },
    /// A tracked file with a pending content merge. Its inputs are staged
    /// in the parking directory.
    ContentConflict {
        gid: u128,
        path: String,
        merge_steps: usize,
    },
    RecordIssue {
        issue: Issue,
    },

    // Plans
    ApplyPlan {
        steps: Vec<(String, StepAction)>,
    },
    ApplyPlanFails {
        steps: Vec<(String, StepAction)>,
        failing_step: usize,
    },
    /// Write a plan file carrying issues, then apply it from disk.
    ApplyPlanFile {
        steps: Vec<(String, StepAction)>,
        issues: Vec<Issue>,
    },

    // Resolve
    MergeToolScript {
        body: String,
    },
    Resolve {
        verb: ResolveVerb,
        targets: Vec<String>,
    },
    ResolveFails {
        verb: ResolveVerb,
        targets: Vec<String>,
        error_contains: String,
    },
    /// Fix with a tool that resolves the issue from a second handle before
    /// writing its result.
    ResolveRacing {
        target: String,
    },

    // Process control
    Reopen,

    // Verification
    Assert {
        assertion: Assertion,
    },
}
