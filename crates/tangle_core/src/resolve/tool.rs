//! External merge tools.

use crate::config::Config;
use crate::error::{Result, TangleError};
use crate::repo_path::RepoPath;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;
use tracing::info;

/// Inputs and output of one content merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeInvocation {
    /// Where the merged content must be written.
    pub result: PathBuf,
    pub mine: PathBuf,
    pub ancestor: PathBuf,
    pub other: PathBuf,
    /// Current path of the conflicting entry, used as a label.
    pub repo_path: RepoPath,
}

/// How a merge tool finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeExit {
    /// The user saved a result.
    Merged,
    /// The user gave up.
    Cancelled,
}

/// Something that merges three files into a result.
///
/// Called with the working-copy lock released; implementations may take as
/// long as they like.
pub trait MergeTool {
    fn merge(&self, invocation: &MergeInvocation) -> Result<MergeExit>;
}

impl<F> MergeTool for F
where
    F: Fn(&MergeInvocation) -> Result<MergeExit>,
{
    fn merge(&self, invocation: &MergeInvocation) -> Result<MergeExit> {
        self(invocation)
    }
}

/// A merge program launched as a child process.
///
/// Exit status 0 means merged; anything else means cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalMergeTool {
    program: String,
}

impl ExternalMergeTool {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The tool named by `merge/diffmerge/program`, if set.
    pub fn from_config(config: &Config) -> Result<Option<Self>> {
        Ok(config.merge_tool_program()?.map(Self::new))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Command-line arguments for one invocation.
    pub fn args(invocation: &MergeInvocation) -> Vec<OsString> {
        vec![
            "-r".into(),
            invocation.result.clone().into_os_string(),
            "-t1".into(),
            "Mine".into(),
            "-t2".into(),
            invocation.repo_path.as_str().into(),
            "-t3".into(),
            "Other".into(),
            invocation.mine.clone().into_os_string(),
            invocation.ancestor.clone().into_os_string(),
            invocation.other.clone().into_os_string(),
        ]
    }
}

impl MergeTool for ExternalMergeTool {
    fn merge(&self, invocation: &MergeInvocation) -> Result<MergeExit> {
        info!(program = %self.program, path = %invocation.repo_path, "launching merge tool");

        let status = Command::new(&self.program)
            .args(Self::args(invocation))
            .status()
            .map_err(|e| {
                TangleError::MergeToolFailed(format!("failed to launch {}: {}", self.program, e))
            })?;

        if status.success() {
            Ok(MergeExit::Merged)
        } else {
            info!(program = %self.program, status = %status, "merge tool cancelled");
            Ok(MergeExit::Cancelled)
        }
    }
}
