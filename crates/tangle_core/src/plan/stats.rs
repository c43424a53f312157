//! Running counters of a change plan.

use super::step::StepAction;
use serde::{Deserialize, Serialize};

/// Counters incremented once per appended step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStats {
    pub files_changed: u64,
    pub files_deleted: u64,
    pub files_added: u64,
    pub files_auto_merged: u64,
    pub dirs_changed: u64,
    pub dirs_deleted: u64,
    pub dirs_added: u64,
}

impl PlanStats {
    pub(crate) fn record(&mut self, action: &StepAction) {
        match action {
            StepAction::RemoveFile(_) | StepAction::RemoveSymlink(_) => self.files_deleted += 1,
            StepAction::RemoveDirectory(_) => self.dirs_deleted += 1,
            StepAction::GetFile { .. } | StepAction::GetSymlink { .. } => self.files_added += 1,
            StepAction::GetDirectory(_) => self.dirs_added += 1,
            StepAction::GetFileAutoMerge { .. } => {
                self.files_added += 1;
                self.files_auto_merged += 1;
            }
            StepAction::AlterFile { .. } | StepAction::AlterSymlink { .. } => {
                self.files_changed += 1
            }
            StepAction::AlterDirectory(_) => self.dirs_changed += 1,
            StepAction::AlterFileAutoMerge { .. } => {
                self.files_changed += 1;
                self.files_auto_merged += 1;
            }
            StepAction::MoveRename { .. }
            | StepAction::AddNewDirectory(_)
            | StepAction::UnaddNewDirectory(_)
            | StepAction::MoveEntry { .. } => {}
        }
    }
}
