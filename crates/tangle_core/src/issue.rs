//! Conflict issues left behind by a merge.
//!
//! One [`Issue`] exists per entry the merge could not settle on its own. It
//! records what conflicts, where the staged `mine`/`other`/`ancestor` copies
//! live, and whether the user has resolved it.

use crate::flags::flag_set;
use crate::ids::Gid;
use crate::portability::PortabilityFlags;
use crate::repo_path::RepoPath;
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use std::fmt;

flag_set! {
    /// Workflow status of an issue.
    pub struct IssueStatus {
        /// The user has resolved the issue.
        const RESOLVED = 0x1, "resolved";
    }
}

flag_set! {
    /// What conflicts about an entry.
    pub struct ConflictFlags {
        /// Both sides edited the file and no merge rule applies.
        const NO_RULE = 0x1, "divergent edit (no rule)";
        /// The automatic merge failed to run.
        const AUTO_ERROR = 0x2, "divergent edit (auto-merge error)";
        /// The automatic merge produced conflicts.
        const AUTO_CONFLICT = 0x4, "divergent edit (auto-merge conflict)";
        /// The automatic merge succeeded.
        const AUTO_OK = 0x8, "divergent edit (auto-merged)";
        const DELETE_VS_MOVE = 0x10, "deleted vs moved";
        const DELETE_VS_RENAME = 0x20, "deleted vs renamed";
        const DELETE_VS_ATTRBITS = 0x40, "deleted vs attributes changed";
        const DELETE_VS_XATTR = 0x80, "deleted vs xattrs changed";
        const DELETE_VS_FILE_EDIT = 0x100, "deleted vs edited";
        const DELETE_VS_SYMLINK_EDIT = 0x200, "deleted vs symlink retargeted";
        const DIVERGENT_MOVE = 0x400, "divergent move";
        const DIVERGENT_RENAME = 0x800, "divergent rename";
        const DIVERGENT_ATTRBITS = 0x1000, "divergent attributes";
        const DIVERGENT_XATTR = 0x2000, "divergent xattrs";
        const DIVERGENT_SYMLINK_EDIT = 0x4000, "divergent symlink target";
        const MOVES_CAUSE_PATH_CYCLE = 0x8000, "moves cause a path cycle";
    }
}

impl ConflictFlags {
    /// Divergent file edits that still need a content merge.
    pub const DIVERGENT_FILE_EDIT_NOT_OK: Self = Self::from_bits(
        Self::NO_RULE.bits() | Self::AUTO_ERROR.bits() | Self::AUTO_CONFLICT.bits(),
    );

    /// Every divergent-file-edit bit, settled or not.
    pub const DIVERGENT_FILE_EDIT_MASK: Self =
        Self::from_bits(Self::DIVERGENT_FILE_EDIT_NOT_OK.bits() | Self::AUTO_OK.bits());

    /// Conflicts that need the deleted entry restored before they can be resolved.
    pub const UNDELETE_MASK: Self = Self::from_bits(
        Self::DELETE_VS_MOVE.bits()
            | Self::DELETE_VS_RENAME.bits()
            | Self::DELETE_VS_ATTRBITS.bits()
            | Self::DELETE_VS_XATTR.bits()
            | Self::DELETE_VS_FILE_EDIT.bits()
            | Self::DELETE_VS_SYMLINK_EDIT.bits(),
    );
}

flag_set! {
    /// Name collisions affecting an entry.
    pub struct CollisionFlags {
        /// Another entry wants the same name.
        const NAME_COLLISION = 0x1, "name collision";
        /// The entry was moved aside to make room.
        const PARKED_FOR_COLLISION = 0x2, "parked for collision";
    }
}

/// Progress of one content merge step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum MergeStepStatus {
    /// Not merged yet.
    #[default]
    Pending = 0,
    /// The merge tool produced a result.
    Successful = 1,
}

/// One content merge: three staged inputs and an output.
///
/// Names refer to entries inside the issue's parking directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentMergeStep {
    pub mine_name: String,
    pub other_name: String,
    pub ancestor_name: String,
    /// Ignored for the final step of a plan, whose output is the real entry.
    pub result_name: String,
    #[serde(default)]
    pub status: MergeStepStatus,
}

/// A persisted conflict record for one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// The conflicting entry.
    pub gid: Gid,
    #[serde(default)]
    pub status: IssueStatus,
    #[serde(default)]
    pub conflict_flags: ConflictFlags,
    #[serde(default)]
    pub collision_flags: CollisionFlags,
    #[serde(default)]
    pub portability_flags: PortabilityFlags,
    /// Directory holding the staged copies.
    #[serde(default)]
    pub gid_parent: Option<Gid>,
    /// Where the entry was when the issue was recorded.
    pub path: RepoPath,
    #[serde(default)]
    pub content_merge_plan: Vec<ContentMergeStep>,
}

impl Issue {
    /// Creates an unresolved issue with no flags set.
    pub fn new(gid: Gid, path: RepoPath) -> Self {
        Self {
            gid,
            status: IssueStatus::empty(),
            conflict_flags: ConflictFlags::empty(),
            collision_flags: CollisionFlags::empty(),
            portability_flags: PortabilityFlags::empty(),
            gid_parent: None,
            path,
            content_merge_plan: Vec::new(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.status.contains(IssueStatus::RESOLVED)
    }

    /// True when a divergent file edit still needs a content merge.
    pub fn has_content_conflict(&self) -> bool {
        self.conflict_flags
            .intersects(ConflictFlags::DIVERGENT_FILE_EDIT_NOT_OK)
    }

    /// True when the entry must be restored before the issue can be resolved.
    pub fn needs_undelete(&self) -> bool {
        self.conflict_flags.intersects(ConflictFlags::UNDELETE_MASK)
    }

    /// True when anything besides a divergent file edit is flagged.
    pub fn has_structural_conflict(&self) -> bool {
        !self
            .conflict_flags
            .difference(ConflictFlags::DIVERGENT_FILE_EDIT_MASK)
            .is_empty()
            || !self.collision_flags.is_empty()
            || !self.portability_flags.is_empty()
    }

    /// True when the single content merge step has succeeded.
    pub fn has_successful_merge(&self) -> bool {
        matches!(
            self.content_merge_plan.as_slice(),
            [step] if step.status == MergeStepStatus::Successful
        )
    }

    /// Builds a display summary using the entry's current location.
    pub fn view(&self, current_path: RepoPath) -> IssueView {
        let mut problems = self.conflict_flags.names();
        problems.extend(self.collision_flags.names());
        problems.extend(self.portability_flags.names());
        IssueView {
            gid: self.gid,
            path: current_path,
            resolved: self.is_resolved(),
            problems,
        }
    }
}

/// A read-only summary of an issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueView {
    pub gid: Gid,
    /// Current path of the entry, or its recorded path if it is gone.
    pub path: RepoPath,
    pub resolved: bool,
    /// Display names of every flagged problem.
    pub problems: Vec<&'static str>,
}

impl fmt::Display for IssueView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.resolved { "resolved" } else { "unresolved" };
        write!(f, "{:<10} {}", state, self.path)?;
        if !self.problems.is_empty() {
            write!(f, " ({})", self.problems.join(", "))?;
        }
        Ok(())
    }
}
