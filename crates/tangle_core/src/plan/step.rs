//! Change steps: one tree mutation each.

use crate::attrs::Attrs;
use crate::error::{Result, TangleError};
use crate::ids::{Gid, Hid};
use crate::repo_path::RepoPath;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// An existing entry at a known path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRef {
    pub gid: Gid,
    pub path: RepoPath,
}

/// A new entry to materialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEntry {
    pub gid: Gid,
    pub dest: RepoPath,
    #[serde(default)]
    pub attrs: Attrs,
    /// Extended attributes stored in the blob store, if any.
    #[serde(default)]
    pub xattrs: Option<Hid>,
}

/// A before/after pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change<T> {
    pub old: T,
    pub new: T,
}

impl<T: PartialEq> Change<T> {
    pub fn new(old: T, new: T) -> Self {
        Self { old, new }
    }

    /// A change whose two sides are equal.
    pub fn same(value: T) -> Self
    where
        T: Clone,
    {
        Self {
            old: value.clone(),
            new: value,
        }
    }

    pub fn is_changed(&self) -> bool {
        self.old != self.new
    }
}

/// The part of an alter step shared by every entry kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alteration {
    pub gid: Gid,
    pub path: Change<RepoPath>,
    pub attrs: Change<Attrs>,
    pub xattrs: Change<Option<Hid>>,
}

impl Alteration {
    /// True when attrs or xattrs differ.
    pub fn attributes_changed(&self) -> bool {
        self.attrs.is_changed() || self.xattrs.is_changed()
    }
}

/// What a step does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepAction {
    /// Relocate a tracked entry.
    MoveRename {
        gid: Gid,
        source: RepoPath,
        dest: RepoPath,
    },
    RemoveFile(EntryRef),
    RemoveSymlink(EntryRef),
    /// Remove an empty directory.
    RemoveDirectory(EntryRef),
    /// Start tracking a directory already on disk.
    AddNewDirectory(EntryRef),
    /// Stop tracking a directory, leaving it on disk.
    UnaddNewDirectory(EntryRef),
    GetFile {
        #[serde(flatten)]
        entry: NewEntry,
        content: Hid,
    },
    /// The link target is stored as a blob.
    GetSymlink {
        #[serde(flatten)]
        entry: NewEntry,
        target: Hid,
    },
    GetDirectory(NewEntry),
    /// Materialize a new file from an auto-merge result.
    GetFileAutoMerge {
        #[serde(flatten)]
        entry: NewEntry,
        merge_result: PathBuf,
    },
    AlterFile {
        #[serde(flatten)]
        alter: Alteration,
        content: Change<Hid>,
    },
    AlterSymlink {
        #[serde(flatten)]
        alter: Alteration,
        target: Change<Hid>,
    },
    AlterDirectory(Alteration),
    /// Replace a file's content with an auto-merge result.
    AlterFileAutoMerge {
        #[serde(flatten)]
        alter: Alteration,
        merge_result: PathBuf,
    },
    /// Raw filesystem move with no pending-tree effect.
    MoveEntry { source: PathBuf, dest: PathBuf },
}

impl StepAction {
    /// The serialized `kind` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MoveRename { .. } => "move_rename",
            Self::RemoveFile(_) => "remove_file",
            Self::RemoveSymlink(_) => "remove_symlink",
            Self::RemoveDirectory(_) => "remove_directory",
            Self::AddNewDirectory(_) => "add_new_directory",
            Self::UnaddNewDirectory(_) => "unadd_new_directory",
            Self::GetFile { .. } => "get_file",
            Self::GetSymlink { .. } => "get_symlink",
            Self::GetDirectory(_) => "get_directory",
            Self::GetFileAutoMerge { .. } => "get_file_auto_merge",
            Self::AlterFile { .. } => "alter_file",
            Self::AlterSymlink { .. } => "alter_symlink",
            Self::AlterDirectory(_) => "alter_directory",
            Self::AlterFileAutoMerge { .. } => "alter_file_auto_merge",
            Self::MoveEntry { .. } => "move_entry",
        }
    }
}

/// One step of a change plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStep {
    /// Why the step exists. Display only.
    pub reason: String,
    pub action: StepAction,
}

impl ChangeStep {
    pub fn new(reason: impl Into<String>, action: StepAction) -> Self {
        Self {
            reason: reason.into(),
            action,
        }
    }

    /// Checks that required fields are present.
    pub fn validate(&self) -> Result<()> {
        if self.reason.trim().is_empty() {
            return Err(TangleError::InvalidArgument(
                "change step has an empty reason".to_string(),
            ));
        }
        match &self.action {
            StepAction::GetFileAutoMerge { merge_result, .. }
            | StepAction::AlterFileAutoMerge { merge_result, .. } => {
                non_empty(merge_result, "merge result")
            }
            StepAction::MoveEntry { source, dest } => {
                non_empty(source, "move source")?;
                non_empty(dest, "move destination")
            }
            _ => Ok(()),
        }
    }

    /// The GID this step affects, if any.
    pub fn gid(&self) -> Option<Gid> {
        match &self.action {
            StepAction::MoveRename { gid, .. } => Some(*gid),
            StepAction::RemoveFile(e)
            | StepAction::RemoveSymlink(e)
            | StepAction::RemoveDirectory(e)
            | StepAction::AddNewDirectory(e)
            | StepAction::UnaddNewDirectory(e) => Some(e.gid),
            StepAction::GetFile { entry, .. }
            | StepAction::GetSymlink { entry, .. }
            | StepAction::GetFileAutoMerge { entry, .. }
            | StepAction::GetDirectory(entry) => Some(entry.gid),
            StepAction::AlterFile { alter, .. }
            | StepAction::AlterSymlink { alter, .. }
            | StepAction::AlterFileAutoMerge { alter, .. }
            | StepAction::AlterDirectory(alter) => Some(alter.gid),
            StepAction::MoveEntry { .. } => None,
        }
    }
}

fn non_empty(path: &std::path::Path, what: &str) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(TangleError::InvalidArgument(format!("{} path is empty", what)));
    }
    Ok(())
}
