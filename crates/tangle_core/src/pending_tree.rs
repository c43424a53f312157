//! The pending tree: lock-guarded metadata of a working copy.
//!
//! Entries are kept in a flat map keyed by GID, each pointing at its parent
//! directory, so paths are computed on demand and nothing borrows into the
//! map across mutations. Mutations are batched in memory until [`save`].
//!
//! [`save`]: PendingTree::save

use crate::blob_store::BlobStore;
use crate::config::Config;
use crate::error::{Result, TangleError};
use crate::ids::Gid;
use crate::issue::{Issue, IssueStatus, MergeStepStatus};
use crate::lock::LockGuard;
use crate::repo_path::RepoPath;
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Name of the metadata directory at the working-copy top.
pub const TANGLE_DIR: &str = ".tangle";

const PENDING_FILE: &str = "pending.json";
const BLOBS_DIR: &str = "blobs";
const FORMAT_VERSION: u32 = 1;

/// Kind of a tracked entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum EntryKind {
    File = 1,
    Symlink = 2,
    Directory = 3,
}

/// A tracked entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Containing directory; `None` only for the root.
    pub parent: Option<Gid>,
    /// Entry name; empty for the root.
    pub name: String,
    pub kind: EntryKind,
}

#[derive(Debug, Serialize, Deserialize)]
struct PendingState {
    version: u32,
    root: Gid,
    entries: BTreeMap<Gid, Entry>,
    #[serde(default)]
    issues: BTreeMap<Gid, Issue>,
}

impl PendingState {
    fn fresh() -> Self {
        let root = Gid::new();
        let mut entries = BTreeMap::new();
        entries.insert(
            root,
            Entry {
                parent: None,
                name: String::new(),
                kind: EntryKind::Directory,
            },
        );
        Self {
            version: FORMAT_VERSION,
            root,
            entries,
            issues: BTreeMap::new(),
        }
    }

    fn validate(&self) -> Result<()> {
        let corrupted = |reason: String| TangleError::PendingTreeCorrupted { reason };

        if self.version != FORMAT_VERSION {
            return Err(corrupted(format!("unsupported version {}", self.version)));
        }
        match self.entries.get(&self.root) {
            Some(root) if root.parent.is_none() && root.kind == EntryKind::Directory => {}
            _ => return Err(corrupted("missing root directory".to_string())),
        }
        for (gid, entry) in &self.entries {
            if *gid == self.root {
                continue;
            }
            let parent = entry
                .parent
                .and_then(|p| self.entries.get(&p))
                .ok_or_else(|| corrupted(format!("{} has no parent", gid)))?;
            if parent.kind != EntryKind::Directory {
                return Err(corrupted(format!("parent of {} is not a directory", gid)));
            }
        }
        for (gid, issue) in &self.issues {
            if *gid != issue.gid {
                return Err(corrupted(format!("issue {} filed under {}", issue.gid, gid)));
            }
        }
        Ok(())
    }
}

/// An open, locked working copy.
///
/// Holding a `PendingTree` holds the working-copy lock. [`release`] consumes
/// the handle, so nothing read through it can be used once the lock is gone.
///
/// [`release`]: PendingTree::release
#[derive(Debug)]
pub struct PendingTree {
    workdir: PathBuf,
    state: PendingState,
    blobs: BlobStore,
    config: Config,
    dirty: bool,
    _lock: LockGuard,
}

impl PendingTree {
    /// Creates a new working copy at `workdir` and opens it.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyInitialized` if `workdir` already has a `.tangle`
    /// directory.
    pub fn init(workdir: impl AsRef<Path>) -> Result<Self> {
        let workdir = workdir.as_ref().to_path_buf();
        let tangle_dir = workdir.join(TANGLE_DIR);
        if tangle_dir.exists() {
            return Err(TangleError::AlreadyInitialized(workdir));
        }

        fs::create_dir_all(tangle_dir.join(BLOBS_DIR))?;
        let lock = LockGuard::acquire(&tangle_dir)?;
        let config = Config::default();
        config.save(&tangle_dir)?;

        let mut tree = Self {
            blobs: BlobStore::new(tangle_dir.join(BLOBS_DIR))
                .with_compression_level(config.storage.compression_level),
            workdir,
            state: PendingState::fresh(),
            config,
            dirty: true,
            _lock: lock,
        };
        tree.save()?;

        info!(workdir = %tree.workdir.display(), "initialized working copy");
        Ok(tree)
    }

    /// Opens the working copy at `workdir`, acquiring its lock.
    pub fn open(workdir: impl AsRef<Path>) -> Result<Self> {
        let workdir = workdir.as_ref().to_path_buf();
        let tangle_dir = workdir.join(TANGLE_DIR);
        let pending_path = tangle_dir.join(PENDING_FILE);
        if !pending_path.exists() {
            return Err(TangleError::NotAWorkingCopy(workdir));
        }

        let lock = LockGuard::acquire(&tangle_dir)?;
        let content = fs::read_to_string(&pending_path)?;
        let state: PendingState =
            serde_json::from_str(&content).map_err(|e| TangleError::PendingTreeCorrupted {
                reason: e.to_string(),
            })?;
        state.validate()?;
        let config = Config::load(&tangle_dir)?;

        debug!(
            workdir = %workdir.display(),
            entries = state.entries.len(),
            issues = state.issues.len(),
            "opened pending tree"
        );

        Ok(Self {
            blobs: BlobStore::new(tangle_dir.join(BLOBS_DIR))
                .with_compression_level(config.storage.compression_level),
            workdir,
            state,
            config,
            dirty: false,
            _lock: lock,
        })
    }

    /// Finds the working copy containing `start` and opens it.
    pub fn discover(start: &Path) -> Result<Self> {
        let mut dir = Some(start);
        while let Some(candidate) = dir {
            if candidate.join(TANGLE_DIR).join(PENDING_FILE).exists() {
                return Self::open(candidate);
            }
            dir = candidate.parent();
        }
        Err(TangleError::NotAWorkingCopy(start.to_path_buf()))
    }

    /// Frees the lock and returns the working directory for reopening.
    ///
    /// Unsaved changes are discarded.
    pub fn release(self) -> PathBuf {
        if self.dirty {
            warn!(workdir = %self.workdir.display(), "releasing pending tree with unsaved changes");
        }
        debug!(workdir = %self.workdir.display(), "released pending tree");
        self.workdir
    }

    /// Persists all changes atomically.
    pub fn save(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        let tangle_dir = self.tangle_dir();
        let path = tangle_dir.join(PENDING_FILE);
        let json = serde_json::to_vec_pretty(&self.state)
            .map_err(|e| TangleError::Serialization(e.to_string()))?;

        let tmp_path = path.with_extension("json.tmp");
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &path)?;

        #[cfg(unix)]
        {
            if let Ok(dir_file) = File::open(&tangle_dir) {
                let _ = dir_file.sync_all();
            }
        }

        self.dirty = false;
        Ok(())
    }

    /// Returns true if there are unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Top of the working directory.
    pub fn workdir_top(&self) -> &Path {
        &self.workdir
    }

    /// The `.tangle` metadata directory.
    pub fn tangle_dir(&self) -> PathBuf {
        self.workdir.join(TANGLE_DIR)
    }

    /// The repository blob store.
    pub fn blob_store(&self) -> &BlobStore {
        &self.blobs
    }

    /// Configuration loaded when the tree was opened.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// GID of the root directory.
    pub fn root_gid(&self) -> Gid {
        self.state.root
    }

    /// Filesystem location of a repo path.
    pub fn absolute_path(&self, path: &RepoPath) -> PathBuf {
        path.to_fs_path(&self.workdir)
    }

    pub fn entry(&self, gid: Gid) -> Option<&Entry> {
        self.state.entries.get(&gid)
    }

    /// Number of tracked entries, root included.
    pub fn len(&self) -> usize {
        self.state.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.entries.len() <= 1
    }

    /// GID of the entry at `path`, if one is tracked there.
    pub fn gid_at(&self, path: &RepoPath) -> Option<Gid> {
        let mut current = self.state.root;
        for name in path.components() {
            current = self.child_named(current, name)?;
        }
        Some(current)
    }

    /// Current repo path of a tracked entry.
    pub fn repo_path_of(&self, gid: Gid) -> Result<RepoPath> {
        let mut names = Vec::new();
        let mut current = gid;
        loop {
            let entry = self
                .state
                .entries
                .get(&current)
                .ok_or_else(|| TangleError::EntryNotFound(current.to_string()))?;
            match entry.parent {
                Some(parent) => {
                    names.push(entry.name.as_str());
                    // A parent chain longer than the tree itself means a cycle.
                    if names.len() > self.state.entries.len() {
                        return Err(TangleError::PendingTreeCorrupted {
                            reason: format!("parent cycle at {}", gid),
                        });
                    }
                    current = parent;
                }
                None => break,
            }
        }

        let mut path = RepoPath::root();
        for name in names.iter().rev() {
            path = path.join(name)?;
        }
        Ok(path)
    }

    /// Names of the direct children of a directory.
    pub fn children_names(&self, dir: Gid) -> Vec<&str> {
        self.children(dir).map(|(_, entry)| entry.name.as_str()).collect()
    }

    fn children(&self, dir: Gid) -> impl Iterator<Item = (Gid, &Entry)> {
        self.state
            .entries
            .iter()
            .filter(move |(_, entry)| entry.parent == Some(dir))
            .map(|(gid, entry)| (*gid, entry))
    }

    fn child_named(&self, dir: Gid, name: &str) -> Option<Gid> {
        self.children(dir)
            .find(|(_, entry)| entry.name == name)
            .map(|(gid, _)| gid)
    }

    fn directory(&self, gid: Gid) -> Result<&Entry> {
        let entry = self
            .entry(gid)
            .ok_or_else(|| TangleError::EntryNotFound(gid.to_string()))?;
        if entry.kind != EntryKind::Directory {
            return Err(TangleError::PlanMismatch(format!("{} is not a directory", gid)));
        }
        Ok(entry)
    }

    fn ensure_vacant(&self, dir: Gid, name: &str) -> Result<()> {
        if self.child_named(dir, name).is_some() {
            let path = self.repo_path_of(dir)?.join(name)?;
            return Err(TangleError::PathCollision {
                path: path.to_string(),
            });
        }
        Ok(())
    }

    /// Starts tracking a new entry at `path`. Does not save.
    pub fn add_entry(&mut self, gid: Gid, path: &RepoPath, kind: EntryKind) -> Result<()> {
        if self.state.entries.contains_key(&gid) {
            return Err(TangleError::PlanMismatch(format!("{} is already tracked", gid)));
        }
        let (parent_path, name) = split(path)?;
        let parent = self
            .gid_at(&parent_path)
            .ok_or_else(|| TangleError::EntryNotFound(parent_path.to_string()))?;
        self.directory(parent)?;
        self.ensure_vacant(parent, name)?;

        self.state.entries.insert(
            gid,
            Entry {
                parent: Some(parent),
                name: name.to_string(),
                kind,
            },
        );
        self.dirty = true;
        Ok(())
    }

    /// Moves an entry into another directory, keeping its name. Does not save.
    pub fn move_entry(&mut self, gid: Gid, new_parent: Gid) -> Result<()> {
        let name = self.tracked(gid)?.name.clone();
        self.relocate_entry(gid, new_parent, &name)
    }

    /// Renames an entry within its directory. Does not save.
    pub fn rename_entry(&mut self, gid: Gid, new_name: &str) -> Result<()> {
        let parent = self.tracked(gid)?.parent.ok_or_else(|| {
            TangleError::InvalidArgument("the root cannot be renamed".to_string())
        })?;
        self.relocate_entry(gid, parent, new_name)
    }

    /// Gives an entry a new parent and name in one update. Only the
    /// destination has to be vacant. Does not save.
    pub fn relocate_entry(&mut self, gid: Gid, new_parent: Gid, new_name: &str) -> Result<()> {
        let entry = self.tracked(gid)?;
        if entry.parent.is_none() {
            return Err(TangleError::InvalidArgument(
                "the root cannot be moved".to_string(),
            ));
        }
        if entry.parent == Some(new_parent) && entry.name == new_name {
            return Ok(());
        }
        // Validates the name.
        RepoPath::root().join(new_name)?;
        self.directory(new_parent)?;

        let mut ancestor = Some(new_parent);
        while let Some(dir) = ancestor {
            if dir == gid {
                return Err(TangleError::PlanMismatch(format!(
                    "cannot move {} into itself",
                    gid
                )));
            }
            ancestor = self.entry(dir).and_then(|e| e.parent);
        }
        self.ensure_vacant(new_parent, new_name)?;

        if let Some(entry) = self.state.entries.get_mut(&gid) {
            entry.parent = Some(new_parent);
            entry.name = new_name.to_string();
        }
        self.dirty = true;
        Ok(())
    }

    /// Stops tracking an entry. Directories must be empty. Does not save.
    pub fn remove_entry(&mut self, gid: Gid) -> Result<()> {
        if gid == self.state.root {
            return Err(TangleError::InvalidArgument(
                "the root cannot be removed".to_string(),
            ));
        }
        self.tracked(gid)?;
        if self.children(gid).next().is_some() {
            return Err(TangleError::DirectoryNotEmpty {
                path: self.repo_path_of(gid)?.to_string(),
            });
        }

        self.state.entries.remove(&gid);
        self.dirty = true;
        Ok(())
    }

    fn tracked(&self, gid: Gid) -> Result<&Entry> {
        self.entry(gid)
            .ok_or_else(|| TangleError::EntryNotFound(gid.to_string()))
    }

    /// All issues, in GID order.
    pub fn issues(&self) -> impl Iterator<Item = &Issue> {
        self.state.issues.values()
    }

    pub fn find_issue(&self, gid: Gid) -> Option<&Issue> {
        self.state.issues.get(&gid)
    }

    /// Path of an issue's entry: where it is now, or where it was recorded.
    pub fn issue_path(&self, issue: &Issue) -> RepoPath {
        self.repo_path_of(issue.gid)
            .unwrap_or_else(|_| issue.path.clone())
    }

    /// Stores an issue, replacing any issue for the same GID. Does not save.
    pub fn record_issue(&mut self, issue: Issue) {
        debug!(gid = %issue.gid, path = %issue.path, "recorded issue");
        self.state.issues.insert(issue.gid, issue);
        self.dirty = true;
    }

    /// Replaces an issue's status bits. Does not save.
    pub fn set_issue_status(&mut self, gid: Gid, status: IssueStatus) -> Result<()> {
        let issue = self
            .state
            .issues
            .get_mut(&gid)
            .ok_or(TangleError::IssueVanished(gid))?;
        issue.status = status;
        self.dirty = true;
        Ok(())
    }

    /// Updates one content merge step of an issue. Does not save.
    pub fn set_content_merge_step_status(
        &mut self,
        gid: Gid,
        index: usize,
        status: MergeStepStatus,
    ) -> Result<()> {
        let issue = self
            .state
            .issues
            .get_mut(&gid)
            .ok_or(TangleError::IssueVanished(gid))?;
        let step = issue.content_merge_plan.get_mut(index).ok_or_else(|| {
            TangleError::InvalidArgument(format!("issue {} has no merge step {}", gid, index))
        })?;
        step.status = status;
        self.dirty = true;
        Ok(())
    }
}

fn split(path: &RepoPath) -> Result<(RepoPath, &str)> {
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => Ok((parent, name)),
        _ => Err(TangleError::InvalidArgument(
            "the root has no parent".to_string(),
        )),
    }
}
