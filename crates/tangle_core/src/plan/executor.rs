//! Applies change plans to a working copy.
//!
//! Each step touches three things: the pending tree, the filesystem, and the
//! blob store. Steps run strictly in plan order and each one only looks at
//! the state its predecessors left behind. There is no rollback. When a step
//! fails, the steps before it stay applied and the pending tree is saved so
//! its metadata keeps matching the disk.

use super::step::{Alteration, ChangeStep, EntryRef, NewEntry, StepAction};
use super::ChangePlan;
use crate::attrs::{apply_attrs, apply_xattrs, Attrs, XattrOutcome, XattrSet};
use crate::error::{Result, TangleError};
use crate::ids::{Gid, Hid};
use crate::pending_tree::{EntryKind, PendingTree};
use crate::portability::{check_name, PortabilityFlags, PortabilityWarning};
use crate::repo_path::RepoPath;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Progress callback for plan execution.
/// Called with (steps done, total steps, step just applied).
pub type ExecuteProgressCallback<'p> = dyn Fn(usize, usize, &ChangeStep) + 'p;

/// Outcome of a completed plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecuteReport {
    /// Number of steps applied.
    pub steps_applied: usize,
    /// Portability hazards found along the way.
    pub warnings: Vec<PortabilityWarning>,
}

/// Applies change steps to an open pending tree.
pub struct PlanExecutor<'a> {
    tree: &'a mut PendingTree,
    report: ExecuteReport,
}

impl<'a> PlanExecutor<'a> {
    pub fn new(tree: &'a mut PendingTree) -> Self {
        Self {
            tree,
            report: ExecuteReport::default(),
        }
    }

    /// Applies every step in order, then saves.
    ///
    /// # Errors
    ///
    /// Returns `PlanInterrupted` naming the failing step. Earlier steps stay
    /// applied and are saved.
    pub fn execute(self, plan: &ChangePlan) -> Result<ExecuteReport> {
        self.execute_with_progress(plan, None)
    }

    /// Like [`execute`](Self::execute), reporting each applied step.
    pub fn execute_with_progress(
        mut self,
        plan: &ChangePlan,
        progress: Option<&ExecuteProgressCallback<'_>>,
    ) -> Result<ExecuteReport> {
        let total = plan.len();
        for (index, step) in plan.steps().iter().enumerate() {
            if let Err(source) = self.apply(step) {
                warn!(
                    step = index,
                    reason = %step.reason,
                    error = %source,
                    "change plan interrupted, earlier steps remain applied"
                );
                if let Err(save_err) = self.tree.save() {
                    warn!(error = %save_err, "failed to save partially applied plan");
                }
                return Err(TangleError::PlanInterrupted {
                    step: index,
                    reason: step.reason.clone(),
                    source: Box::new(source),
                });
            }
            if let Some(cb) = progress {
                cb(index + 1, total, step);
            }
        }
        self.finish()
    }

    /// Saves the pending tree and returns what was applied.
    pub fn finish(self) -> Result<ExecuteReport> {
        self.tree.save()?;
        Ok(self.report)
    }

    /// Applies one step without saving.
    pub fn apply(&mut self, step: &ChangeStep) -> Result<()> {
        debug!(reason = %step.reason, gid = ?step.gid(), "applying change step");

        match &step.action {
            StepAction::MoveRename { gid, source, dest } => {
                self.relocate(*gid, source, dest)?;
                if source != dest {
                    self.check_portability(dest);
                }
            }
            StepAction::RemoveFile(entry) => self.remove(entry, EntryKind::File)?,
            StepAction::RemoveSymlink(entry) => self.remove(entry, EntryKind::Symlink)?,
            StepAction::RemoveDirectory(entry) => self.remove(entry, EntryKind::Directory)?,
            StepAction::AddNewDirectory(entry) => self.add_new_directory(entry)?,
            StepAction::UnaddNewDirectory(entry) => {
                self.expect_entry(entry.gid, &entry.path, EntryKind::Directory)?;
                self.ensure_empty(entry.gid, &entry.path)?;
                self.tree.remove_entry(entry.gid)?;
            }
            StepAction::GetFile { entry, content } => {
                let abs = self.prepare_new(entry)?;
                self.tree.blob_store().fetch_to_file(*content, &abs)?;
                self.finish_new(entry, &abs, EntryKind::File)?;
            }
            StepAction::GetSymlink { entry, target } => {
                let abs = self.prepare_new(entry)?;
                let target = self.link_target(*target)?;
                create_symlink(&target, &abs)?;
                self.finish_new(entry, &abs, EntryKind::Symlink)?;
            }
            StepAction::GetDirectory(entry) => {
                let abs = self.prepare_new(entry)?;
                fs::create_dir(&abs)?;
                self.finish_new(entry, &abs, EntryKind::Directory)?;
            }
            StepAction::GetFileAutoMerge {
                entry,
                merge_result,
            } => {
                let abs = self.prepare_new(entry)?;
                self.steal(merge_result, &abs)?;
                self.finish_new(entry, &abs, EntryKind::File)?;
            }
            StepAction::AlterFile { alter, content } => {
                let abs = self.alter(alter, EntryKind::File)?;
                if content.is_changed() {
                    self.tree.blob_store().fetch_to_file(content.new, &abs)?;
                }
                if alter.attributes_changed() {
                    self.apply_attributes(
                        &abs,
                        &alter.path.new,
                        alter.attrs.new,
                        alter.xattrs.new,
                    )?;
                }
            }
            StepAction::AlterSymlink { alter, target } => {
                let abs = self.alter(alter, EntryKind::Symlink)?;
                if target.is_changed() {
                    let new_target = self.link_target(target.new)?;
                    fs::remove_file(&abs)?;
                    create_symlink(&new_target, &abs)?;
                }
                if alter.attributes_changed() {
                    self.apply_attributes(
                        &abs,
                        &alter.path.new,
                        alter.attrs.new,
                        alter.xattrs.new,
                    )?;
                }
            }
            StepAction::AlterDirectory(alter) => {
                let abs = self.alter(alter, EntryKind::Directory)?;
                if alter.attributes_changed() {
                    self.apply_attributes(
                        &abs,
                        &alter.path.new,
                        alter.attrs.new,
                        alter.xattrs.new,
                    )?;
                }
            }
            StepAction::AlterFileAutoMerge {
                alter,
                merge_result,
            } => {
                let abs = self.alter(alter, EntryKind::File)?;
                self.steal(merge_result, &abs)?;
                // The merge output carries no attributes of its own.
                self.apply_attributes(&abs, &alter.path.new, alter.attrs.new, alter.xattrs.new)?;
            }
            StepAction::MoveEntry { source, dest } => {
                let source = self.resolve_fs_path(source);
                let dest = self.resolve_fs_path(dest);
                if source != dest {
                    if fs::symlink_metadata(&dest).is_ok() {
                        return Err(TangleError::PathCollision {
                            path: dest.display().to_string(),
                        });
                    }
                    fs::rename(&source, &dest)?;
                }
            }
        }

        self.report.steps_applied += 1;
        Ok(())
    }

    /// Checks that `gid` is the entry at `path` and has the given kind.
    fn expect_entry(&self, gid: Gid, path: &RepoPath, kind: EntryKind) -> Result<()> {
        let found = self.tree.gid_at(path);
        if found != Some(gid) {
            return Err(TangleError::PlanMismatch(match found {
                Some(other) => format!("expected {} at {}, found {}", gid, path, other),
                None => format!("expected {} at {}, found nothing", gid, path),
            }));
        }
        match self.tree.entry(gid) {
            Some(entry) if entry.kind == kind => Ok(()),
            Some(entry) => Err(TangleError::PlanMismatch(format!(
                "{} is a {:?}, not a {:?}",
                path, entry.kind, kind
            ))),
            None => Err(TangleError::EntryNotFound(gid.to_string())),
        }
    }

    fn ensure_empty(&self, gid: Gid, path: &RepoPath) -> Result<()> {
        if !self.tree.children_names(gid).is_empty() {
            return Err(TangleError::DirectoryNotEmpty {
                path: path.to_string(),
            });
        }
        Ok(())
    }

    /// Moves a tracked entry in the tree, then on disk.
    ///
    /// The tree is updated first so a rejected move leaves the disk alone.
    /// If the disk rename then fails, the tree entry is put back.
    fn relocate(&mut self, gid: Gid, source: &RepoPath, dest: &RepoPath) -> Result<()> {
        let found = self.tree.gid_at(source);
        if found != Some(gid) {
            return Err(TangleError::PlanMismatch(format!(
                "expected {} at {} before moving it to {}",
                gid, source, dest
            )));
        }
        if source == dest {
            return Ok(());
        }

        let (dest_parent, dest_name) = parent_and_name(dest)?;
        let (source_parent, source_name) = parent_and_name(source)?;
        let new_parent = self
            .tree
            .gid_at(&dest_parent)
            .ok_or_else(|| TangleError::EntryNotFound(dest_parent.to_string()))?;
        let old_parent = self
            .tree
            .gid_at(&source_parent)
            .ok_or_else(|| TangleError::EntryNotFound(source_parent.to_string()))?;

        let abs_source = self.tree.absolute_path(source);
        let abs_dest = self.tree.absolute_path(dest);
        if fs::symlink_metadata(&abs_dest).is_ok() {
            return Err(TangleError::PathCollision {
                path: dest.to_string(),
            });
        }

        self.tree.relocate_entry(gid, new_parent, &dest_name)?;
        if let Err(e) = fs::rename(&abs_source, &abs_dest) {
            self.tree.relocate_entry(gid, old_parent, &source_name)?;
            return Err(e.into());
        }
        Ok(())
    }

    fn remove(&mut self, entry: &EntryRef, kind: EntryKind) -> Result<()> {
        self.expect_entry(entry.gid, &entry.path, kind)?;
        let abs = self.tree.absolute_path(&entry.path);

        match kind {
            EntryKind::Directory => {
                self.ensure_empty(entry.gid, &entry.path)?;
                fs::remove_dir(&abs)?;
            }
            EntryKind::File | EntryKind::Symlink => match fs::remove_file(&abs) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!(path = %entry.path, "entry already gone from disk");
                }
                Err(e) => return Err(e.into()),
            },
        }

        self.tree.remove_entry(entry.gid)
    }

    fn add_new_directory(&mut self, entry: &EntryRef) -> Result<()> {
        let abs = self.tree.absolute_path(&entry.path);
        match fs::symlink_metadata(&abs) {
            Ok(meta) if meta.is_dir() => {}
            _ => {
                return Err(TangleError::PlanMismatch(format!(
                    "{} is not a directory on disk",
                    entry.path
                )))
            }
        }
        self.tree
            .add_entry(entry.gid, &entry.path, EntryKind::Directory)?;
        self.check_portability(&entry.path);
        Ok(())
    }

    /// Checks that a new entry can be created and returns its disk path.
    fn prepare_new(&self, entry: &NewEntry) -> Result<PathBuf> {
        if self.tree.entry(entry.gid).is_some() {
            return Err(TangleError::PlanMismatch(format!(
                "{} is already tracked",
                entry.gid
            )));
        }
        if self.tree.gid_at(&entry.dest).is_some() {
            return Err(TangleError::PathCollision {
                path: entry.dest.to_string(),
            });
        }
        let (parent, _) = parent_and_name(&entry.dest)?;
        let parent_gid = self
            .tree
            .gid_at(&parent)
            .ok_or_else(|| TangleError::EntryNotFound(parent.to_string()))?;
        if self.tree.entry(parent_gid).map(|e| e.kind) != Some(EntryKind::Directory) {
            return Err(TangleError::PlanMismatch(format!(
                "{} is not a directory",
                parent
            )));
        }

        let abs = self.tree.absolute_path(&entry.dest);
        if fs::symlink_metadata(&abs).is_ok() {
            return Err(TangleError::PathCollision {
                path: entry.dest.to_string(),
            });
        }
        Ok(abs)
    }

    fn finish_new(&mut self, entry: &NewEntry, abs: &Path, kind: EntryKind) -> Result<()> {
        self.apply_attributes(abs, &entry.dest, entry.attrs, entry.xattrs)?;
        self.tree.add_entry(entry.gid, &entry.dest, kind)?;
        self.check_portability(&entry.dest);
        Ok(())
    }

    /// Relocates an existing entry for an alter step and returns its new disk path.
    fn alter(&mut self, alter: &Alteration, kind: EntryKind) -> Result<PathBuf> {
        self.expect_entry(alter.gid, &alter.path.old, kind)?;
        self.relocate(alter.gid, &alter.path.old, &alter.path.new)?;
        if alter.path.is_changed() {
            self.check_portability(&alter.path.new);
        }
        Ok(self.tree.absolute_path(&alter.path.new))
    }

    /// Moves a merge result over `dest`.
    fn steal(&self, merge_result: &Path, dest: &Path) -> Result<()> {
        let source = self.resolve_fs_path(merge_result);
        if !source.is_file() {
            return Err(TangleError::PlanMismatch(format!(
                "merge result {} is not a file",
                source.display()
            )));
        }
        fs::rename(&source, dest)?;
        Ok(())
    }

    fn apply_attributes(
        &mut self,
        abs: &Path,
        path: &RepoPath,
        attrs: Attrs,
        xattrs: Option<Hid>,
    ) -> Result<()> {
        apply_attrs(abs, attrs)?;

        let set = match xattrs {
            Some(hid) => self.tree.blob_store().get_xattrs(hid)?,
            None => XattrSet::new(),
        };
        if apply_xattrs(abs, &set)? == XattrOutcome::Unsupported {
            self.report.warnings.push(PortabilityWarning {
                path: path.clone(),
                flags: PortabilityFlags::XATTRS_UNSUPPORTED,
            });
        }
        Ok(())
    }

    fn link_target(&self, hid: Hid) -> Result<String> {
        let bytes = self.tree.blob_store().get_blob(hid)?;
        String::from_utf8(bytes).map_err(|_| {
            TangleError::InvalidArgument(format!("symlink target {} is not UTF-8", hid))
        })
    }

    fn resolve_fs_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.tree.workdir_top().join(path)
        }
    }

    fn check_portability(&mut self, path: &RepoPath) {
        let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
            return;
        };
        let flags = match self.tree.gid_at(&parent) {
            Some(dir) => check_name(name, self.tree.children_names(dir)),
            None => check_name(name, []),
        };
        if !flags.is_empty() {
            debug!(path = %path, flags = ?flags, "portability hazard");
            self.report.warnings.push(PortabilityWarning {
                path: path.clone(),
                flags,
            });
        }
    }
}

fn parent_and_name(path: &RepoPath) -> Result<(RepoPath, String)> {
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => Ok((parent, name.to_string())),
        _ => Err(TangleError::PlanMismatch(
            "the working-copy root cannot be changed".to_string(),
        )),
    }
}

#[cfg(unix)]
fn create_symlink(target: &str, link: &Path) -> Result<()> {
    std::os::unix::fs::symlink(target, link)?;
    Ok(())
}

#[cfg(not(unix))]
fn create_symlink(_target: &str, link: &Path) -> Result<()> {
    Err(TangleError::Unsupported(format!(
        "cannot create symlink {}",
        link.display()
    )))
}
