//! Mapping command arguments to issues.

use crate::error::{Result, TangleError};
use crate::ids::Gid;
use crate::issue::Issue;
use crate::pending_tree::PendingTree;
use crate::repo_path::RepoPath;
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Which issues a verb acts on when no targets are given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Unresolved,
    Any,
}

impl StatusFilter {
    pub fn matches(self, issue: &Issue) -> bool {
        match self {
            Self::Unresolved => !issue.is_resolved(),
            Self::Any => true,
        }
    }
}

/// Every issue passing `filter`, ordered by current path.
pub fn select_all(tree: &PendingTree, filter: StatusFilter) -> Vec<Gid> {
    let mut selected: Vec<(RepoPath, Gid)> = tree
        .issues()
        .filter(|issue| filter.matches(issue))
        .map(|issue| (tree.issue_path(issue), issue.gid))
        .collect();
    selected.sort();
    selected.into_iter().map(|(_, gid)| gid).collect()
}

/// Resolves each argument to the GID of an issue, in argument order.
///
/// Arguments are `@/...` repo paths or filesystem paths, absolute or
/// relative to `cwd`.
///
/// # Errors
///
/// `IssueNotFound` for an argument with no issue, `DuplicateTarget` when
/// two arguments name the same issue.
pub fn resolve_targets(tree: &PendingTree, args: &[String], cwd: &Path) -> Result<Vec<Gid>> {
    let mut seen: HashMap<Gid, &str> = HashMap::new();
    let mut gids = Vec::with_capacity(args.len());

    for arg in args {
        let not_found = || TangleError::IssueNotFound { path: arg.clone() };
        let path = to_repo_path(tree, arg, cwd).map_err(|_| not_found())?;
        let gid = find_issue_at(tree, &path).ok_or_else(not_found)?;

        if let Some(other) = seen.insert(gid, arg) {
            return Err(TangleError::DuplicateTarget {
                path: arg.clone(),
                other: other.to_string(),
            });
        }
        gids.push(gid);
    }
    Ok(gids)
}

fn find_issue_at(tree: &PendingTree, path: &RepoPath) -> Option<Gid> {
    if let Some(gid) = tree.gid_at(path) {
        if tree.find_issue(gid).is_some() {
            return Some(gid);
        }
    }
    tree.issues()
        .find(|issue| tree.issue_path(issue) == *path)
        .map(|issue| issue.gid)
}

fn to_repo_path(tree: &PendingTree, arg: &str, cwd: &Path) -> Result<RepoPath> {
    if arg.starts_with('@') {
        return RepoPath::parse(arg);
    }

    let joined = normalize(&cwd.join(arg));
    let top = tree.workdir_top();
    match RepoPath::from_fs_path(top, &joined) {
        Ok(path) => Ok(path),
        Err(err) => {
            // Symlinked temp dirs make the two sides disagree.
            let top = fs::canonicalize(top).map_err(|_| err)?;
            let joined = canonicalize_existing(&joined);
            RepoPath::from_fs_path(&top, &joined)
        }
    }
}

/// Lexically removes `.` and `..`. The path need not exist.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Canonicalizes the longest existing ancestor and re-appends the rest.
fn canonicalize_existing(path: &Path) -> PathBuf {
    let mut missing = Vec::new();
    let mut current = path;
    loop {
        if let Ok(real) = fs::canonicalize(current) {
            let mut out = real;
            for name in missing.iter().rev() {
                out.push(name);
            }
            return out;
        }
        match (current.parent(), current.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                current = parent;
            }
            _ => return path.to_path_buf(),
        }
    }
}
