//! Driving conflict issues to a resolved state.
//!
//! Content conflicts are handed to an external merge tool. The tool may stay
//! open for as long as the user likes, so the working-copy lock is released
//! while it runs: the [`PendingTree`] handle is consumed before the launch
//! and a fresh one is opened afterwards. The issue is then read again, and
//! if someone else resolved it in the meantime nothing is written.

pub mod targets;
pub mod tool;

pub use targets::{resolve_targets, select_all, StatusFilter};
pub use tool::{ExternalMergeTool, MergeExit, MergeInvocation, MergeTool};

use crate::error::{Result, TangleError};
use crate::ids::Gid;
use crate::issue::{ContentMergeStep, Issue, IssueStatus, IssueView, MergeStepStatus};
use crate::pending_tree::PendingTree;
use crate::repo_path::RepoPath;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const MARK_HINT: &str = "fix it manually, then run 'tangle resolve --mark'";

/// What `tangle resolve` should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveVerb {
    /// Fix each issue, launching the merge tool for content conflicts.
    Fix,
    /// Show unresolved issues.
    List,
    /// Show all issues.
    ListAll,
    /// Mark the named issues resolved.
    Mark,
    /// Mark every unresolved issue resolved.
    MarkAll,
}

impl ResolveVerb {
    /// Picks a verb from mutually exclusive flags.
    pub fn from_flags(list: bool, listall: bool, mark: bool, markall: bool) -> Result<Self> {
        let chosen: Vec<Self> = [
            (list, Self::List),
            (listall, Self::ListAll),
            (mark, Self::Mark),
            (markall, Self::MarkAll),
        ]
        .into_iter()
        .filter(|(set, _)| *set)
        .map(|(_, verb)| verb)
        .collect();

        match chosen.as_slice() {
            [] => Ok(Self::Fix),
            [verb] => Ok(*verb),
            _ => Err(TangleError::Usage(
                "--list, --listall, --mark and --markall are mutually exclusive".to_string(),
            )),
        }
    }

    /// Issues acted on when no targets are given.
    pub fn status_filter(self) -> StatusFilter {
        match self {
            Self::ListAll => StatusFilter::Any,
            Self::Fix | Self::List | Self::Mark | Self::MarkAll => StatusFilter::Unresolved,
        }
    }
}

/// A resolve command.
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    pub verb: ResolveVerb,
    /// Paths naming issues; empty means every issue matching the verb.
    pub targets: Vec<String>,
    /// Directory relative targets are resolved against.
    pub cwd: PathBuf,
}

/// How fixing one issue ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixOutcome {
    Resolved,
    AlreadyResolved,
    /// The merge tool was cancelled. Nothing changed.
    Aborted,
    /// Someone else resolved the issue while the merge tool ran.
    LostRace,
    /// Needs manual work; the message says what.
    Todo(String),
}

impl FixOutcome {
    /// True when the issue is resolved after this outcome.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Resolved | Self::AlreadyResolved)
    }
}

impl fmt::Display for FixOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved => f.write_str("resolved"),
            Self::AlreadyResolved => f.write_str("already resolved"),
            Self::Aborted => f.write_str("merge cancelled"),
            Self::LostRace => f.write_str("resolved elsewhere while merging"),
            Self::Todo(message) => f.write_str(message),
        }
    }
}

/// Progress notifications from the resolve workflow.
#[derive(Debug)]
pub enum ResolveEvent<'a> {
    /// About to work on an issue.
    Issue(&'a IssueView),
    /// The merge tool is about to run with the lock released.
    LaunchingTool { path: &'a RepoPath },
    /// Fixing an issue finished.
    Fixed {
        path: &'a RepoPath,
        outcome: &'a FixOutcome,
    },
    /// An issue was marked resolved.
    Marked { path: &'a RepoPath, already: bool },
    /// The batch stopped early, skipping these issues.
    Abandoned { remaining: &'a [RepoPath] },
}

/// Callback receiving [`ResolveEvent`]s.
pub type ResolveEventCallback<'c> = dyn Fn(&ResolveEvent<'_>) + 'c;

/// Result of a resolve command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveReport {
    /// Issues shown by `List`/`ListAll`.
    pub listed: Vec<IssueView>,
    /// Issues marked by `Mark`/`MarkAll`, including already resolved ones.
    pub marked: Vec<RepoPath>,
    /// Outcome of each issue `Fix` worked on, in order.
    pub outcomes: Vec<(RepoPath, FixOutcome)>,
    /// Issues `Fix` skipped after an unsettled outcome.
    pub abandoned: Vec<RepoPath>,
}

/// Runs resolve commands against a working copy.
///
/// ```no_run
/// use tangle_core::{PendingTree, ResolveRequest, ResolveVerb, Resolver};
///
/// let tree = PendingTree::open(".").unwrap();
/// let request = ResolveRequest {
///     verb: ResolveVerb::List,
///     targets: Vec::new(),
///     cwd: ".".into(),
/// };
/// let report = Resolver::new().run(tree, &request).unwrap();
/// for view in &report.listed {
///     println!("{}", view);
/// }
/// ```
#[derive(Default)]
pub struct Resolver<'a> {
    tool: Option<&'a dyn MergeTool>,
    events: Option<&'a ResolveEventCallback<'a>>,
}

impl<'a> Resolver<'a> {
    /// A resolver using the merge tool named in the working copy's config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `tool` instead of the configured program.
    pub fn with_tool(mut self, tool: &'a dyn MergeTool) -> Self {
        self.tool = Some(tool);
        self
    }

    pub fn with_events(mut self, events: &'a ResolveEventCallback<'a>) -> Self {
        self.events = Some(events);
        self
    }

    fn emit(&self, event: ResolveEvent<'_>) {
        if let Some(cb) = self.events {
            cb(&event);
        }
    }

    /// Runs one request. The tree is released when this returns.
    pub fn run(&self, tree: PendingTree, request: &ResolveRequest) -> Result<ResolveReport> {
        if request.verb == ResolveVerb::Mark && request.targets.is_empty() {
            return Err(TangleError::Usage(
                "--mark needs at least one path (use --markall for every issue)".to_string(),
            ));
        }

        let gids = if request.targets.is_empty() {
            select_all(&tree, request.verb.status_filter())
        } else {
            resolve_targets(&tree, &request.targets, &request.cwd)?
        };
        debug!(verb = ?request.verb, issues = gids.len(), "resolve targets selected");

        match request.verb {
            ResolveVerb::List | ResolveVerb::ListAll => Ok(ResolveReport {
                listed: self.list(&tree, &gids)?,
                ..ResolveReport::default()
            }),
            ResolveVerb::Mark | ResolveVerb::MarkAll => {
                let mut tree = tree;
                Ok(ResolveReport {
                    marked: self.mark(&mut tree, &gids)?,
                    ..ResolveReport::default()
                })
            }
            ResolveVerb::Fix => self.fix_batch(tree, &gids),
        }
    }

    fn list(&self, tree: &PendingTree, gids: &[Gid]) -> Result<Vec<IssueView>> {
        gids.iter()
            .map(|gid| {
                let issue = tree.find_issue(*gid).ok_or(TangleError::IssueVanished(*gid))?;
                Ok(issue.view(tree.issue_path(issue)))
            })
            .collect()
    }

    /// Marks issues resolved and saves once.
    pub fn mark(&self, tree: &mut PendingTree, gids: &[Gid]) -> Result<Vec<RepoPath>> {
        let mut marked = Vec::with_capacity(gids.len());
        for gid in gids {
            let issue = tree.find_issue(*gid).ok_or(TangleError::IssueVanished(*gid))?;
            let path = tree.issue_path(issue);
            let already = issue.is_resolved();
            if !already {
                let mut status = issue.status;
                status.insert(IssueStatus::RESOLVED);
                tree.set_issue_status(*gid, status)?;
                info!(gid = %gid, path = %path, "marked issue resolved");
            }
            self.emit(ResolveEvent::Marked {
                path: &path,
                already,
            });
            marked.push(path);
        }
        tree.save()?;
        Ok(marked)
    }

    fn fix_batch(&self, tree: PendingTree, gids: &[Gid]) -> Result<ResolveReport> {
        let mut report = ResolveReport::default();
        let mut tree = tree;

        for (index, gid) in gids.iter().enumerate() {
            let (next, outcome) = self.fix(tree, *gid)?;
            tree = next;

            let path = current_path(&tree, *gid);
            self.emit(ResolveEvent::Fixed {
                path: &path,
                outcome: &outcome,
            });
            let settled = outcome.is_settled();
            report.outcomes.push((path, outcome));

            let rest = &gids[index + 1..];
            if !settled && !rest.is_empty() {
                report.abandoned = rest.iter().map(|g| current_path(&tree, *g)).collect();
                self.emit(ResolveEvent::Abandoned {
                    remaining: &report.abandoned,
                });
                break;
            }
        }
        Ok(report)
    }

    /// Fixes one issue.
    ///
    /// The tree is consumed because the lock may be released while the merge
    /// tool runs; the returned tree is the one to keep using.
    pub fn fix(&self, tree: PendingTree, gid: Gid) -> Result<(PendingTree, FixOutcome)> {
        let issue = tree
            .find_issue(gid)
            .cloned()
            .ok_or(TangleError::IssueVanished(gid))?;
        let path = tree.issue_path(&issue);
        self.emit(ResolveEvent::Issue(&issue.view(path.clone())));

        if issue.is_resolved() {
            return Ok((tree, FixOutcome::AlreadyResolved));
        }

        let mut tree = tree;
        let mut staged = None;

        if issue.has_content_conflict() {
            let step = match issue.content_merge_plan.as_slice() {
                [step] => step,
                steps => {
                    return Ok((
                        tree,
                        FixOutcome::Todo(format!(
                            "{} needs a {}-step content merge, which is not yet automated; {}",
                            path,
                            steps.len(),
                            MARK_HINT
                        )),
                    ))
                }
            };
            let files = StagedFiles::locate(&tree, &issue, step, &path)?;

            if step.status == MergeStepStatus::Successful {
                debug!(path = %path, "content already merged, skipping merge tool");
            } else {
                let (next, exit) = self.run_tool(tree, &files, &path)?;
                tree = next;
                if exit == MergeExit::Cancelled {
                    return Ok((tree, FixOutcome::Aborted));
                }

                let fresh = tree
                    .find_issue(gid)
                    .ok_or(TangleError::IssueVanished(gid))?;
                if fresh.is_resolved() {
                    info!(path = %path, "issue was resolved elsewhere while merging");
                    return Ok((tree, FixOutcome::LostRace));
                }
                tree.set_content_merge_step_status(gid, 0, MergeStepStatus::Successful)?;
                tree.save()?;
            }
            staged = Some(files);
        }

        if issue.needs_undelete() {
            return Ok((
                tree,
                FixOutcome::Todo(format!(
                    "{} was deleted on one side and changed on the other; restoring it is not yet automated; {}",
                    path, MARK_HINT
                )),
            ));
        }
        if issue.has_structural_conflict() {
            return Ok((
                tree,
                FixOutcome::Todo(format!(
                    "{} has conflicts that are not yet automated; {}",
                    path, MARK_HINT
                )),
            ));
        }

        let mut status = tree
            .find_issue(gid)
            .ok_or(TangleError::IssueVanished(gid))?
            .status;
        status.insert(IssueStatus::RESOLVED);
        tree.set_issue_status(gid, status)?;
        tree.save()?;
        info!(gid = %gid, path = %path, "issue resolved");

        if let Some(files) = staged {
            files.remove_inputs()?;
        }
        Ok((tree, FixOutcome::Resolved))
    }

    /// Runs the merge tool with the lock released, then reopens the tree.
    fn run_tool(
        &self,
        tree: PendingTree,
        files: &StagedFiles,
        path: &RepoPath,
    ) -> Result<(PendingTree, MergeExit)> {
        let external;
        let tool: &dyn MergeTool = match self.tool {
            Some(tool) => tool,
            None => {
                external = ExternalMergeTool::from_config(tree.config())?.ok_or_else(|| {
                    TangleError::MergeToolNotConfigured {
                        path: path.to_string(),
                    }
                })?;
                &external
            }
        };

        let invocation = MergeInvocation {
            result: files.result.clone(),
            mine: files.mine.clone(),
            ancestor: files.ancestor.clone(),
            other: files.other.clone(),
            repo_path: path.clone(),
        };

        self.emit(ResolveEvent::LaunchingTool { path });
        let workdir = tree.release();
        let exit = tool.merge(&invocation)?;
        let tree = PendingTree::open(&workdir)?;
        Ok((tree, exit))
    }
}

fn current_path(tree: &PendingTree, gid: Gid) -> RepoPath {
    match tree.find_issue(gid) {
        Some(issue) => tree.issue_path(issue),
        None => tree.repo_path_of(gid).unwrap_or_else(|_| RepoPath::root()),
    }
}

/// Disk locations of a content merge's inputs and output.
#[derive(Debug, Clone)]
struct StagedFiles {
    mine: PathBuf,
    other: PathBuf,
    ancestor: PathBuf,
    result: PathBuf,
}

impl StagedFiles {
    /// Inputs live in the parking directory; the single step's output is the
    /// real entry at its current path.
    fn locate(
        tree: &PendingTree,
        issue: &Issue,
        step: &ContentMergeStep,
        current: &RepoPath,
    ) -> Result<Self> {
        let parent = issue.gid_parent.ok_or_else(|| {
            TangleError::EntryNotFound(format!("parking directory for {}", current))
        })?;
        let parking = tree.repo_path_of(parent)?;
        let staged = |name: &str| -> Result<PathBuf> {
            Ok(tree.absolute_path(&parking.join(name)?))
        };

        Ok(Self {
            mine: staged(&step.mine_name)?,
            other: staged(&step.other_name)?,
            ancestor: staged(&step.ancestor_name)?,
            result: tree.absolute_path(current),
        })
    }

    /// Deletes mine, other and ancestor. The result is never touched.
    fn remove_inputs(&self) -> Result<()> {
        for path in [&self.mine, &self.other, &self.ancestor] {
            remove_staged(path)?;
        }
        Ok(())
    }
}

fn remove_staged(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "removed staged merge input");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
