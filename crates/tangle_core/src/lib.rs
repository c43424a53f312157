//! Tangle Core Library
//!
//! The working-copy side of merging in tangle:
//! - Change plans that turn a computed merge into working-copy mutations
//! - An executor that applies them to the pending tree, the disk and the blob store
//! - Conflict issues for whatever the merge could not settle
//! - A resolve workflow that drives issues to resolved, using an external merge tool
//!
//! # Quick Start
//!
//! ```
//! use tangle_core::{Attrs, ChangePlan, Gid, NewEntry, PendingTree, RepoPath, StepAction};
//! use tempfile::TempDir;
//!
//! let tmp = TempDir::new().unwrap();
//! let mut tree = PendingTree::init(tmp.path()).unwrap();
//! let content = tree.blob_store().put_blob(b"hello").unwrap();
//!
//! let mut plan = ChangePlan::new();
//! plan.push(
//!     "added on the other branch",
//!     StepAction::GetFile {
//!         entry: NewEntry {
//!             gid: Gid::new(),
//!             dest: RepoPath::parse("@/hello.txt").unwrap(),
//!             attrs: Attrs::NONE,
//!             xattrs: None,
//!         },
//!         content,
//!     },
//! )
//! .unwrap();
//!
//! plan.execute(&mut tree).unwrap();
//! assert_eq!(std::fs::read(tmp.path().join("hello.txt")).unwrap(), b"hello");
//! ```
//!
//! # Ordering
//!
//! Plans are never reordered. The producer of a plan encodes dependencies
//! in step order: an entry leaves a name before another entry takes it, and
//! a directory exists before anything is placed in it.
//!
//! # Locking
//!
//! An open [`PendingTree`] holds the working-copy lock. The resolve workflow
//! gives it up while an external merge tool runs and re-reads the issue
//! afterwards, reporting [`FixOutcome::LostRace`] if another process
//! resolved it in the meantime.

mod flags;

mod attrs;
mod blob_store;
mod config;
mod error;
mod ids;
mod issue;
mod lock;
mod pending_tree;
mod plan;
mod portability;
mod repo_path;
mod resolve;

pub use attrs::{apply_attrs, apply_xattrs, Attrs, XattrOutcome, XattrSet};
pub use blob_store::{BlobStore, DEFAULT_COMPRESSION_LEVEL};
pub use config::{Config, DiffMergeConfig, MergeConfig, StorageConfig, MERGE_TOOL_PROGRAM_KEY};
pub use error::{Result, TangleError};
pub use ids::{Gid, Hid};
pub use issue::{
    CollisionFlags, ConflictFlags, ContentMergeStep, Issue, IssueStatus, IssueView,
    MergeStepStatus,
};
pub use lock::LockGuard;
pub use pending_tree::{Entry, EntryKind, PendingTree, TANGLE_DIR};
pub use plan::executor::ExecuteProgressCallback;
pub use plan::{
    format_plan, format_stats, Alteration, Change, ChangePlan, ChangeStep, EntryRef,
    ExecuteReport, FormatOptions, MergeOutput, NewEntry, PlanExecutor, PlanStats, StepAction,
};
pub use portability::{check_name, PortabilityFlags, PortabilityWarning};
pub use repo_path::RepoPath;
pub use resolve::{
    resolve_targets, select_all, ExternalMergeTool, FixOutcome, MergeExit, MergeInvocation,
    MergeTool, ResolveEvent, ResolveEventCallback, ResolveReport, ResolveRequest, ResolveVerb,
    Resolver, StatusFilter,
};
