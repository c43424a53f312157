//! Error types for tangle_core operations.

use crate::ids::Gid;
use std::path::PathBuf;
use thiserror::Error;

/// Core error type for tangle_core operations.
#[derive(Error, Debug)]
pub enum TangleError {
    /// Blob with the given hash was not found in the store.
    #[error("blob not found: {0}")]
    ObjectNotFound(String),

    /// Hash verification failed during blob read.
    #[error("hash mismatch: expected {expected}, got {actual}")]
    HashMismatch {
        /// The expected content hash
        expected: String,
        /// The actual computed hash
        actual: String,
    },

    /// The blob file is corrupted or has invalid format.
    #[error("corrupted blob at {}: {}", path.display(), reason)]
    CorruptedObject {
        /// Path to the corrupted blob
        path: PathBuf,
        /// Description of the corruption
        reason: String,
    },

    /// Invalid hex string for Hid parsing.
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    /// Invalid textual GID.
    #[error("invalid gid: {0}")]
    InvalidGid(String),

    /// Invalid repository path.
    #[error("invalid repo path '{path}': {reason}")]
    InvalidRepoPath {
        /// The offending path
        path: String,
        /// What is wrong with it
        reason: String,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Compression or decompression failed.
    #[error("compression error: {0}")]
    Compression(String),

    /// Blob exceeds maximum allowed size.
    #[error("blob too large: {size} bytes exceeds limit of {limit} bytes")]
    BlobTooLarge {
        /// Actual size of the blob
        size: usize,
        /// Maximum allowed size
        limit: usize,
    },

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The directory is not a working copy.
    #[error("not a working copy: {}", .0.display())]
    NotAWorkingCopy(PathBuf),

    /// A working copy already exists at the given directory.
    #[error("working copy already exists: {}", .0.display())]
    AlreadyInitialized(PathBuf),

    /// Pending tree is locked and the holder could not be identified.
    #[error("working copy locked by another process")]
    WorkingCopyLocked,

    /// Pending tree lock is held by a live process.
    #[error("working copy lock held by another process (PID: {pid})")]
    LockHeld {
        /// Process ID holding the lock
        pid: u32,
    },

    /// Pending-tree metadata is unreadable or inconsistent.
    #[error("pending tree corrupted: {reason}")]
    PendingTreeCorrupted {
        /// Description of the corruption
        reason: String,
    },

    /// Configuration error (loading, parsing, invalid values).
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// A required argument was empty or otherwise malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Command-line usage error (conflicting verbs, missing targets).
    #[error("usage: {0}")]
    Usage(String),

    /// No tracked entry exists for the given GID or path.
    #[error("entry not found: {0}")]
    EntryNotFound(String),

    /// The destination of a step is already occupied.
    #[error("path collision: {path} is already occupied")]
    PathCollision {
        /// The occupied path
        path: String,
    },

    /// A directory cannot be removed while it still has children.
    #[error("directory not empty: {path}")]
    DirectoryNotEmpty {
        /// The directory's repo path
        path: String,
    },

    /// A step does not match the current state of the pending tree.
    #[error("change step does not match working copy: {0}")]
    PlanMismatch(String),

    /// A change plan stopped part way; earlier steps remain applied.
    #[error("change plan interrupted at step {step} ({reason}): {source}")]
    PlanInterrupted {
        /// Zero-based index of the failing step
        step: usize,
        /// The failing step's reason string
        reason: String,
        /// The underlying failure
        #[source]
        source: Box<TangleError>,
    },

    /// A command argument does not name an entry with an issue.
    #[error("no issue found for {path}")]
    IssueNotFound {
        /// The argument as the user gave it
        path: String,
    },

    /// Two arguments name the same issue.
    #[error("{path} and {other} refer to the same item")]
    DuplicateTarget {
        /// The later argument
        path: String,
        /// The earlier argument naming the same issue
        other: String,
    },

    /// An issue disappeared while the pending tree was held.
    #[error("issue {0} disappeared from the pending tree")]
    IssueVanished(Gid),

    /// No external merge tool is configured.
    #[error("no merge tool configured to resolve {path}")]
    MergeToolNotConfigured {
        /// Current repo path of the affected item
        path: String,
    },

    /// The merge tool could not be launched.
    #[error("merge tool failed: {0}")]
    MergeToolFailed(String),

    /// Operation not available on this platform.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl TangleError {
    /// Returns a user-friendly recovery suggestion for the error, if available.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Self::MergeToolNotConfigured { .. } => Some(
                "Set merge/diffmerge/program in .tangle/config.toml, or fix the file manually and run 'tangle resolve --mark <path>'.",
            ),
            Self::LockHeld { .. } => {
                Some("Another tangle command is using this working copy. Wait for it to finish.")
            }
            Self::WorkingCopyLocked => Some(
                "Wait for the other process to finish, or remove .tangle/LOCK if the process is dead.",
            ),
            Self::NotAWorkingCopy(_) => Some("Run 'tangle init' to create a working copy."),
            Self::PlanInterrupted { .. } => Some(
                "The working copy is partially updated. Inspect it, fix the cause and apply again.",
            ),
            Self::IssueNotFound { .. } => {
                Some("Run 'tangle resolve --listall' to see items with issues.")
            }
            Self::CorruptedObject { .. } | Self::HashMismatch { .. } => {
                Some("The blob store is damaged. Fetch the content again from a peer.")
            }
            Self::PendingTreeCorrupted { .. } => {
                Some("Restore .tangle/pending.json from a backup before continuing.")
            }
            _ => None,
        }
    }
}

/// Convenience Result type for tangle_core operations.
pub type Result<T> = std::result::Result<T, TangleError>;
