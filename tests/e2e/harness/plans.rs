//! Shorthand for building change steps in scenarios.
//!
//! Entries are named by small integers turned into GIDs, and content by the
//! bytes whose hash it is. Scenarios must store those bytes first.

use tangle_core::{
    Alteration, Attrs, Change, EntryRef, Gid, Hid, NewEntry, RepoPath, StepAction,
};

pub fn gid(n: u128) -> Gid {
    Gid::from_u128(n)
}

pub fn path(s: &str) -> RepoPath {
    RepoPath::parse(s).unwrap_or_else(|e| panic!("bad repo path {:?}: {}", s, e))
}

fn entry_ref(n: u128, at: &str) -> EntryRef {
    EntryRef {
        gid: gid(n),
        path: path(at),
    }
}

fn new_entry(n: u128, dest: &str) -> NewEntry {
    NewEntry {
        gid: gid(n),
        dest: path(dest),
        attrs: Attrs::NONE,
        xattrs: None,
    }
}

pub fn move_rename(n: u128, source: &str, dest: &str) -> StepAction {
    StepAction::MoveRename {
        gid: gid(n),
        source: path(source),
        dest: path(dest),
    }
}

pub fn remove_file(n: u128, at: &str) -> StepAction {
    StepAction::RemoveFile(entry_ref(n, at))
}

pub fn remove_dir(n: u128, at: &str) -> StepAction {
    StepAction::RemoveDirectory(entry_ref(n, at))
}

pub fn add_dir(n: u128, at: &str) -> StepAction {
    StepAction::AddNewDirectory(entry_ref(n, at))
}

pub fn get_file(n: u128, dest: &str, content: &[u8]) -> StepAction {
    StepAction::GetFile {
        entry: new_entry(n, dest),
        content: Hid::for_content(content),
    }
}

/// Places a merge result, given relative to the working-copy top.
pub fn auto_merge_file(n: u128, dest: &str, merge_result: &str) -> StepAction {
    StepAction::GetFileAutoMerge {
        entry: new_entry(n, dest),
        merge_result: merge_result.into(),
    }
}

pub fn get_dir(n: u128, dest: &str) -> StepAction {
    StepAction::GetDirectory(new_entry(n, dest))
}

/// Rewrites a file in place.
pub fn alter_file(n: u128, at: &str, old: &[u8], new: &[u8]) -> StepAction {
    StepAction::AlterFile {
        alter: Alteration {
            gid: gid(n),
            path: Change::same(path(at)),
            attrs: Change::same(Attrs::NONE),
            xattrs: Change::same(None),
        },
        content: Change::new(Hid::for_content(old), Hid::for_content(new)),
    }
}
