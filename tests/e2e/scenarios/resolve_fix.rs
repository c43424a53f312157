use crate::harness::plans::{gid, path};
use crate::harness::{OutcomeMatch, Scenario};
use tangle_core::{ConflictFlags, Issue, ResolveVerb};

#[cfg(unix)]
const MERGING_TOOL: &str = "printf MERGED > \"$2\"";
#[cfg(unix)]
const CANCELLING_TOOL: &str = "exit 1";

#[cfg(unix)]
#[test]
fn test_fix_content_conflict_with_merge_tool() {
    Scenario::new("fix_with_merge_tool")
        .with_content_conflict(1, "@/f.txt")
        .merge_tool(MERGING_TOOL)
        .resolve(ResolveVerb::Fix, &[])
        .assert_outcomes(&[("@/f.txt", OutcomeMatch::Resolved)])
        .assert_file("@/f.txt", b"MERGED")
        .assert_file_missing("@/.park/f.txt~mine~0")
        .assert_file_missing("@/.park/f.txt~other~0")
        .assert_file_missing("@/.park/f.txt~ancestor~0")
        .assert_resolved("@/f.txt")
        .assert_unresolved_count(0)
        .run()
        .unwrap();
}

#[cfg(unix)]
#[test]
fn test_fix_by_filesystem_path() {
    Scenario::new("fix_by_filesystem_path")
        .with_dir(1, "@/src")
        .with_content_conflict(2, "@/src/lib.rs")
        .with_content_conflict(3, "@/other.rs")
        .merge_tool(MERGING_TOOL)
        .resolve(ResolveVerb::Fix, &["src/lib.rs"])
        .assert_outcomes(&[("@/src/lib.rs", OutcomeMatch::Resolved)])
        .assert_resolved("@/src/lib.rs")
        .assert_unresolved("@/other.rs")
        .run()
        .unwrap();
}

#[cfg(unix)]
#[test]
fn test_cancelled_merge_changes_nothing() {
    Scenario::new("cancelled_merge")
        .with_content_conflict(1, "@/f.txt")
        .merge_tool(CANCELLING_TOOL)
        .resolve(ResolveVerb::Fix, &[])
        .assert_outcomes(&[("@/f.txt", OutcomeMatch::Aborted)])
        .assert_file("@/f.txt", b"<<<<<<< conflict\n")
        .assert_file("@/.park/f.txt~mine~0", b"mine")
        .assert_unresolved("@/f.txt")
        .run()
        .unwrap();
}

#[cfg(unix)]
#[test]
fn test_batch_stops_after_cancel() {
    Scenario::new("batch_stops_after_cancel")
        .with_content_conflict(1, "@/a.txt")
        .with_content_conflict(2, "@/b.txt")
        .merge_tool(CANCELLING_TOOL)
        .resolve(ResolveVerb::Fix, &[])
        .assert_outcomes(&[("@/a.txt", OutcomeMatch::Aborted)])
        .assert_abandoned(&["@/b.txt"])
        .assert_unresolved_count(2)
        .run()
        .unwrap();
}

#[cfg(unix)]
#[test]
fn test_fix_again_after_merge_succeeds() {
    Scenario::new("fix_again")
        .with_content_conflict(1, "@/f.txt")
        .merge_tool(MERGING_TOOL)
        .resolve(ResolveVerb::Fix, &["@/f.txt"])
        .resolve(ResolveVerb::Fix, &["@/f.txt"])
        .assert_outcomes(&[("@/f.txt", OutcomeMatch::AlreadyResolved)])
        .run()
        .unwrap();
}

#[test]
fn test_fix_without_merge_tool() {
    Scenario::new("fix_without_merge_tool")
        .with_content_conflict(1, "@/f.txt")
        .resolve_fails(ResolveVerb::Fix, &[], "no merge tool configured")
        .assert_unresolved("@/f.txt")
        .assert_file("@/.park/f.txt~other~0", b"other")
        .run()
        .unwrap();
}

#[test]
fn test_multi_step_merge_needs_manual_work() {
    Scenario::new("multi_step_merge")
        .with_multi_step_conflict(1, "@/f.txt", 2)
        .resolve(ResolveVerb::Fix, &[])
        .assert_outcomes(&[("@/f.txt", OutcomeMatch::Todo)])
        .assert_unresolved("@/f.txt")
        .resolve(ResolveVerb::Mark, &["@/f.txt"])
        .assert_resolved("@/f.txt")
        .run()
        .unwrap();
}

#[test]
fn test_structural_conflict_needs_manual_work() {
    let mut issue = Issue::new(gid(7), path("@/moved.txt"));
    issue.conflict_flags = ConflictFlags::DIVERGENT_MOVE;

    Scenario::new("structural_conflict")
        .with_issue(issue)
        .resolve(ResolveVerb::Fix, &[])
        .assert_outcomes(&[("@/moved.txt", OutcomeMatch::Todo)])
        .assert_unresolved("@/moved.txt")
        .run()
        .unwrap();
}
