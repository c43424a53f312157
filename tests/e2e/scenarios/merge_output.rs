use crate::harness::plans::{get_dir, get_file, gid, path};
use crate::harness::{OutcomeMatch, Scenario};
use tangle_core::{ConflictFlags, ContentMergeStep, Issue, MergeStepStatus, ResolveVerb};

const CONFLICTED: &[u8] = b"<<<<<<< conflict\n";

/// Content conflict whose merge inputs are staged under @/.park.
fn parked_conflict(n: u128, at: &str, name: &str) -> Issue {
    let mut issue = Issue::new(gid(n), path(at));
    issue.conflict_flags = ConflictFlags::AUTO_CONFLICT;
    issue.gid_parent = Some(gid(900));
    issue.content_merge_plan.push(ContentMergeStep {
        mine_name: format!("{}~mine", name),
        other_name: format!("{}~other", name),
        ancestor_name: format!("{}~ancestor", name),
        result_name: format!("{}~result", name),
        status: MergeStepStatus::Pending,
    });
    issue
}

#[test]
fn test_plan_file_issues_reach_resolve() {
    let mut issue = Issue::new(gid(1), path("@/f.txt"));
    issue.conflict_flags = ConflictFlags::DELETE_VS_FILE_EDIT;

    Scenario::new("plan_file_issues_listed")
        .with_blob(b"kept\n")
        .apply_file(
            vec![("kept by the other side", get_file(1, "@/f.txt", b"kept\n"))],
            vec![issue],
        )
        .assert_file("@/f.txt", b"kept\n")
        .assert_unresolved("@/f.txt")
        .resolve(ResolveVerb::List, &[])
        .assert_listed(&["@/f.txt"])
        .resolve(ResolveVerb::Mark, &["f.txt"])
        .assert_resolved("@/f.txt")
        .assert_unresolved_count(0)
        .run()
        .unwrap();
}

#[test]
fn test_plan_file_without_issues_records_none() {
    Scenario::new("plan_file_without_issues")
        .with_blob(b"a")
        .apply_file(vec![("added", get_file(1, "@/a.txt", b"a"))], Vec::new())
        .assert_file("@/a.txt", b"a")
        .assert_unresolved_count(0)
        .run()
        .unwrap();
}

#[cfg(unix)]
#[test]
fn test_fix_conflict_staged_by_plan_file() {
    Scenario::new("fix_conflict_from_plan_file")
        .with_blob(CONFLICTED)
        .apply_file(
            vec![
                ("parking", get_dir(900, "@/.park")),
                ("edited on both sides", get_file(1, "@/f.txt", CONFLICTED)),
            ],
            vec![parked_conflict(1, "@/f.txt", "f.txt")],
        )
        .with_untracked(".park/f.txt~mine", b"mine")
        .with_untracked(".park/f.txt~other", b"other")
        .with_untracked(".park/f.txt~ancestor", b"ancestor")
        .merge_tool("printf MERGED > \"$2\"")
        .resolve(ResolveVerb::Fix, &[])
        .assert_outcomes(&[("@/f.txt", OutcomeMatch::Resolved)])
        .assert_file("@/f.txt", b"MERGED")
        .assert_file_missing("@/.park/f.txt~mine")
        .assert_resolved("@/f.txt")
        .run()
        .unwrap();
}
