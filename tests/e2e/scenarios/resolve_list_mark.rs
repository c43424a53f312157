use crate::harness::plans::{gid, path};
use crate::harness::Scenario;
use tangle_core::{CollisionFlags, Issue, ResolveVerb};

#[test]
fn test_list_shows_unresolved_in_path_order() {
    Scenario::new("list_unresolved")
        .with_content_conflict(1, "@/z.txt")
        .with_content_conflict(2, "@/a.txt")
        .with_content_conflict(3, "@/m.txt")
        .resolve(ResolveVerb::Mark, &["@/m.txt"])
        .resolve(ResolveVerb::List, &[])
        .assert_listed(&["@/a.txt", "@/z.txt"])
        .resolve(ResolveVerb::ListAll, &[])
        .assert_listed(&["@/a.txt", "@/m.txt", "@/z.txt"])
        .run()
        .unwrap();
}

#[test]
fn test_list_named_issue_regardless_of_status() {
    Scenario::new("list_named")
        .with_content_conflict(1, "@/a.txt")
        .resolve(ResolveVerb::MarkAll, &[])
        .resolve(ResolveVerb::List, &["@/a.txt"])
        .assert_listed(&["@/a.txt"])
        .run()
        .unwrap();
}

#[test]
fn test_mark_requires_targets() {
    Scenario::new("mark_requires_targets")
        .with_content_conflict(1, "@/a.txt")
        .resolve_fails(ResolveVerb::Mark, &[], "--mark needs at least one path")
        .assert_unresolved("@/a.txt")
        .run()
        .unwrap();
}

#[test]
fn test_markall_resolves_everything() {
    let mut collision = Issue::new(gid(5), path("@/dup.txt"));
    collision.collision_flags = CollisionFlags::NAME_COLLISION;

    Scenario::new("markall")
        .with_content_conflict(1, "@/a.txt")
        .with_issue(collision)
        .resolve(ResolveVerb::MarkAll, &[])
        .assert_marked(&["@/a.txt", "@/dup.txt"])
        .assert_unresolved_count(0)
        .reopen()
        .assert_unresolved_count(0)
        .run()
        .unwrap();
}

#[test]
fn test_mark_already_resolved_is_harmless() {
    Scenario::new("mark_twice")
        .with_content_conflict(1, "@/a.txt")
        .resolve(ResolveVerb::Mark, &["@/a.txt"])
        .resolve(ResolveVerb::Mark, &["a.txt"])
        .assert_marked(&["@/a.txt"])
        .assert_resolved("@/a.txt")
        .run()
        .unwrap();
}

#[test]
fn test_unknown_and_duplicate_targets() {
    Scenario::new("bad_targets")
        .with_content_conflict(1, "@/a.txt")
        .resolve_fails(ResolveVerb::Mark, &["@/nope.txt"], "no issue found for @/nope.txt")
        .resolve_fails(
            ResolveVerb::Mark,
            &["@/a.txt", "./a.txt"],
            "refer to the same item",
        )
        .assert_unresolved("@/a.txt")
        .run()
        .unwrap();
}
