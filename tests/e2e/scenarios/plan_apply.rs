use crate::harness::plans::{
    add_dir, alter_file, auto_merge_file, get_dir, get_file, move_rename, remove_dir, remove_file,
};
use crate::harness::{Assertion, Scenario};
use tangle_core::PendingTree;

#[test]
fn test_new_tree_from_other_branch() {
    Scenario::new("new_tree_from_other_branch")
        .with_blob(b"fn main() {}\n")
        .apply(vec![
            ("directory added on other branch", get_dir(10, "@/src")),
            (
                "file added on other branch",
                get_file(11, "@/src/main.rs", b"fn main() {}\n"),
            ),
        ])
        .assert_entry("@/src", 10)
        .assert_entry("@/src/main.rs", 11)
        .assert_file("@/src/main.rs", b"fn main() {}\n")
        .reopen()
        .assert_entry("@/src/main.rs", 11)
        .run()
        .unwrap();
}

#[test]
fn test_vacate_before_occupy() {
    Scenario::new("vacate_before_occupy")
        .with_file(1, "@/x", b"A")
        .with_file(2, "@/z", b"B")
        .apply(vec![
            ("renamed on other branch", move_rename(1, "@/x", "@/y")),
            ("renamed on other branch", move_rename(2, "@/z", "@/x")),
        ])
        .assert_entry("@/y", 1)
        .assert_entry("@/x", 2)
        .assert_file("@/y", b"A")
        .assert_file("@/x", b"B")
        .assert_file_missing("@/z")
        .run()
        .unwrap();
}

#[test]
fn test_occupy_before_vacate_collides() {
    Scenario::new("occupy_before_vacate")
        .with_file(1, "@/x", b"A")
        .with_file(2, "@/z", b"B")
        .apply_fails_at(
            0,
            vec![
                ("renamed on other branch", move_rename(2, "@/z", "@/x")),
                ("renamed on other branch", move_rename(1, "@/x", "@/y")),
            ],
        )
        .assert_entry("@/x", 1)
        .assert_entry("@/z", 2)
        .assert_file("@/x", b"A")
        .run()
        .unwrap();
}

#[test]
fn test_swap_through_temporary_name() {
    Scenario::new("swap_through_temporary_name")
        .with_file(1, "@/a", b"first")
        .with_file(2, "@/b", b"second")
        .apply(vec![
            ("swap", move_rename(1, "@/a", "@/a~swap")),
            ("swap", move_rename(2, "@/b", "@/a")),
            ("swap", move_rename(1, "@/a~swap", "@/b")),
        ])
        .assert_file("@/a", b"second")
        .assert_file("@/b", b"first")
        .assert_no_entry("@/a~swap")
        .run()
        .unwrap();
}

#[test]
fn test_interrupted_plan_keeps_earlier_steps() {
    Scenario::new("interrupted_plan")
        .apply_fails_at(
            1,
            vec![
                ("directory added on other branch", get_dir(10, "@/docs")),
                ("deleted on other branch", remove_file(99, "@/ghost.txt")),
                ("never reached", add_dir(11, "@/later")),
            ],
        )
        .reopen()
        .assert_entry("@/docs", 10)
        .assert(Assertion::DirExists {
            path: "@/docs".into(),
        })
        .assert_no_entry("@/later")
        .run()
        .unwrap();
}

#[test]
fn test_delete_directory_after_contents() {
    Scenario::new("delete_directory_after_contents")
        .with_dir(1, "@/old")
        .with_file(2, "@/old/notes.txt", b"bye")
        .apply(vec![
            ("deleted on other branch", remove_file(2, "@/old/notes.txt")),
            ("deleted on other branch", remove_dir(1, "@/old")),
        ])
        .assert_no_entry("@/old")
        .assert_file_missing("@/old")
        .run()
        .unwrap();
}

#[test]
fn test_edit_and_auto_merge() {
    Scenario::new("edit_and_auto_merge")
        .with_file(1, "@/readme.md", b"v1")
        .with_blob(b"v2")
        .with_untracked("merge-result.tmp", b"merged by rule")
        .apply(vec![
            ("edited on other branch", alter_file(1, "@/readme.md", b"v1", b"v2")),
            (
                "added on both branches, merged by rule",
                auto_merge_file(2, "@/config.ini", "merge-result.tmp"),
            ),
        ])
        .assert_file("@/readme.md", b"v2")
        .assert_file("@/config.ini", b"merged by rule")
        .assert_entry("@/config.ini", 2)
        .assert(Assertion::Custom(Box::new(|tree: &mut PendingTree| {
            anyhow::ensure!(
                !tree.workdir_top().join("merge-result.tmp").exists(),
                "merge result should have been moved into place"
            );
            Ok(())
        })))
        .run()
        .unwrap();
}
