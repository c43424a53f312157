//! Human-readable previews of change plans.

use super::stats::PlanStats;
use super::step::{Alteration, StepAction};
use super::ChangePlan;
use std::fmt::Write;

const LABEL_WIDTH: usize = 12;

/// Options for [`format_plan`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatOptions {
    /// Append each step's reason.
    pub verbose: bool,
}

/// Renders a plan, one or more lines per step, in plan order.
///
/// Moves whose source and destination are equal print nothing, though the
/// executor still runs them.
pub fn format_plan(plan: &ChangePlan, options: FormatOptions) -> String {
    let mut out = String::new();
    for step in plan.steps() {
        let mut lines: Vec<(&str, String)> = Vec::new();

        match &step.action {
            StepAction::MoveRename { source, dest, .. } => {
                if source != dest {
                    lines.push(("move/rename", format!("{} -> {}", source, dest)));
                }
            }
            StepAction::RemoveFile(e) => lines.push(("remove file", e.path.to_string())),
            StepAction::RemoveSymlink(e) => lines.push(("remove link", e.path.to_string())),
            StepAction::RemoveDirectory(e) => lines.push(("remove dir", e.path.to_string())),
            StepAction::AddNewDirectory(e) => lines.push(("add dir", e.path.to_string())),
            StepAction::UnaddNewDirectory(e) => lines.push(("unadd dir", e.path.to_string())),
            StepAction::GetFile { entry, .. } => lines.push(("get file", entry.dest.to_string())),
            StepAction::GetSymlink { entry, .. } => {
                lines.push(("get link", entry.dest.to_string()))
            }
            StepAction::GetDirectory(entry) => lines.push(("get dir", entry.dest.to_string())),
            StepAction::GetFileAutoMerge { entry, .. } => {
                lines.push(("auto-merge", entry.dest.to_string()))
            }
            StepAction::AlterFile { alter, content } => {
                alter_lines(&mut lines, alter, content.is_changed().then_some("modify file"));
            }
            StepAction::AlterSymlink { alter, target } => {
                alter_lines(&mut lines, alter, target.is_changed().then_some("modify link"));
            }
            StepAction::AlterDirectory(alter) => alter_lines(&mut lines, alter, None),
            StepAction::AlterFileAutoMerge { alter, .. } => {
                alter_lines(&mut lines, alter, Some("auto-merge"));
            }
            StepAction::MoveEntry { source, dest } => {
                if source != dest {
                    lines.push((
                        "park",
                        format!("{} -> {}", source.display(), dest.display()),
                    ));
                }
            }
        }

        for (label, text) in lines {
            let _ = write!(out, "{:<width$} {}", label, text, width = LABEL_WIDTH);
            if options.verbose {
                let _ = write!(out, "  ({})", step.reason);
            }
            out.push('\n');
        }
    }
    out
}

fn alter_lines(
    lines: &mut Vec<(&str, String)>,
    alter: &Alteration,
    content_label: Option<&'static str>,
) {
    if alter.path.is_changed() {
        lines.push((
            "move/rename",
            format!("{} -> {}", alter.path.old, alter.path.new),
        ));
    }
    if let Some(label) = content_label {
        lines.push((label, alter.path.new.to_string()));
    }
    if alter.attributes_changed() {
        let text = if alter.attrs.is_changed() {
            format!("{} {} -> {}", alter.path.new, alter.attrs.old, alter.attrs.new)
        } else {
            format!("{} (xattrs)", alter.path.new)
        };
        lines.push(("attrs", text));
    }
}

/// Renders the counters of a plan, skipping zeros.
pub fn format_stats(stats: &PlanStats) -> String {
    let counters = [
        ("files added", stats.files_added),
        ("files changed", stats.files_changed),
        ("files deleted", stats.files_deleted),
        ("files auto-merged", stats.files_auto_merged),
        ("dirs added", stats.dirs_added),
        ("dirs changed", stats.dirs_changed),
        ("dirs deleted", stats.dirs_deleted),
    ];
    let parts: Vec<String> = counters
        .iter()
        .filter(|(_, count)| *count > 0)
        .map(|(name, count)| format!("{} {}", count, name))
        .collect();

    if parts.is_empty() {
        "no changes".to_string()
    } else {
        parts.join(", ")
    }
}
