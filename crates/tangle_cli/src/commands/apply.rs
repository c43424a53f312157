//! Apply a change plan to the working copy.

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::Path;
use tangle_core::{
    format_plan, format_stats, ExecuteProgressCallback, FormatOptions, MergeOutput, PendingTree,
};
use tracing::debug;

/// Apply the plan stored at `plan_path`, or just print it with `dry_run`.
///
/// Issues listed in the plan file are recorded once every step applied.
pub fn run(plan_path: &Path, dry_run: bool, verbose: bool) -> Result<()> {
    let json = fs::read_to_string(plan_path)
        .with_context(|| format!("Failed to read change plan {}", plan_path.display()))?;
    let output: MergeOutput = serde_json::from_str(&json)
        .with_context(|| format!("Invalid change plan {}", plan_path.display()))?;
    let plan = &output.plan;

    debug!(
        path = %plan_path.display(),
        steps = plan.len(),
        issues = output.issues.len(),
        "loaded change plan"
    );

    let options = FormatOptions { verbose };

    if dry_run {
        print!("{}", format_plan(plan, options));
        println!();
        println!("{} {}", style("→").cyan(), format_stats(&plan.stats()));
        if !output.issues.is_empty() {
            println!(
                "{} {} issues would be recorded",
                style("→").cyan(),
                output.issues.len()
            );
        }
        println!(
            "{} This was a dry run. Nothing in the working copy changed.",
            style("ℹ").blue()
        );
        return Ok(());
    }

    let cwd = std::env::current_dir()?;
    let mut tree = PendingTree::discover(&cwd)?;

    println!(
        "{} Applying {} steps to {}",
        style("→").cyan(),
        plan.len(),
        tree.workdir_top().display()
    );
    if verbose {
        print!("{}", format_plan(plan, options));
    }

    let pb = ProgressBar::new(plan.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg:20} [{bar:40.cyan/blue}] {pos}/{len}")
            .unwrap()
            .progress_chars("█▓▒░  "),
    );

    // Clone pb for the closure
    let pb_clone = pb.clone();
    let on_step: &ExecuteProgressCallback<'_> = &move |done, total, step| {
        pb_clone.set_length(total as u64);
        pb_clone.set_position(done as u64);
        pb_clone.set_message(step.action.kind().to_string());
    };
    let result = output.apply(&mut tree, Some(on_step));
    pb.finish_and_clear();

    let report = result?;

    println!(
        "{} Applied {} steps: {}",
        style("✓").green(),
        style(report.steps_applied).cyan(),
        format_stats(&plan.stats())
    );

    if !report.warnings.is_empty() {
        println!();
        println!("{}", style("Portability warnings:").yellow().bold());
        for warning in &report.warnings {
            println!("  {} {}", style("⚠").yellow(), warning);
        }
    }

    let unresolved = tree.issues().filter(|issue| !issue.is_resolved()).count();
    if unresolved > 0 {
        println!();
        println!(
            "{} {} unresolved issues. Run {} to fix them.",
            style("ℹ").blue(),
            unresolved,
            style("tangle resolve").cyan()
        );
    }

    Ok(())
}
