//! Resolve conflict issues.

use anyhow::Result;
use console::style;
use tangle_core::{
    FixOutcome, PendingTree, ResolveEvent, ResolveEventCallback, ResolveRequest, ResolveVerb,
    Resolver,
};

/// Run `tangle resolve` with the given flags and paths.
pub fn run(list: bool, listall: bool, mark: bool, markall: bool, paths: Vec<String>) -> Result<()> {
    let verb = ResolveVerb::from_flags(list, listall, mark, markall)?;
    let cwd = std::env::current_dir()?;
    let tree = PendingTree::discover(&cwd)?;

    let request = ResolveRequest {
        verb,
        targets: paths,
        cwd,
    };

    let on_event: &ResolveEventCallback<'_> = &print_event;
    let report = Resolver::new().with_events(on_event).run(tree, &request)?;

    match verb {
        ResolveVerb::List | ResolveVerb::ListAll => {
            if report.listed.is_empty() {
                println!("{} No issues.", style("✓").green());
            }
            for view in &report.listed {
                println!("{}", view);
            }
        }
        ResolveVerb::Mark | ResolveVerb::MarkAll => {
            if report.marked.is_empty() {
                println!("{} Nothing to mark.", style("✓").green());
            }
        }
        ResolveVerb::Fix => {
            if report.outcomes.is_empty() {
                println!("{} No unresolved issues.", style("✓").green());
                return Ok(());
            }
            let settled = report
                .outcomes
                .iter()
                .filter(|(_, outcome)| outcome.is_settled())
                .count();
            println!();
            println!(
                "{} {} of {} issues resolved",
                style("→").cyan(),
                style(settled).green(),
                report.outcomes.len() + report.abandoned.len()
            );
        }
    }

    Ok(())
}

fn print_event(event: &ResolveEvent<'_>) {
    match event {
        ResolveEvent::Issue(view) => {
            println!("{} {}", style("→").cyan(), view);
        }
        ResolveEvent::LaunchingTool { path } => {
            println!(
                "  Launching merge tool for {} (working copy unlocked)...",
                style(path).cyan()
            );
        }
        ResolveEvent::Fixed { path, outcome } => match outcome {
            FixOutcome::Resolved | FixOutcome::AlreadyResolved => {
                println!("  {} {}: {}", style("✓").green(), path, outcome);
            }
            FixOutcome::Aborted | FixOutcome::LostRace => {
                println!("  {} {}: {}", style("⚠").yellow(), path, outcome);
            }
            FixOutcome::Todo(message) => {
                println!("  {} {}", style("×").red(), message);
            }
        },
        ResolveEvent::Marked { path, already } => {
            if *already {
                println!("{} {} (already resolved)", style("✓").green(), path);
            } else {
                println!("{} {} marked resolved", style("✓").green(), path);
            }
        }
        ResolveEvent::Abandoned { remaining } => {
            println!();
            println!(
                "{} Stopping; {} issues left unresolved:",
                style("ℹ").blue(),
                remaining.len()
            );
            for path in remaining.iter() {
                println!("  {}", path);
            }
        }
    }
}
