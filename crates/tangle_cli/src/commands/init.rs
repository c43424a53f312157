//! Initialize a new working copy.

use anyhow::{Context, Result};
use console::style;
use tangle_core::{PendingTree, TANGLE_DIR};

/// Initialize a working copy in the current directory.
pub fn run() -> Result<()> {
    let tree = PendingTree::init(".").context("Failed to initialize working copy")?;

    println!(
        "{} Initialized tangle working copy in {}/",
        style("✓").green(),
        TANGLE_DIR
    );
    println!();
    println!("Directory structure:");
    println!("  {}/pending.json  - Pending tree and conflict issues", TANGLE_DIR);
    println!("  {}/blobs/        - Content-addressed blob storage", TANGLE_DIR);
    println!();
    println!("Configuration written to {}/config.toml", TANGLE_DIR);

    tree.release();
    Ok(())
}
