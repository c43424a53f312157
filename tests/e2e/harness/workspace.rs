use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tangle_core::{Config, PendingTree, TANGLE_DIR};
use tempfile::TempDir;

/// Manages isolated test environments with tempfile
pub struct TestWorkspace {
    dir: TempDir,
    /// Merge tool scripts live outside the working copy.
    tools: TempDir,
}

impl TestWorkspace {
    /// Create an empty workspace
    pub fn empty() -> Result<Self> {
        let dir = TempDir::new().context("Failed to create temp directory")?;
        let tools = TempDir::new().context("Failed to create tools directory")?;
        Ok(Self { dir, tools })
    }

    /// Get workspace path
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Directory outside the working copy for scripts and plan files
    pub fn tools_path(&self) -> &Path {
        self.tools.path()
    }

    /// Initialize a working copy in the workspace
    pub fn init_tree(&self) -> Result<PendingTree> {
        Ok(PendingTree::init(self.path())?)
    }

    /// Open the existing working copy
    pub fn open_tree(&self) -> Result<PendingTree> {
        Ok(PendingTree::open(self.path())?)
    }

    /// Write file to workspace, creating parent directories
    pub fn write_file(&self, path: &str, content: &[u8]) -> Result<()> {
        let full_path = self.path().join(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directories for {}", path))?;
        }

        fs::write(&full_path, content)
            .with_context(|| format!("Failed to write file: {}", path))?;

        Ok(())
    }

    /// Read file from workspace
    pub fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.path().join(path);
        fs::read(&full_path).with_context(|| format!("Failed to read file: {}", path))
    }

    /// Check if file exists
    pub fn file_exists(&self, path: &str) -> bool {
        self.path().join(path).exists()
    }

    /// Rewrites the working copy's config. The tree must be closed.
    pub fn update_config(&self, edit: impl FnOnce(&mut Config)) -> Result<()> {
        let tangle_dir = self.path().join(TANGLE_DIR);
        let mut config = Config::load(&tangle_dir)?;
        edit(&mut config);
        config.save(&tangle_dir)?;
        Ok(())
    }

    /// Writes an executable shell script and returns its path.
    #[cfg(unix)]
    pub fn write_script(&self, name: &str, body: &str) -> Result<PathBuf> {
        use std::os::unix::fs::PermissionsExt;

        let path = self.tools.path().join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body))
            .with_context(|| format!("Failed to write script: {}", name))?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
        Ok(path)
    }
}
