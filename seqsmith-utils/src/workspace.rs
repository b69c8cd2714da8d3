/// Temp workspace management for external tool invocations.
/// Every subprocess run gets its own directory; the directory is removed on
/// drop unless preservation was requested or the run was marked failed.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Configuration for workspace behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Root directory under which workspaces are created
    pub root: PathBuf,
    /// Whether to preserve the workspace on failure (for debugging)
    pub preserve_on_failure: bool,
    /// Whether to preserve the workspace always (for inspection)
    pub preserve_always: bool,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: seqsmith_core::Config::global().workspace_dir(),
            preserve_on_failure: std::env::var("SEQSMITH_PRESERVE_ON_FAILURE").is_ok(),
            preserve_always: std::env::var("SEQSMITH_PRESERVE_ALWAYS").is_ok(),
        }
    }
}

/// A single workspace instance
#[derive(Debug)]
pub struct TempWorkspace {
    /// Unique identifier for this workspace
    pub id: String,
    /// Root path of this workspace
    pub root: PathBuf,
    config: WorkspaceConfig,
    had_error: bool,
}

impl TempWorkspace {
    /// Create a new workspace with a unique ID
    pub fn new(command: &str) -> Result<Self> {
        Self::with_config(command, WorkspaceConfig::default())
    }

    /// Create a new workspace with custom configuration
    pub fn with_config(command: &str, config: WorkspaceConfig) -> Result<Self> {
        fs::create_dir_all(&config.root)
            .with_context(|| format!("Failed to create workspace root: {:?}", config.root))?;

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let id = format!("seqsmith_{}_{}_{}", command, timestamp, Uuid::new_v4());

        let root = config.root.join(&id);
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create workspace: {:?}", root))?;

        tracing::debug!(workspace = %root.display(), "created temp workspace");

        Ok(Self {
            id,
            root,
            config,
            had_error: false,
        })
    }

    /// Path of a file inside the workspace
    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Write bytes to a file inside the workspace and return its path
    pub fn write_file(&self, name: &str, contents: &[u8]) -> Result<PathBuf> {
        let path = self.path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)
            .with_context(|| format!("Failed to write workspace file: {:?}", path))?;
        Ok(path)
    }

    /// Read a workspace file to a string
    pub fn read_file(&self, name: &str) -> Result<String> {
        let path = self.path(name);
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read workspace file: {:?}", path))
    }

    /// Mark the workspace as failed so it survives teardown when
    /// preserve_on_failure is set
    pub fn mark_failed(&mut self) {
        self.had_error = true;
    }

    fn should_preserve(&self) -> bool {
        self.config.preserve_always || (self.had_error && self.config.preserve_on_failure)
    }
}

impl Drop for TempWorkspace {
    fn drop(&mut self) {
        if self.should_preserve() {
            tracing::info!(workspace = %self.root.display(), "preserving workspace");
            return;
        }
        if let Err(e) = fs::remove_dir_all(&self.root) {
            tracing::warn!(workspace = %self.root.display(), error = %e,
                "failed to remove temp workspace");
        }
    }
}

/// Locate a file produced by a tool run, trying several candidate names.
pub fn find_output(root: &Path, candidates: &[&str]) -> Option<PathBuf> {
    candidates
        .iter()
        .map(|name| root.join(name))
        .find(|p| p.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(dir: &Path) -> WorkspaceConfig {
        WorkspaceConfig {
            root: dir.to_path_buf(),
            preserve_on_failure: false,
            preserve_always: false,
        }
    }

    #[test]
    fn test_workspace_created_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let root;
        {
            let ws = TempWorkspace::with_config("blast", test_config(dir.path())).unwrap();
            root = ws.root.clone();
            assert!(root.is_dir());
            assert!(ws.id.starts_with("seqsmith_blast_"));
        }
        assert!(!root.exists());
    }

    #[test]
    fn test_write_and_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let ws = TempWorkspace::with_config("test", test_config(dir.path())).unwrap();
        ws.write_file("query.fa", b">a\nACGT\n").unwrap();
        assert_eq!(ws.read_file("query.fa").unwrap(), ">a\nACGT\n");
    }

    #[test]
    fn test_preserve_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.preserve_on_failure = true;
        let root;
        {
            let mut ws = TempWorkspace::with_config("raxml", config).unwrap();
            ws.mark_failed();
            root = ws.root.clone();
        }
        assert!(root.exists());
    }

    #[test]
    fn test_find_output() {
        let dir = tempfile::tempdir().unwrap();
        let ws = TempWorkspace::with_config("phyml", test_config(dir.path())).unwrap();
        ws.write_file("input_phyml_tree.txt", b"(a,b);").unwrap();
        let found = find_output(&ws.root, &["input_phyml_tree", "input_phyml_tree.txt"]);
        assert_eq!(found, Some(ws.path("input_phyml_tree.txt")));
    }
}
