//! # Repository Cloning
//!
//! This module provides the `RepoCloner`, which turns a `(workspace, repo)`
//! pair from the configuration into a `git clone` inside the staging
//! directory.
//!
//! ## Design
//!
//! The actual process invocation sits behind the **`GitOperations`** trait.
//! `DefaultGitOperations` shells out to the system `git` binary; tests swap
//! in mock implementations to simulate successes, failures and missing
//! binaries without touching the network.
//!
//! `RepoCloner` owns the policy around a single clone:
//!
//! - The remote URL is built from the fixed Bitbucket host template.
//! - The SSH key is resolved relative to the keys directory.
//! - The clone lands in `<staging>/<repo>`.
//! - If git fails and leaves a directory behind that was not there before,
//!   it is removed so a failed clone leaves no subtree in staging.

use std::path::{Path, PathBuf};

use log::warn;

use crate::config::Workspace;
use crate::defaults::DEFAULT_KEYS_DIR;
use crate::error::Result;
use crate::git::{self, CloneStatus};

/// Trait for git operations - allows mocking in tests
pub trait GitOperations {
    /// Clones `url` into `target_dir`, authenticating with `ssh_key`.
    ///
    /// Returns `Err` only when git cannot be invoked at all.
    fn clone_repo(&self, url: &str, target_dir: &Path, ssh_key: &Path) -> Result<CloneStatus>;
}

/// The default implementation of `GitOperations`, which runs the system's
/// `git` command.
pub struct DefaultGitOperations {
    git_executable: String,
}

impl DefaultGitOperations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific git binary instead of the one found on `PATH`.
    pub fn with_executable(executable: impl Into<String>) -> Self {
        Self {
            git_executable: executable.into(),
        }
    }
}

impl Default for DefaultGitOperations {
    fn default() -> Self {
        Self {
            git_executable: "git".to_string(),
        }
    }
}

impl GitOperations for DefaultGitOperations {
    fn clone_repo(&self, url: &str, target_dir: &Path, ssh_key: &Path) -> Result<CloneStatus> {
        git::clone_with_identity(&self.git_executable, url, target_dir, ssh_key)
    }
}

/// Clones individual repositories into a staging directory.
pub struct RepoCloner {
    git_ops: Box<dyn GitOperations>,
    keys_dir: PathBuf,
}

impl RepoCloner {
    /// Creates a `RepoCloner` using the system git and the given keys directory.
    pub fn new(keys_dir: impl Into<PathBuf>) -> Self {
        Self::with_operations(Box::new(DefaultGitOperations::new()), keys_dir)
    }

    /// Creates a `RepoCloner` with a custom `GitOperations` implementation.
    pub fn with_operations(git_ops: Box<dyn GitOperations>, keys_dir: impl Into<PathBuf>) -> Self {
        Self {
            git_ops,
            keys_dir: keys_dir.into(),
        }
    }

    pub fn keys_dir(&self) -> &Path {
        &self.keys_dir
    }

    /// Full path of the SSH identity used for a workspace.
    pub fn ssh_key_path(&self, workspace: &Workspace) -> PathBuf {
        self.keys_dir.join(&workspace.ssh_key)
    }

    /// Clone one repository of `workspace` into `staging_dir/repo`.
    ///
    /// A nonzero git exit is logged and returned as `CloneStatus::Failed`.
    /// Only a git binary that cannot be started is an error.
    pub fn clone(
        &self,
        workspace: &str,
        repo: &str,
        ssh_key: &Path,
        staging_dir: &Path,
    ) -> Result<CloneStatus> {
        let url = git::remote_url(workspace, repo);
        let target_dir = staging_dir.join(repo);
        let existed = target_dir.exists();

        if !ssh_key.is_file() {
            warn!(
                "SSH key {} for workspace {} not found; trying anyway",
                ssh_key.display(),
                workspace
            );
        }

        let status = self.git_ops.clone_repo(&url, &target_dir, ssh_key)?;

        if let CloneStatus::Failed { reason } = &status {
            warn!("Clone of {} failed: {}", url, reason);
            if !existed && target_dir.exists() {
                if let Err(e) = std::fs::remove_dir_all(&target_dir) {
                    warn!(
                        "Could not remove partial clone {}: {}",
                        target_dir.display(),
                        e
                    );
                }
            }
        }

        Ok(status)
    }
}

impl Default for RepoCloner {
    fn default() -> Self {
        Self::new(DEFAULT_KEYS_DIR)
    }
}
