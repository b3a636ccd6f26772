//! # Staging Orchestrator
//!
//! Walks every `(workspace, repo)` pair of a [`Config`] in file order and
//! clones each one into the staging directory, one at a time.
//!
//! A failed clone does not stop the loop: every repository is attempted and
//! the outcome of each is recorded in a [`BackupReport`], so callers can say
//! exactly which repositories failed. The only early exit is a git binary
//! that cannot be started, which is returned as an error.

use std::path::Path;

use log::info;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::git::CloneStatus;
use crate::repository::RepoCloner;

/// What happened to one repository during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoOutcome {
    pub workspace: String,
    pub repo: String,
    pub status: CloneStatus,
}

impl RepoOutcome {
    /// `workspace/repo`, as used in messages.
    pub fn label(&self) -> String {
        format!("{}/{}", self.workspace, self.repo)
    }
}

/// Outcomes of every clone attempted in a run, in clone order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupReport {
    outcomes: Vec<RepoOutcome>,
}

impl BackupReport {
    pub fn outcomes(&self) -> &[RepoOutcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// True only if every attempted clone succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.status.is_success())
    }

    pub fn succeeded_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status.is_success())
            .count()
    }

    /// The outcomes that did not succeed.
    pub fn failures(&self) -> impl Iterator<Item = &RepoOutcome> {
        self.outcomes.iter().filter(|o| !o.status.is_success())
    }

    /// Turn a report with failures into [`Error::IncompleteBackup`].
    pub fn into_result(self) -> Result<BackupReport> {
        if self.all_succeeded() {
            return Ok(self);
        }
        let failed: Vec<String> = self.failures().map(RepoOutcome::label).collect();
        Err(Error::IncompleteBackup {
            failed: failed.len(),
            total: self.len(),
            repos: failed.join(", "),
        })
    }
}

/// Clone every configured repository into `staging_dir`.
pub fn run_all(config: &Config, cloner: &RepoCloner, staging_dir: &Path) -> Result<BackupReport> {
    run_all_with(config, cloner, staging_dir, |_| {})
}

/// Like [`run_all`], calling `on_outcome` after each clone attempt.
pub fn run_all_with<F>(
    config: &Config,
    cloner: &RepoCloner,
    staging_dir: &Path,
    mut on_outcome: F,
) -> Result<BackupReport>
where
    F: FnMut(&RepoOutcome),
{
    let mut report = BackupReport::default();

    for (workspace, repo) in config.repos() {
        let ssh_key = cloner.ssh_key_path(workspace);
        let status = cloner.clone(&workspace.name, repo, &ssh_key, staging_dir)?;

        let outcome = RepoOutcome {
            workspace: workspace.name.clone(),
            repo: repo.to_string(),
            status,
        };
        on_outcome(&outcome);
        report.outcomes.push(outcome);
    }

    info!(
        "{} of {} repositories cloned into {}",
        report.succeeded_count(),
        report.len(),
        staging_dir.display()
    );

    Ok(report)
}
