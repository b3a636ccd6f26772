//! # Error Handling
//!
//! This module defines the centralized error type for `bitbucket-backup`.
//! It uses the `thiserror` library to describe every failure that aborts a
//! backup run, with enough context (paths, URLs, workspace names) to act on
//! the message without re-running under a debugger.
//!
//! ## What is *not* an error
//!
//! A `git clone` that runs and exits nonzero is recorded as a
//! [`CloneStatus::Failed`](crate::git::CloneStatus) value in the backup
//! report, and the remaining repositories are still cloned. Only when the
//! top-level flow decides not to promote does that become
//! [`Error::IncompleteBackup`].
//!
//! Everything else is fatal:
//!
//! - Configuration errors abort before any cloning.
//! - A `git` binary that cannot be started at all aborts the run.
//! - Staging and promotion filesystem failures abort the run. A promotion
//!   failure may happen after the previous backup was already removed.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for bitbucket-backup operations
#[derive(Error, Debug)]
pub enum Error {
    /// The configuration file could not be read or parsed, or is inconsistent.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// A workspace section lacks one of the required keys.
    #[error("Configuration error: workspace [{workspace}] is missing required key '{field}'")]
    ConfigMissingField { workspace: String, field: String },

    /// The external `git` process could not be started.
    #[error("Could not run git clone for {url}: {message}")]
    CloneInvocation { url: String, message: String },

    /// The derived staging directory exists but was not created by a backup run.
    #[error("Staging directory {} already exists and was not created by bitbucket-backup; refusing to touch it", path.display())]
    StagingCollision { path: PathBuf },

    /// The backup directory has no final component to derive a staging name from.
    #[error("Invalid backup directory {}: it must name a directory (not '/' or '..')", path.display())]
    InvalidBackupDir { path: PathBuf },

    /// Removing or renaming during promotion failed.
    #[error("Promotion failed to {operation} {}: {source}", path.display())]
    Promotion {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// At least one repository failed to clone, so nothing was promoted.
    #[error("Backup incomplete: {failed} of {total} repositories failed to clone ({repos}); previous backup left untouched")]
    IncompleteBackup {
        failed: usize,
        total: usize,
        repos: String,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn promotion(
        operation: impl Into<String>,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Error::Promotion {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
