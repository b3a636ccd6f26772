//! # Bitbucket Backup Library
//!
//! This library clones a configured set of Bitbucket repositories into a
//! staging directory and, only when every clone succeeded, promotes the
//! staging directory to become the new backup. It backs the
//! `bitbucket-backup` command-line tool.
//!
//! ## Quick Example
//!
//! ```
//! use bitbucket_backup::config;
//! use bitbucket_backup::session::staging_dir_for;
//! use std::path::Path;
//!
//! let config = config::parse("[teamA]\nssh_key = teamA_key\nrepos = svc1,svc2\n").unwrap();
//! assert_eq!(config.repo_count(), 2);
//!
//! let staging = staging_dir_for(Path::new("./backups")).unwrap();
//! assert_eq!(staging, Path::new("./backups.new"));
//! ```
//!
//! ## Execution Flow
//!
//! 1.  **Configuration (`config`)**: Load workspaces, SSH keys and repository
//!     lists from an INI file.
//! 2.  **Session (`session`)**: Create the backup directory and a fresh staging
//!     directory next to it.
//! 3.  **Cloning (`orchestrator`, `repository`, `git`)**: Clone every repository
//!     into staging, one at a time, recording each outcome.
//! 4.  **Promotion (`session`)**: If nothing failed, remove the old backup and
//!     rename staging into its place.
//! 5.  **Cleanup (`session`)**: Remove whatever is left of staging, on every path.

pub mod config;
pub mod defaults;
pub mod error;
pub mod git;
pub mod orchestrator;
pub mod output;
pub mod repository;
pub mod session;

#[cfg(test)]
mod test_support;
