//! # Backup Session and Promotion
//!
//! A [`BackupSession`] owns the two directories involved in a run:
//!
//! - `backup_dir`, the final destination holding one directory per repository.
//! - `staging_dir`, always `<backup_dir>.new`, where the fresh clones are made.
//!
//! ## Lifecycle
//!
//! 1. [`BackupSession::open`] creates `backup_dir` if needed and a fresh,
//!    marked `staging_dir`. A leftover staging directory carrying the marker is
//!    residue from an interrupted run and is removed first. An unmarked one is
//!    somebody else's data and opening fails.
//! 2. The caller clones into `staging_dir`.
//! 3. Only if every clone succeeded, [`BackupSession::promote`] swaps staging
//!    into place.
//! 4. [`BackupSession::cleanup`] removes whatever is left of `staging_dir`.
//!
//! [`with_session`] wraps steps 1 and 4 around a closure so cleanup runs on
//! every path out of the closure, including errors.
//!
//! ## Promotion is not atomic
//!
//! The previous backup is deleted before the rename. If the rename then
//! fails, the old backup is gone and the new one is still in staging (until
//! cleanup removes it).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::defaults::{STAGING_MARKER, STAGING_SUFFIX};
use crate::error::{Error, Result};

/// Where a single staged repository is moved during promotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepoTarget {
    /// Replace `backup_dir/<repo>` with `staging_dir/<repo>`.
    #[default]
    Subtree,
    /// Historical behavior: remove `backup_dir/<repo>`, then rename
    /// `staging_dir/<repo>` onto `backup_dir` itself. This only succeeds when
    /// nothing else is left in `backup_dir`, and then the repository's
    /// contents become the backup root.
    Root,
}

/// What to promote once staging is complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromotionTarget {
    /// Replace the whole backup directory with the staging directory.
    All,
    /// Replace a single repository.
    Repo { name: String, target: RepoTarget },
}

/// Derive the staging directory for a backup directory: a sibling named
/// `<basename>.new`.
pub fn staging_dir_for(backup_dir: &Path) -> Result<PathBuf> {
    let name = backup_dir
        .file_name()
        .ok_or_else(|| Error::InvalidBackupDir {
            path: backup_dir.to_path_buf(),
        })?;
    let mut staging_name = name.to_os_string();
    staging_name.push(STAGING_SUFFIX);

    Ok(match backup_dir.parent() {
        Some(parent) => parent.join(staging_name),
        None => PathBuf::from(staging_name),
    })
}

/// The backup and staging directories of one run.
#[derive(Debug)]
pub struct BackupSession {
    backup_dir: PathBuf,
    staging_dir: PathBuf,
    cleaned_up: bool,
}

impl BackupSession {
    /// Prepare `backup_dir` and a fresh staging directory next to it.
    pub fn open(backup_dir: impl Into<PathBuf>) -> Result<Self> {
        let backup_dir = backup_dir.into();
        let staging_dir = staging_dir_for(&backup_dir)?;

        if !backup_dir.exists() {
            info!("Creating backup dir: {}", backup_dir.display());
            fs::create_dir_all(&backup_dir)?;
        }

        if staging_dir.exists() {
            if !staging_dir.join(STAGING_MARKER).is_file() {
                return Err(Error::StagingCollision { path: staging_dir });
            }
            warn!(
                "Removing stale staging dir from an interrupted run: {}",
                staging_dir.display()
            );
            fs::remove_dir_all(&staging_dir)?;
        }

        create_marked_staging(&staging_dir)?;
        info!("Staging clones in {}", staging_dir.display());

        Ok(Self {
            backup_dir,
            staging_dir,
            cleaned_up: false,
        })
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Replace the previous backup (or one repository of it) with the staged
    /// clones.
    ///
    /// The old content is removed before the rename. A failing rename is
    /// reported as [`Error::Promotion`] and is not rolled back.
    pub fn promote(&mut self, target: &PromotionTarget) -> Result<()> {
        match target {
            PromotionTarget::All => self.promote_all(),
            PromotionTarget::Repo { name, target } => self.promote_repo(name, *target),
        }
    }

    fn promote_all(&mut self) -> Result<()> {
        remove_tree(&self.backup_dir)?;

        // Staging keeps its marker until the old backup is gone.
        let marker = self.staging_dir.join(STAGING_MARKER);
        match fs::remove_file(&marker) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::promotion("remove staging marker", marker, e)),
        }

        info!(
            "Renaming {} to {}",
            self.staging_dir.display(),
            self.backup_dir.display()
        );
        fs::rename(&self.staging_dir, &self.backup_dir)
            .map_err(|e| Error::promotion("rename staging dir", &self.staging_dir, e))
    }

    fn promote_repo(&mut self, name: &str, target: RepoTarget) -> Result<()> {
        let staged = self.staging_dir.join(name);
        if !staged.is_dir() {
            return Err(Error::promotion(
                "find staged repository",
                staged,
                io::Error::new(io::ErrorKind::NotFound, "repository was not staged"),
            ));
        }

        remove_tree(&self.backup_dir.join(name))?;

        let destination = match target {
            RepoTarget::Subtree => self.backup_dir.join(name),
            RepoTarget::Root => {
                warn!(
                    "Promoting {} onto the backup root {} itself",
                    name,
                    self.backup_dir.display()
                );
                self.backup_dir.clone()
            }
        };

        info!(
            "Renaming {} to {}",
            staged.display(),
            destination.display()
        );
        fs::rename(&staged, &destination)
            .map_err(|e| Error::promotion("rename staged repository", &staged, e))
    }

    /// Remove the staging directory if it still exists. Safe to call twice.
    pub fn cleanup(&mut self) -> Result<()> {
        if self.staging_dir.exists() {
            info!("Removing staging dir: {}", self.staging_dir.display());
            fs::remove_dir_all(&self.staging_dir)?;
        }
        self.cleaned_up = true;
        Ok(())
    }
}

impl Drop for BackupSession {
    fn drop(&mut self) {
        if self.cleaned_up {
            return;
        }
        if let Err(e) = self.cleanup() {
            warn!(
                "Could not remove staging dir {}: {}",
                self.staging_dir.display(),
                e
            );
        }
    }
}

/// Open a session on `backup_dir`, run `f`, then clean up staging no matter
/// how `f` returned.
///
/// If both `f` and cleanup fail, the cleanup failure is logged and `f`'s
/// error is returned.
pub fn with_session<T, F>(backup_dir: impl Into<PathBuf>, f: F) -> Result<T>
where
    F: FnOnce(&mut BackupSession) -> Result<T>,
{
    let mut session = BackupSession::open(backup_dir)?;
    let result = f(&mut session);
    let cleanup = session.cleanup();

    match (result, cleanup) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(cleanup_err)) => {
            warn!(
                "Could not remove staging dir {}: {}",
                session.staging_dir().display(),
                cleanup_err
            );
            Err(e)
        }
    }
}

/// Create `staging_dir` and write the marker into it. A staging directory
/// that could not be marked is removed again.
fn create_marked_staging(staging_dir: &Path) -> Result<()> {
    fs::create_dir_all(staging_dir)?;
    let written = fs::write(
        staging_dir.join(STAGING_MARKER),
        "staging directory of bitbucket-backup; safe to delete when no backup is running\n",
    );
    if let Err(e) = written {
        if let Err(cleanup_err) = fs::remove_dir_all(staging_dir) {
            warn!(
                "Could not remove unmarked staging dir {}: {}",
                staging_dir.display(),
                cleanup_err
            );
        }
        return Err(e.into());
    }
    Ok(())
}

fn remove_tree(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    info!("Removing backup dir: {}", path.display());
    fs::remove_dir_all(path).map_err(|e| Error::promotion("remove", path, e))
}
