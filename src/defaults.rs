//! Default values for bitbucket-backup.
//!
//! This module provides centralized default values used by the CLI and the
//! library, ensuring consistency and avoiding duplication.

use std::path::PathBuf;

use crate::error::Result;

/// SSH user and host every workspace is cloned from.
pub const REMOTE_HOST: &str = "git@bitbucket.org";

/// Directory that `ssh_key` filenames in the config are relative to.
pub const DEFAULT_KEYS_DIR: &str = "./keys";

/// Suffix appended to the backup directory name to form the staging directory.
pub const STAGING_SUFFIX: &str = ".new";

/// File written into a staging directory so later runs can recognize it.
pub const STAGING_MARKER: &str = ".bitbucket-backup-staging";

/// Name of the config file looked up next to the executable.
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Returns the default configuration file path.
///
/// This is `config.ini` in the directory containing the running executable,
/// so an installed binary and its config can be moved around together.
///
/// This can be overridden by the `--config` CLI flag or the
/// `BITBUCKET_BACKUP_CONFIG` environment variable.
pub fn default_config_path() -> Result<PathBuf> {
    let exe = std::env::current_exe()?;
    let dir = exe
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok(dir.join(CONFIG_FILE_NAME))
}
