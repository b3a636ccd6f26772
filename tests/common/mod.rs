//! Shared test utilities for E2E tests.
//!
//! The fixture builds a throwaway working directory with a `config.ini`, a
//! `keys/` directory and a fake `git` executable that is put first on `PATH`,
//! so the real binary can be driven end to end without network access.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_config(configs::TEAM_A);
//!     fixture.command().assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_fs::prelude::*;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::configs;
    pub use super::TestFixture;
}

/// Common configuration snippets for testing.
#[allow(dead_code)]
pub mod configs {
    /// One workspace with two repositories.
    pub const TEAM_A: &str = "[teamA]\nssh_key = teamA_key\nrepos = svc1,svc2\n";

    /// Same workspace, but the fake git fails for `fail-svc`.
    pub const TEAM_A_WITH_FAILURE: &str =
        "[teamA]\nssh_key = teamA_key\nrepos = svc1,fail-svc,svc3\n";

    /// Two workspaces with separate keys.
    pub const TWO_WORKSPACES: &str = r#"
[teamA]
ssh_key = teamA_key
repos = svc1,svc2

[teamB]
ssh_key = teamB_key
repos = tools
"#;
}

/// Fake `git clone <url> <dest>`, logging each call to `bin/git.log`.
const FAKE_GIT: &str = include_str!("../fixtures/fake-git.sh");

/// A temporary working directory laid out like a real installation.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a fixture with `keys/` and a fake `git` in `bin/`.
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        temp_dir
            .child("keys/teamA_key")
            .write_str("not a real key")
            .expect("Failed to write key");
        temp_dir
            .child("keys/teamB_key")
            .write_str("not a real key")
            .expect("Failed to write key");

        let git = temp_dir.child("bin/git");
        git.write_str(FAKE_GIT).expect("Failed to write fake git");
        make_executable(git.path());

        Self { temp_dir }
    }

    /// Write `config.ini` with the given content.
    pub fn with_config(self, content: &str) -> Self {
        self.temp_dir
            .child("config.ini")
            .write_str(content)
            .expect("Failed to write config file");
        self
    }

    /// Create a file inside the working directory.
    #[allow(dead_code)]
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.path().join("config.ini")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.path().join("backups")
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.path().join("backups.new")
    }

    /// Lines written by the fake git, one per clone.
    #[allow(dead_code)]
    pub fn git_calls(&self) -> Vec<String> {
        std::fs::read_to_string(self.path().join("bin/git.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Sorted names of the entries directly under the backup directory.
    #[allow(dead_code)]
    pub fn backup_entries(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.backup_dir())
            .expect("backup dir should exist")
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// The binary, run in the fixture directory with the fake git on `PATH`,
    /// pointed at the fixture's config and `backups/`.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = self.bare_command();
        cmd.arg("--config")
            .arg(self.config_path())
            .arg("--backup-dir")
            .arg(self.backup_dir());
        cmd
    }

    /// Like [`command`](Self::command) but without any arguments.
    pub fn bare_command(&self) -> assert_cmd::Command {
        let path = std::env::var_os("PATH").unwrap_or_default();
        let mut paths = vec![self.path().join("bin")];
        paths.extend(std::env::split_paths(&path));

        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("bitbucket-backup");
        cmd.current_dir(self.path())
            .env("PATH", std::env::join_paths(paths).expect("valid PATH"))
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .env_remove("BITBUCKET_BACKUP_CONFIG")
            .env_remove("BITBUCKET_BACKUP_KEYS_DIR");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .expect("Failed to make fake git executable");
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) {}
