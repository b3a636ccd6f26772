//! Helpers shared by unit tests.

#[cfg(unix)]
use std::path::{Path, PathBuf};

/// Shell script standing in for `git clone <url> <dest>`, shared with the
/// end-to-end tests. Every call is logged to `git.log` next to the script.
#[cfg(unix)]
pub const FAKE_GIT_SCRIPT: &str = include_str!("../tests/fixtures/fake-git.sh");

/// Write an executable fake `git` into `dir` and return its path.
#[cfg(unix)]
pub fn fake_git(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("git");
    std::fs::write(&path, FAKE_GIT_SCRIPT).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn test_fake_git_is_executable_script() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let git = fake_git(temp_dir.path());

        let mode = std::fs::metadata(&git).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
        assert!(FAKE_GIT_SCRIPT.starts_with("#!/bin/sh\n"));
    }
}
