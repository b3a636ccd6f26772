use std::path::Path;
use std::process::Command;

use log::debug;

use crate::defaults::REMOTE_HOST;
use crate::error::{Error, Result};

/// Result of one `git clone` that could be started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloneStatus {
    /// git exited successfully.
    Cloned,
    /// git ran but exited nonzero (or was killed).
    Failed { reason: String },
}

impl CloneStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, CloneStatus::Cloned)
    }
}

/// Build the SSH remote URL for a repository in a workspace.
pub fn remote_url(workspace: &str, repo: &str) -> String {
    format!("{}:{}/{}.git", REMOTE_HOST, workspace, repo)
}

/// Build the `GIT_SSH_COMMAND` value that forces a specific identity file and
/// skips host key verification.
pub fn ssh_command(ssh_key: &Path) -> String {
    format!(
        "ssh -i {} -o StrictHostKeyChecking=no",
        shell_quote(&ssh_key.to_string_lossy())
    )
}

/// Clone `url` into `target_dir` with the system git command, authenticating
/// with `ssh_key`.
///
/// The rest of the environment (PATH, HOME, ...) is inherited. stdout and
/// stderr are captured; stderr is only used to explain failures.
///
/// Returns `Err` only if git could not be started at all. A clone that runs
/// and exits nonzero is `Ok(CloneStatus::Failed)`.
pub fn clone_with_identity(
    git_executable: &str,
    url: &str,
    target_dir: &Path,
    ssh_key: &Path,
) -> Result<CloneStatus> {
    let ssh = ssh_command(ssh_key);
    debug!(
        "GIT_SSH_COMMAND='{}' {} clone {} {}",
        ssh,
        git_executable,
        url,
        target_dir.display()
    );

    let output = Command::new(git_executable)
        .arg("clone")
        .arg(url)
        .arg(target_dir)
        .env("GIT_SSH_COMMAND", ssh)
        .output()
        .map_err(|e| Error::CloneInvocation {
            url: url.to_string(),
            message: e.to_string(),
        })?;

    if output.status.success() {
        return Ok(CloneStatus::Cloned);
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    Ok(CloneStatus::Failed {
        reason: failure_reason(output.status.code(), &stderr),
    })
}

/// Summarize a failed clone from its exit code and stderr.
fn failure_reason(code: Option<i32>, stderr: &str) -> String {
    let status = match code {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    };

    let detail = stderr
        .lines()
        .map(str::trim)
        .rev()
        .find(|line| !line.is_empty());

    let mut reason = match detail {
        Some(line) => format!("{}: {}", status, line),
        None => status,
    };

    if stderr.contains("Permission denied")
        || stderr.contains("Could not read from remote repository")
        || stderr.contains("Host key verification failed")
    {
        reason.push_str(" (check that the workspace's SSH key exists and has read access)");
    }

    reason
}

/// Single-quote a value for the shell that git uses to run `GIT_SSH_COMMAND`.
fn shell_quote(value: &str) -> String {
    let safe = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "/._-+:@%=,".contains(c));
    if safe && !value.is_empty() {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_remote_url() {
        assert_eq!(
            remote_url("teamA", "svc1"),
            "git@bitbucket.org:teamA/svc1.git"
        );
    }

    #[test]
    fn test_ssh_command() {
        let cmd = ssh_command(&PathBuf::from("./keys/teamA_key"));
        assert_eq!(cmd, "ssh -i ./keys/teamA_key -o StrictHostKeyChecking=no");
    }

    #[test]
    fn test_ssh_command_quotes_awkward_paths() {
        let cmd = ssh_command(&PathBuf::from("/srv/my keys/it's"));
        assert_eq!(
            cmd,
            r"ssh -i '/srv/my keys/it'\''s' -o StrictHostKeyChecking=no"
        );
    }

    #[test]
    fn test_failure_reason_uses_last_stderr_line() {
        let stderr = "Cloning into 'x'...\nfatal: repository 'x' does not exist\n\n";
        let reason = failure_reason(Some(128), stderr);
        assert_eq!(reason, "exit status 128: fatal: repository 'x' does not exist");
    }

    #[test]
    fn test_failure_reason_without_stderr() {
        assert_eq!(failure_reason(Some(1), ""), "exit status 1");
        assert_eq!(failure_reason(None, ""), "terminated by signal");
    }

    #[test]
    fn test_failure_reason_auth_hint() {
        let stderr = "git@bitbucket.org: Permission denied (publickey).\n\
                      fatal: Could not read from remote repository.\n";
        let reason = failure_reason(Some(128), stderr);
        assert!(reason.starts_with("exit status 128: fatal: Could not read"));
        assert!(reason.contains("SSH key"));
    }

    #[test]
    fn test_clone_missing_executable_is_invocation_error() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let result = clone_with_identity(
            "/nonexistent/bin/git-does-not-exist",
            "git@bitbucket.org:teamA/svc1.git",
            &temp_dir.path().join("svc1"),
            &PathBuf::from("./keys/k"),
        );

        match result {
            Err(Error::CloneInvocation { url, .. }) => {
                assert_eq!(url, "git@bitbucket.org:teamA/svc1.git");
            }
            other => panic!("expected CloneInvocation, got {other:?}"),
        }
    }

    #[cfg(unix)]
    mod with_fake_git {
        use super::*;
        use crate::test_support::fake_git;
        use std::fs;

        #[test]
        fn test_clone_success_passes_ssh_command() {
            let temp_dir = tempfile::TempDir::new().unwrap();
            let git = fake_git(temp_dir.path());
            let target = temp_dir.path().join("staging").join("svc1");

            let status = clone_with_identity(
                &git.to_string_lossy(),
                "git@bitbucket.org:teamA/svc1.git",
                &target,
                &PathBuf::from("./keys/teamA_key"),
            )
            .unwrap();

            assert_eq!(status, CloneStatus::Cloned);
            assert!(target.join("ORIGIN").exists());

            let log = fs::read_to_string(temp_dir.path().join("git.log")).unwrap();
            assert!(log.contains("git@bitbucket.org:teamA/svc1.git"));
            assert!(log.contains("ssh -i ./keys/teamA_key -o StrictHostKeyChecking=no"));
        }

        #[test]
        fn test_clone_nonzero_exit_is_failed_status() {
            let temp_dir = tempfile::TempDir::new().unwrap();
            let git = fake_git(temp_dir.path());

            let status = clone_with_identity(
                &git.to_string_lossy(),
                "git@bitbucket.org:teamA/will-fail.git",
                &temp_dir.path().join("will-fail"),
                &PathBuf::from("./keys/teamA_key"),
            )
            .unwrap();

            match status {
                CloneStatus::Failed { reason } => {
                    assert!(reason.starts_with("exit status 128"));
                    assert!(reason.contains("Could not read from remote repository"));
                }
                CloneStatus::Cloned => panic!("expected failure"),
            }
        }
    }
}
