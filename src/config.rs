//! # Configuration Loading
//!
//! This module defines the in-memory form of the backup configuration and
//! the logic for loading it from an INI file.
//!
//! ## File Format
//!
//! Each section names a Bitbucket workspace. Two keys are required:
//!
//! ```ini
//! [DEFAULT]
//! ssh_key = shared_key
//!
//! [teamA]
//! ssh_key = teamA_key
//! repos = svc1,svc2
//!
//! [teamB]
//! repos = tools
//! ```
//!
//! - `ssh_key` is a filename inside the keys directory (`./keys` by default).
//! - `repos` is a comma-separated list of repository slugs.
//! - A `[DEFAULT]` section provides fallback values for every workspace and
//!   is not a workspace itself.
//! - Keys are matched case-insensitively.
//!
//! Sections are kept in file order, and that order is the clone order.
//!
//! ## Validation
//!
//! All repositories are staged side by side as `<staging>/<repo>`, so a repo
//! name may appear only once across the whole file and must be a plain
//! directory name other than the staging marker. A key may appear only once
//! per section. A file with no workspaces is rejected, since promoting an
//! empty staging directory would wipe the previous backup.

use std::collections::HashSet;
use std::path::Path;

use ini::{Ini, Properties};

use crate::defaults::STAGING_MARKER;
use crate::error::{Error, Result};

/// Name of the section holding fallback values.
const DEFAULT_SECTION: &str = "DEFAULT";

/// Key holding the SSH identity filename.
pub const SSH_KEY_FIELD: &str = "ssh_key";

/// Key holding the comma-separated repository list.
pub const REPOS_FIELD: &str = "repos";

/// A Bitbucket workspace and the repositories to back up from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    /// The workspace slug, as it appears in the remote URL.
    pub name: String,
    /// Filename of the SSH private key, relative to the keys directory.
    pub ssh_key: String,
    /// Repository slugs, in the order they are listed.
    pub repos: Vec<String>,
}

/// The full set of workspaces to back up, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    workspaces: Vec<Workspace>,
}

impl Config {
    /// All workspaces in file order.
    pub fn workspaces(&self) -> &[Workspace] {
        &self.workspaces
    }

    /// Look up a workspace by name.
    pub fn get(&self, name: &str) -> Option<&Workspace> {
        self.workspaces.iter().find(|ws| ws.name == name)
    }

    /// Total number of repositories across all workspaces.
    pub fn repo_count(&self) -> usize {
        self.workspaces.iter().map(|ws| ws.repos.len()).sum()
    }

    /// Every `(workspace, repo)` pair in clone order.
    pub fn repos(&self) -> impl Iterator<Item = (&Workspace, &str)> {
        self.workspaces
            .iter()
            .flat_map(|ws| ws.repos.iter().map(move |repo| (ws, repo.as_str())))
    }

    /// Narrow the configuration down to the single workspace entry that
    /// lists `repo`.
    pub fn only_repo(&self, repo: &str) -> Result<Config> {
        let workspace = self
            .workspaces
            .iter()
            .find(|ws| ws.repos.iter().any(|r| r == repo))
            .ok_or_else(|| Error::ConfigParse {
                message: format!("repository '{}' is not listed in any workspace", repo),
                hint: Some(format!(
                    "Add '{}' to the '{}' key of a workspace section",
                    repo, REPOS_FIELD
                )),
            })?;

        Ok(Config {
            workspaces: vec![Workspace {
                name: workspace.name.clone(),
                ssh_key: workspace.ssh_key.clone(),
                repos: vec![repo.to_string()],
            }],
        })
    }
}

/// Parse INI content into a [`Config`].
pub fn parse(content: &str) -> Result<Config> {
    let ini = Ini::load_from_str(content).map_err(|e| Error::ConfigParse {
        message: e.to_string(),
        hint: None,
    })?;

    let defaults = ini.section(Some(DEFAULT_SECTION));
    let mut workspaces: Vec<Workspace> = Vec::new();
    let mut seen_repos: HashSet<String> = HashSet::new();

    for (section, props) in ini.iter() {
        if let Some(label) = section {
            check_unique_keys(label, props)?;
        }

        let name = match section {
            Some(DEFAULT_SECTION) => continue,
            Some(name) => name.trim(),
            None => {
                if let Some((key, _)) = props.iter().next() {
                    return Err(Error::ConfigParse {
                        message: format!("key '{}' appears before any section header", key),
                        hint: Some("Put every key inside a [workspace] section".to_string()),
                    });
                }
                continue;
            }
        };

        if name.is_empty() {
            return Err(Error::ConfigParse {
                message: "section with an empty name".to_string(),
                hint: None,
            });
        }
        if workspaces.iter().any(|ws| ws.name == name) {
            return Err(Error::ConfigParse {
                message: format!("workspace [{}] is defined more than once", name),
                hint: Some("Merge the repos of both sections into one".to_string()),
            });
        }

        let ssh_key = lookup(props, defaults, SSH_KEY_FIELD)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| missing(name, SSH_KEY_FIELD))?;
        let raw_repos =
            lookup(props, defaults, REPOS_FIELD).ok_or_else(|| missing(name, REPOS_FIELD))?;
        let repos = split_repos(raw_repos);
        if repos.is_empty() {
            return Err(missing(name, REPOS_FIELD));
        }

        for repo in &repos {
            validate_repo_name(name, repo)?;
            if !seen_repos.insert(repo.clone()) {
                return Err(Error::ConfigParse {
                    message: format!("repository '{}' is listed more than once", repo),
                    hint: Some(
                        "Backups are stored as <backup-dir>/<repo>, so names must be unique"
                            .to_string(),
                    ),
                });
            }
        }

        workspaces.push(Workspace {
            name: name.to_string(),
            ssh_key: ssh_key.to_string(),
            repos,
        });
    }

    if workspaces.is_empty() {
        return Err(Error::ConfigParse {
            message: "no workspaces defined".to_string(),
            hint: Some(format!(
                "Add a section such as [my-workspace] with '{}' and '{}' keys",
                SSH_KEY_FIELD, REPOS_FIELD
            )),
        });
    }

    Ok(Config { workspaces })
}

/// Load and parse a configuration file from disk.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| Error::ConfigParse {
        message: format!("cannot read {}: {}", path.display(), e),
        hint: Some("Pass the config file location with --config".to_string()),
    })?;
    parse(&content)
}

/// Case-insensitive lookup in a section, falling back to `[DEFAULT]`.
fn lookup<'a>(
    props: &'a Properties,
    defaults: Option<&'a Properties>,
    key: &str,
) -> Option<&'a str> {
    let find = |p: &'a Properties| {
        p.iter()
            .find(|(k, _)| k.trim().eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    };
    find(props).or_else(|| defaults.and_then(find))
}

/// Reject a key that appears twice in one section, ignoring case.
fn check_unique_keys(section: &str, props: &Properties) -> Result<()> {
    let mut seen: HashSet<String> = HashSet::new();
    for (key, _) in props.iter() {
        if !seen.insert(key.trim().to_ascii_lowercase()) {
            return Err(Error::ConfigParse {
                message: format!(
                    "key '{}' is defined more than once in [{}]",
                    key.trim(),
                    section.trim()
                ),
                hint: Some("Keep a single line for each key".to_string()),
            });
        }
    }
    Ok(())
}

fn split_repos(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}

fn validate_repo_name(workspace: &str, repo: &str) -> Result<()> {
    if repo == "."
        || repo == ".."
        || repo == STAGING_MARKER
        || repo.contains(['/', '\\'])
    {
        return Err(Error::ConfigParse {
            message: format!("invalid repository name '{}' in [{}]", repo, workspace),
            hint: Some("Use the repository slug only, e.g. 'my-service'".to_string()),
        });
    }
    Ok(())
}

fn missing(workspace: &str, field: &str) -> Error {
    Error::ConfigMissingField {
        workspace: workspace.to_string(),
        field: field.to_string(),
    }
}
