//! CLI argument parsing and the top-level backup flow

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use bitbucket_backup::config;
use bitbucket_backup::defaults::{self, DEFAULT_KEYS_DIR};
use bitbucket_backup::orchestrator;
use bitbucket_backup::output::{self, emoji, OutputConfig};
use bitbucket_backup::repository::RepoCloner;
use bitbucket_backup::session::{self, PromotionTarget, RepoTarget};

/// Bitbucket Backup - clone every configured repository and replace the
/// previous backup only if all clones succeeded
#[derive(Parser, Debug)]
#[command(name = "bitbucket-backup")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the config.ini file (defaults to config.ini next to the executable)
    #[arg(short, long, value_name = "PATH", env = "BITBUCKET_BACKUP_CONFIG")]
    config: Option<PathBuf>,

    /// Root directory where backups are finally stored, e.g. ./backups
    #[arg(short, long, value_name = "DIR")]
    backup_dir: PathBuf,

    /// Directory containing the SSH keys named by `ssh_key` in the config
    #[arg(long, value_name = "DIR", env = "BITBUCKET_BACKUP_KEYS_DIR", default_value = DEFAULT_KEYS_DIR)]
    keys_dir: PathBuf,

    /// Back up a single repository and replace only its backup
    #[arg(long, value_name = "REPO")]
    promote_repo: Option<String>,

    /// Where --promote-repo moves the fresh clone [default: subtree]
    #[arg(long, value_enum, value_name = "TARGET", requires = "promote_repo")]
    repo_target: Option<RepoTargetArg>,

    /// Colorize output (always, never, auto)
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

/// Single-repository promotion targets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum RepoTargetArg {
    /// Replace <backup-dir>/<repo>
    #[default]
    Subtree,
    /// Rename the clone onto <backup-dir> itself (historical behavior)
    Root,
}

impl From<RepoTargetArg> for RepoTarget {
    fn from(arg: RepoTargetArg) -> Self {
        match arg {
            RepoTargetArg::Subtree => RepoTarget::Subtree,
            RepoTargetArg::Root => RepoTarget::Root,
        }
    }
}

impl Cli {
    /// Run a full backup.
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);
        let out = OutputConfig::from_env_and_flag(&self.color);

        let config_path = match self.config {
            Some(path) => path,
            None => defaults::default_config_path()?,
        };
        let mut config = config::from_file(&config_path)
            .with_context(|| format!("Failed to load {}", config_path.display()))?;

        let target = match &self.promote_repo {
            Some(repo) => {
                config = config.only_repo(repo)?;
                PromotionTarget::Repo {
                    name: repo.clone(),
                    target: self.repo_target.unwrap_or_default().into(),
                }
            }
            None => PromotionTarget::All,
        };

        println!(
            "{} Backing up {} repositories from {} workspaces",
            emoji(&out, "🔍", "[SCAN]"),
            config.repo_count(),
            config.workspaces().len()
        );

        let cloner = RepoCloner::new(&self.keys_dir);
        session::with_session(&self.backup_dir, |session| {
            let report =
                orchestrator::run_all_with(&config, &cloner, session.staging_dir(), |outcome| {
                    println!("{}", output::clone_line(&out, outcome));
                })?;
            println!("{}", output::summary_line(&out, &report));

            report.into_result()?;
            session.promote(&target)
        })?;

        println!(
            "{} Backup stored in {}",
            emoji(&out, "✅", "[OK]"),
            self.backup_dir.display()
        );
        Ok(())
    }
}

/// Log to stderr at `level`, unless `RUST_LOG` says otherwise.
fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_target(false)
        .try_init();
}
