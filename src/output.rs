//! # Console Output
//!
//! This module formats the progress lines printed by the CLI: one line per
//! clone attempt and a summary at the end. Colors and emoji are used only
//! when the terminal and the user allow it.
//!
//! ## Respecting User Preferences
//!
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals

use std::env;

use console::style;

use crate::git::{self, CloneStatus};
use crate::orchestrator::{BackupReport, RepoOutcome};

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// `color_flag` is the value of `--color`: "always", "never", or "auto".
    /// In auto mode colors are disabled by `NO_COLOR`, `CLICOLOR=0`,
    /// `TERM=dumb`, or a non-TTY stdout (unless `CLICOLOR_FORCE=1`).
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stdout().features().colors_supported()
    }

    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Returns `emoji_str` when colors are enabled, `plain` otherwise.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

/// One line describing a clone attempt.
pub fn clone_line(config: &OutputConfig, outcome: &RepoOutcome) -> String {
    let url = git::remote_url(&outcome.workspace, &outcome.repo);
    match &outcome.status {
        CloneStatus::Cloned => format!(
            "{} Successfully cloned {}",
            emoji(config, "✅", "[OK]"),
            url
        ),
        CloneStatus::Failed { reason } => {
            let reason = if config.use_color {
                style(reason).red().force_styling(true).to_string()
            } else {
                reason.clone()
            };
            format!(
                "{} Clone of {} failed: {}",
                emoji(config, "❌", "[ERR]"),
                url,
                reason
            )
        }
    }
}

/// Summary printed after all clones were attempted.
pub fn summary_line(config: &OutputConfig, report: &BackupReport) -> String {
    let counts = format!("{}/{}", report.succeeded_count(), report.len());
    if report.all_succeeded() {
        format!(
            "{} {} repositories cloned; promoting staging directory",
            emoji(config, "📦", "[DONE]"),
            counts
        )
    } else {
        format!(
            "{} {} repositories cloned; keeping previous backup",
            emoji(config, "⚠️", "[WARN]"),
            counts
        )
    }
}
