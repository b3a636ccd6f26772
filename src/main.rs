//! # Bitbucket Backup CLI
//!
//! This is the binary entry point for the `bitbucket-backup` command-line tool.
//!
//! It parses the command line with `clap` and runs the backup. All of the
//! cloning, staging and promotion logic lives in the `bitbucket_backup`
//! library crate; any error it returns is printed by `anyhow` and the process
//! exits with status 1.

mod cli;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
