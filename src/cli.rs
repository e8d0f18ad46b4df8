//! Command-line interface
//!
//! Flags override the matching settings from the env file and environment.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{keys, Settings};
use crate::services::{BrowserMode, RunOptions};

/// Commit and push the working copy, then trigger a deployment and refresh the IDE
#[derive(Parser, Debug)]
#[command(name = "pushdeploy")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Working copy to publish
    #[arg(long, default_value = ".")]
    pub repo: PathBuf,

    /// Env file to read settings from (default: ./.env if present)
    #[arg(long)]
    pub env_file: Option<PathBuf>,

    /// Commit message (overrides GIT_COMMIT_MESSAGE)
    #[arg(short, long)]
    pub message: Option<String>,

    /// Target branch (overrides GIT_BRANCH)
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Remote name (overrides GIT_REMOTE)
    #[arg(long)]
    pub remote: Option<String>,

    /// Do not trigger a deployment even when configured
    #[arg(long)]
    pub skip_deploy: bool,

    /// Do not refresh the IDE integration even when configured
    #[arg(long)]
    pub skip_ide: bool,

    /// Print the IDE URL instead of opening a browser
    #[arg(long)]
    pub no_browser: bool,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Write flag overrides into the settings record
    pub fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(message) = &self.message {
            settings.set(keys::GIT_COMMIT_MESSAGE, message.as_str());
        }
        if let Some(branch) = &self.branch {
            settings.set(keys::GIT_BRANCH, branch.as_str());
        }
        if let Some(remote) = &self.remote {
            settings.set(keys::GIT_REMOTE, remote.as_str());
        }
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            repo_path: self.repo.clone(),
            skip_deploy: self.skip_deploy,
            skip_ide: self.skip_ide,
            browser: if self.no_browser {
                BrowserMode::PrintOnly
            } else {
                BrowserMode::Open
            },
            timeout: std::time::Duration::from_secs(self.timeout),
        }
    }

    /// Default tracing filter for the chosen verbosity
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "pushdeploy=info,pushdeploy_lib=info,git2=warn",
            1 => "pushdeploy=debug,pushdeploy_lib=debug,git2=info",
            _ => "pushdeploy=trace,pushdeploy_lib=trace,git2=debug",
        }
    }
}
