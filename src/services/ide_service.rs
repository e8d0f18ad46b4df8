//! IDE integration notifier
//!
//! StackBlitz syncs from the GitHub webhook on its own; opening the project
//! URL only makes it pick up the push sooner.

use crate::config::keys;
use crate::error::{PushDeployError, Result};
use crate::models::IdeNotification;
use crate::utils::browser_command;

/// What to do with the IDE URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserMode {
    /// Launch the default browser
    Open,
    /// Only emit the URL
    PrintOnly,
}

pub struct IdeNotifier {
    host: String,
    mode: BrowserMode,
}

impl IdeNotifier {
    pub fn new(host: impl Into<String>, mode: BrowserMode) -> Self {
        Self {
            host: host.into(),
            mode,
        }
    }

    /// `https://<host>/github/<owner>/<repo>`
    pub fn ide_url(&self, owner: &str, repo: &str) -> Result<url::Url> {
        let base = if self.host.contains("://") {
            self.host.clone()
        } else {
            format!("https://{}", self.host)
        };

        let invalid = |reason: String| PushDeployError::InvalidSetting {
            key: keys::STACKBLITZ_HOST.to_string(),
            reason,
        };

        let mut url = url::Url::parse(&base).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid(format!("{} cannot carry a path", base)))?
            .pop_if_empty()
            .extend(["github", owner, repo.trim_end_matches(".git")]);
        Ok(url)
    }

    /// Best effort: build the URL and, in [`BrowserMode::Open`], launch it.
    pub fn notify_ide(&self, owner: &str, repo: &str) -> Result<IdeNotification> {
        let url = self.ide_url(owner, repo)?;

        let opened = match self.mode {
            BrowserMode::PrintOnly => false,
            BrowserMode::Open => {
                open_browser(url.as_str())?;
                true
            }
        };

        tracing::info!("IDE refresh URL: {} (opened: {})", url, opened);
        Ok(IdeNotification {
            url: url.to_string(),
            opened,
        })
    }
}

fn open_browser(url: &str) -> Result<()> {
    let status = browser_command(url)
        .status()
        .map_err(|e| PushDeployError::BrowserLaunch(e.to_string()))?;

    if !status.success() {
        return Err(PushDeployError::BrowserLaunch(format!(
            "launcher exited with {}",
            status
        )));
    }
    Ok(())
}
