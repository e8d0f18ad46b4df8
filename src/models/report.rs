//! Run report models

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{DeploymentHandle, IdeNotification, PublishSummary, PushOutcome};
use crate::error::{ErrorResponse, PushDeployError};

/// States visited by one run, in order
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    Start,
    ConfigLoaded,
    ChangesDetected,
    Committed,
    NoChanges,
    Pushed,
    PushSkipped,
    PushFailed,
    DeployTriggered,
    DeploySkipped,
    DeployFailed,
    IdeNotified,
    IdeSkipped,
    IdeFailed,
    Done,
}

/// Outcome of one stage
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "state", content = "detail", rename_all = "camelCase")]
pub enum StageOutcome<T> {
    Completed(T),
    Skipped(String),
    Failed(ErrorResponse),
}

impl<T> StageOutcome<T> {
    pub fn failed(error: &PushDeployError) -> Self {
        StageOutcome::Failed(ErrorResponse::from(error))
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        StageOutcome::Skipped(reason.into())
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, StageOutcome::Completed(_))
    }

    pub fn completed(&self) -> Option<&T> {
        match self {
            StageOutcome::Completed(value) => Some(value),
            _ => None,
        }
    }
}

/// Everything one run did
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub states: Vec<RunState>,
    pub publish: StageOutcome<PublishSummary>,
    pub deployment: StageOutcome<DeploymentHandle>,
    pub ide: StageOutcome<IdeNotification>,
}

impl RunReport {
    /// A run succeeds when the publish stage did; later stages are advisory.
    pub fn succeeded(&self) -> bool {
        self.publish.is_completed()
    }

    /// Human-readable status lines, one per event
    pub fn render_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();

        match &self.publish {
            StageOutcome::Completed(summary) => {
                if summary.remote.created {
                    lines.push(format!(
                        "Remote {} configured ({})",
                        summary.remote.remote.name, summary.remote.remote.url
                    ));
                }
                match &summary.commit {
                    Some(commit) => lines.push(format!(
                        "Committed {} \"{}\"",
                        commit.short_id, commit.summary
                    )),
                    None => lines.push("No changes to commit".to_string()),
                }
                match &summary.push {
                    PushOutcome::Pushed { oid, branch } => {
                        lines.push(format!("Pushed {} to {}", short(oid), branch))
                    }
                    PushOutcome::UpToDate { oid, branch } => lines.push(format!(
                        "Branch {} already at {}, nothing to push",
                        branch,
                        short(oid)
                    )),
                    PushOutcome::NothingToPush => {
                        lines.push("Repository has no commits, nothing to push".to_string())
                    }
                }
            }
            StageOutcome::Skipped(reason) => lines.push(format!("Publish skipped: {}", reason)),
            StageOutcome::Failed(error) => {
                lines.push(format!("Publish failed [{}]: {}", error.code, error.message))
            }
        }

        match &self.deployment {
            StageOutcome::Completed(handle) => {
                let mut line = format!("Deployment {} created, status {}", handle.id, handle.status);
                if let Some(url) = &handle.url {
                    line.push_str(&format!(" ({})", url));
                }
                lines.push(line);
            }
            StageOutcome::Skipped(reason) => {
                lines.push(format!("Deployment skipped: {}", reason))
            }
            StageOutcome::Failed(error) => lines.push(format!(
                "Deployment failed [{}]: {}",
                error.code, error.message
            )),
        }

        match &self.ide {
            StageOutcome::Completed(notification) if notification.opened => {
                lines.push(format!("Opened {}", notification.url))
            }
            StageOutcome::Completed(notification) => {
                lines.push(format!("Open {} to refresh the IDE", notification.url))
            }
            StageOutcome::Skipped(reason) => lines.push(format!("IDE refresh skipped: {}", reason)),
            StageOutcome::Failed(error) => {
                lines.push(format!("IDE refresh failed: {}", error.message))
            }
        }

        lines
    }
}

fn short(oid: &str) -> &str {
    &oid[..oid.len().min(7)]
}
