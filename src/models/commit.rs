//! Commit models

use serde::{Deserialize, Serialize};

/// Summary of a commit created by the publisher
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommitInfo {
    pub oid: String,
    pub short_id: String,
    pub summary: String,
    pub parent_ids: Vec<String>,
    pub timestamp: i64,
}

impl CommitInfo {
    pub fn from_git2(commit: &git2::Commit) -> Self {
        let oid = commit.id().to_string();
        CommitInfo {
            short_id: oid[..7].to_string(),
            oid,
            summary: commit.summary().unwrap_or("").to_string(),
            parent_ids: commit.parent_ids().map(|id| id.to_string()).collect(),
            timestamp: commit.committer().when().seconds(),
        }
    }
}

/// Outcome of a push attempt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PushOutcome {
    /// HEAD was sent to the remote branch
    #[serde(rename_all = "camelCase")]
    Pushed { oid: String, branch: String },
    /// The remote-tracking ref already points at HEAD
    #[serde(rename_all = "camelCase")]
    UpToDate { oid: String, branch: String },
    /// HEAD is unborn, so there is no commit to send
    NothingToPush,
}

/// Everything the publish stage did
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublishSummary {
    pub remote: super::RemoteStatus,
    pub commit: Option<CommitInfo>,
    pub push: PushOutcome,
}
