//! Deployment API models

use serde::{Deserialize, Serialize};

/// Body of `POST /v13/deployments`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRequest {
    pub name: String,
    pub git_source: GitSource,
    pub target: String,
}

/// Source reference the platform builds from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GitSource {
    #[serde(rename = "type")]
    pub kind: String,
    pub org: String,
    pub repo: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
}

/// Raw response fields we care about
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeploymentResponse {
    pub id: String,
    pub status: Option<String>,
    pub ready_state: Option<String>,
    pub url: Option<String>,
}

/// Handle to a deployment that the platform accepted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentHandle {
    pub id: String,
    pub status: String,
    pub url: Option<String>,
}

impl From<DeploymentResponse> for DeploymentHandle {
    fn from(response: DeploymentResponse) -> Self {
        DeploymentHandle {
            id: response.id,
            status: response
                .status
                .or(response.ready_state)
                .unwrap_or_else(|| "UNKNOWN".to_string()),
            url: response.url,
        }
    }
}

/// Project and repository the deployment targets
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentTarget {
    pub project: String,
    pub org_id: Option<String>,
    pub repo_owner: String,
    pub repo_name: String,
}

/// Result of the IDE notification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IdeNotification {
    pub url: String,
    /// False when the URL was only emitted for the caller to open
    pub opened: bool,
}
