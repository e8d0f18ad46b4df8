//! Deployment notifier
//!
//! Asks the hosting platform to build the branch that was just pushed.

use std::time::Duration;

use crate::config::keys;
use crate::error::{PushDeployError, Result};
use crate::models::deployment::DeploymentResponse;
use crate::models::{DeploymentHandle, DeploymentRequest, DeploymentTarget, GitSource};

const DEPLOYMENTS_PATH: &str = "v13/deployments";
const USER_AGENT: &str = concat!("pushdeploy/", env!("CARGO_PKG_VERSION"));
const PRODUCTION_TARGET: &str = "production";

/// Client for the "create deployment from source reference" endpoint
pub struct DeploymentNotifier {
    client: reqwest::Client,
    endpoint: url::Url,
}

impl DeploymentNotifier {
    /// Build a notifier for `api_base` with a client-wide request timeout
    pub fn new(api_base: &str, timeout: Duration) -> Result<Self> {
        let invalid = |reason: String| PushDeployError::InvalidSetting {
            key: keys::VERCEL_API_URL.to_string(),
            reason,
        };

        let mut base = url::Url::parse(api_base).map_err(|e| invalid(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(invalid(format!("{} cannot be used as a base URL", api_base)));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base
            .join(DEPLOYMENTS_PATH)
            .map_err(|e| invalid(e.to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &url::Url {
        &self.endpoint
    }

    /// Request body for deploying `branch` of the target repository
    pub fn build_request(target: &DeploymentTarget, branch: &str) -> DeploymentRequest {
        DeploymentRequest {
            name: target.project.clone(),
            git_source: GitSource {
                kind: "github".to_string(),
                org: target.repo_owner.clone(),
                repo: target.repo_name.clone(),
                git_ref: branch.to_string(),
            },
            target: PRODUCTION_TARGET.to_string(),
        }
    }

    /// POST one deployment request. No retry.
    ///
    /// HTTP 200/201 yields the deployment handle; any other status is
    /// returned as [`PushDeployError::DeploymentRejected`] with the body.
    pub async fn trigger_deployment(
        &self,
        token: &str,
        target: &DeploymentTarget,
        branch: &str,
    ) -> Result<DeploymentHandle> {
        let body = Self::build_request(target, branch);

        let mut request = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(token)
            .json(&body);
        if let Some(org_id) = &target.org_id {
            request = request.query(&[("teamId", org_id.as_str())]);
        }

        tracing::info!(
            "Requesting {} deployment of {} from {}/{}@{}",
            PRODUCTION_TARGET,
            target.project,
            target.repo_owner,
            target.repo_name,
            branch
        );

        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::OK || status == reqwest::StatusCode::CREATED {
            let parsed: DeploymentResponse = response.json().await?;
            let handle = DeploymentHandle::from(parsed);
            tracing::info!("Deployment {} accepted ({})", handle.id, handle.status);
            Ok(handle)
        } else {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Deployment API returned {}: {}", status, body);
            Err(PushDeployError::DeploymentRejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}
