//! Error types for pushdeploy

use serde::Serialize;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum PushDeployError {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Env file error: {0}")]
    EnvFile(#[from] dotenvy::Error),

    #[error("Missing required settings: {}", .0.join(", "))]
    MissingSettings(Vec<String>),

    #[error("Invalid setting {key}: {reason}")]
    InvalidSetting { key: String, reason: String },

    #[error("Repository not found: {0}")]
    RepositoryNotFound(String),

    #[error("Remote not found: {0}")]
    RemoteNotFound(String),

    #[error("Authentication failed: {0}")]
    AuthenticationRequired(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Push of {reference} rejected: {reason}")]
    PushRejected { reference: String, reason: String },

    #[error("Deployment API returned HTTP {status}: {body}")]
    DeploymentRejected { status: u16, body: String },

    #[error("Failed to open browser: {0}")]
    BrowserLaunch(String),
}

impl PushDeployError {
    /// Stable machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            PushDeployError::Git(_) => "GIT_ERROR",
            PushDeployError::Io(_) => "IO_ERROR",
            PushDeployError::Serialization(_) => "SERIALIZATION_ERROR",
            PushDeployError::Http(_) => "HTTP_ERROR",
            PushDeployError::EnvFile(_) => "ENV_FILE_ERROR",
            PushDeployError::MissingSettings(_) => "MISSING_SETTINGS",
            PushDeployError::InvalidSetting { .. } => "INVALID_SETTING",
            PushDeployError::RepositoryNotFound(_) => "REPO_NOT_FOUND",
            PushDeployError::RemoteNotFound(_) => "REMOTE_NOT_FOUND",
            PushDeployError::AuthenticationRequired(_) => "AUTH_REQUIRED",
            PushDeployError::Network(_) => "NETWORK_ERROR",
            PushDeployError::PushRejected { .. } => "PUSH_REJECTED",
            PushDeployError::DeploymentRejected { .. } => "DEPLOYMENT_REJECTED",
            PushDeployError::BrowserLaunch(_) => "BROWSER_LAUNCH_FAILED",
        }
    }

    /// Whether this error belongs to the configuration category
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            PushDeployError::MissingSettings(_)
                | PushDeployError::InvalidSetting { .. }
                | PushDeployError::EnvFile(_)
        )
    }

    /// Classify a git2 error raised by a network operation.
    pub fn from_transport(error: git2::Error) -> Self {
        match (error.code(), error.class()) {
            (git2::ErrorCode::Auth, _) => {
                PushDeployError::AuthenticationRequired(error.message().to_string())
            }
            (_, git2::ErrorClass::Net | git2::ErrorClass::Http | git2::ErrorClass::Ssl) => {
                PushDeployError::Network(error.message().to_string())
            }
            _ => PushDeployError::Git(error),
        }
    }
}

/// Serializable error response for the JSON report
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<&PushDeployError> for ErrorResponse {
    fn from(error: &PushDeployError) -> Self {
        ErrorResponse {
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}

/// Result type alias for pushdeploy operations
pub type Result<T> = std::result::Result<T, PushDeployError>;
