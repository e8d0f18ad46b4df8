//! Data models for pushdeploy

pub mod commit;
pub mod deployment;
pub mod remote;
pub mod report;

pub use commit::*;
pub use deployment::{
    DeploymentHandle, DeploymentRequest, DeploymentTarget, GitSource, IdeNotification,
};
pub use remote::*;
pub use report::*;
