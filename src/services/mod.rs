//! Service layer for pushdeploy
//!
//! One service per stage of a run, plus the pipeline that sequences them.

pub mod credentials_service;
pub mod deployment_service;
pub mod ide_service;
pub mod pipeline;
pub mod publisher;

pub use credentials_service::CredentialsHelper;
pub use deployment_service::DeploymentNotifier;
pub use ide_service::{BrowserMode, IdeNotifier};
pub use pipeline::{run_pipeline, RunOptions};
pub use publisher::SourcePublisher;
