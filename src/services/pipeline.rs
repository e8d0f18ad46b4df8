//! Whole-run orchestration
//!
//! Publish, then deploy, then nudge the IDE, strictly in that order. Each
//! stage's failure is caught and recorded in the report. Deployment builds
//! from the pushed branch, so it is skipped when the publish stage failed;
//! the IDE nudge is attempted regardless.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;

use crate::config::{DeployConfig, IdeConfig, PublishConfig, Settings};
use crate::error::Result;
use crate::models::{
    DeploymentHandle, DeploymentTarget, IdeNotification, PublishSummary, PushOutcome, RunReport,
    RunState, StageOutcome,
};
use crate::services::deployment_service::DeploymentNotifier;
use crate::services::ide_service::{BrowserMode, IdeNotifier};
use crate::services::publisher::SourcePublisher;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-run switches that do not come from the settings record
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub repo_path: PathBuf,
    pub skip_deploy: bool,
    pub skip_ide: bool,
    pub browser: BrowserMode,
    pub timeout: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            repo_path: PathBuf::from("."),
            skip_deploy: false,
            skip_ide: false,
            browser: BrowserMode::Open,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Ordered record of the states a run visits
#[derive(Debug, Default)]
struct Transcript(Vec<RunState>);

impl Transcript {
    fn enter(&mut self, state: RunState) {
        tracing::debug!("Run state -> {:?}", state);
        self.0.push(state);
    }
}

/// Run every stage and report what happened.
///
/// Only a publish configuration error is returned as `Err`; it is raised
/// before any git or network call is made.
pub async fn run_pipeline(settings: &Settings, options: &RunOptions) -> Result<RunReport> {
    let started_at = Utc::now();
    let mut transcript = Transcript::default();
    transcript.enter(RunState::Start);

    let publish_config = settings.publish_config()?;
    let deploy_config = settings.deploy_config();
    let ide_config = settings.ide_config();
    transcript.enter(RunState::ConfigLoaded);

    let publish = publish_stage(&publish_config, options, &mut transcript);
    let deployment = deploy_stage(
        &publish_config,
        deploy_config.as_ref(),
        &publish,
        options,
        &mut transcript,
    )
    .await;
    let ide = ide_stage(&publish_config, ide_config.as_ref(), options, &mut transcript);

    transcript.enter(RunState::Done);

    Ok(RunReport {
        started_at,
        finished_at: Utc::now(),
        states: transcript.0,
        publish,
        deployment,
        ide,
    })
}

fn publish_stage(
    config: &PublishConfig,
    options: &RunOptions,
    transcript: &mut Transcript,
) -> StageOutcome<PublishSummary> {
    match publish(config, options, transcript) {
        Ok(summary) => {
            match summary.push {
                PushOutcome::Pushed { .. } => transcript.enter(RunState::Pushed),
                PushOutcome::UpToDate { .. } | PushOutcome::NothingToPush => {
                    transcript.enter(RunState::PushSkipped)
                }
            }
            StageOutcome::Completed(summary)
        }
        Err(e) => {
            tracing::error!("Publish failed: {}", e);
            transcript.enter(RunState::PushFailed);
            StageOutcome::failed(&e)
        }
    }
}

fn publish(
    config: &PublishConfig,
    options: &RunOptions,
    transcript: &mut Transcript,
) -> Result<PublishSummary> {
    let publisher = SourcePublisher::open(&options.repo_path)?;
    tracing::info!("Publishing {}", publisher.workdir().display());

    let remote = publisher.ensure_remote(&config.remote_name, &config.remote_url)?;

    let commit = if publisher.has_pending_changes()? {
        transcript.enter(RunState::ChangesDetected);
        let commit = publisher.commit_all(&config.commit_message)?;
        transcript.enter(if commit.is_some() {
            RunState::Committed
        } else {
            RunState::NoChanges
        });
        commit
    } else {
        tracing::info!("No changes to commit");
        transcript.enter(RunState::NoChanges);
        None
    };

    let push = publisher.push(
        &config.remote_name,
        &config.branch,
        Some(&config.owner),
        Some(&config.token),
    )?;

    Ok(PublishSummary {
        remote,
        commit,
        push,
    })
}

async fn deploy_stage(
    publish_config: &PublishConfig,
    deploy_config: Option<&DeployConfig>,
    publish: &StageOutcome<PublishSummary>,
    options: &RunOptions,
    transcript: &mut Transcript,
) -> StageOutcome<DeploymentHandle> {
    if options.skip_deploy {
        return skip_stage(transcript, RunState::DeploySkipped, "disabled by --skip-deploy");
    }
    let Some(deploy_config) = deploy_config else {
        return skip_stage(transcript, RunState::DeploySkipped, "not configured");
    };
    if !publish.is_completed() {
        return skip_stage(transcript, RunState::DeploySkipped, "publish did not succeed");
    }

    let target = DeploymentTarget {
        project: deploy_config.project.clone(),
        org_id: deploy_config.org_id.clone(),
        repo_owner: publish_config.owner.clone(),
        repo_name: publish_config.repo.clone(),
    };

    let result = match DeploymentNotifier::new(&deploy_config.api_base, options.timeout) {
        Ok(notifier) => {
            notifier
                .trigger_deployment(&deploy_config.token, &target, &publish_config.branch)
                .await
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(handle) => {
            transcript.enter(RunState::DeployTriggered);
            StageOutcome::Completed(handle)
        }
        Err(e) => {
            tracing::warn!("Deployment failed: {}", e);
            transcript.enter(RunState::DeployFailed);
            StageOutcome::failed(&e)
        }
    }
}

fn ide_stage(
    publish_config: &PublishConfig,
    ide_config: Option<&IdeConfig>,
    options: &RunOptions,
    transcript: &mut Transcript,
) -> StageOutcome<IdeNotification> {
    if options.skip_ide {
        return skip_stage(transcript, RunState::IdeSkipped, "disabled by --skip-ide");
    }
    let Some(ide_config) = ide_config else {
        return skip_stage(transcript, RunState::IdeSkipped, "not configured");
    };

    let notifier = IdeNotifier::new(ide_config.host.clone(), options.browser);
    match notifier.notify_ide(&publish_config.owner, &publish_config.repo) {
        Ok(notification) => {
            transcript.enter(RunState::IdeNotified);
            StageOutcome::Completed(notification)
        }
        Err(e) => {
            tracing::warn!("IDE refresh failed: {}", e);
            transcript.enter(RunState::IdeFailed);
            StageOutcome::failed(&e)
        }
    }
}

fn skip_stage<T>(transcript: &mut Transcript, state: RunState, reason: &str) -> StageOutcome<T> {
    tracing::info!("{:?}: {}", state, reason);
    transcript.enter(state);
    StageOutcome::skipped(reason)
}
