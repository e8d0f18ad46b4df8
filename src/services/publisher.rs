//! Source publisher
//!
//! Stages, commits and pushes the working copy with libgit2.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{PushDeployError, Result};
use crate::models::{CommitInfo, PushOutcome, Remote, RemoteStatus};
use crate::services::credentials_service::{get_push_options, CredentialsHelper};

/// Identity used when the repository has no `user.name`/`user.email`
const FALLBACK_NAME: &str = "pushdeploy";
const FALLBACK_EMAIL: &str = "pushdeploy@localhost";

/// Bound libgit2's connect and read waits for the rest of the process.
///
/// Must be called before any remote operation starts.
pub fn set_transport_timeout(timeout: Duration) -> Result<()> {
    let millis = transport_timeout_millis(timeout);
    // SAFETY: run once at startup on the only thread, before libgit2 opens
    // any connection.
    unsafe {
        git2::opts::set_server_connect_timeout_in_milliseconds(millis)?;
        git2::opts::set_server_timeout_in_milliseconds(millis)?;
    }
    tracing::debug!("libgit2 transport timeout set to {} ms", millis);
    Ok(())
}

fn transport_timeout_millis(timeout: Duration) -> i32 {
    i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX)
}

/// Publishes one working copy to one remote
pub struct SourcePublisher {
    repo: git2::Repository,
}

impl SourcePublisher {
    /// Open the repository containing `path`
    pub fn open(path: &Path) -> Result<Self> {
        let repo = git2::Repository::discover(path).map_err(|e| {
            PushDeployError::RepositoryNotFound(format!("{}: {}", path.display(), e.message()))
        })?;

        if repo.is_bare() {
            return Err(PushDeployError::RepositoryNotFound(format!(
                "{} is a bare repository",
                path.display()
            )));
        }

        tracing::debug!("Opened repository at {:?}", repo.workdir());
        Ok(Self { repo })
    }

    /// Root of the working copy
    pub fn workdir(&self) -> PathBuf {
        self.repo
            .workdir()
            .unwrap_or_else(|| self.repo.path())
            .to_path_buf()
    }

    /// Create remote `name` pointing at `url` unless it already exists.
    ///
    /// An existing remote is never modified, whatever its URL.
    pub fn ensure_remote(&self, name: &str, url: &str) -> Result<RemoteStatus> {
        match self.repo.find_remote(name) {
            Ok(remote) => {
                tracing::debug!("Reusing remote {}", name);
                Ok(RemoteStatus {
                    remote: Remote::from_git2(&remote),
                    created: false,
                })
            }
            Err(e) if e.code() == git2::ErrorCode::NotFound => {
                let remote = self.repo.remote(name, url)?;
                let remote = Remote::from_git2(&remote);
                tracing::info!("Created remote {} -> {}", name, remote.url);
                Ok(RemoteStatus {
                    remote,
                    created: true,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// True when the index or working tree differs from HEAD, untracked
    /// files included and ignored files excluded.
    pub fn has_pending_changes(&self) -> Result<bool> {
        let mut opts = git2::StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false)
            .include_unmodified(false)
            .exclude_submodules(true);

        let statuses = self.repo.statuses(Some(&mut opts))?;
        tracing::debug!("{} paths with pending changes", statuses.len());
        Ok(!statuses.is_empty())
    }

    /// Stage every change and commit it. Returns `None` without touching
    /// history when there is nothing to commit.
    pub fn commit_all(&self, message: &str) -> Result<Option<CommitInfo>> {
        if !self.has_pending_changes()? {
            tracing::debug!("Working tree clean, no commit created");
            return Ok(None);
        }

        let mut index = self.repo.index()?;
        index.add_all(["*"], git2::IndexAddOption::DEFAULT, None)?;
        // add_all skips paths deleted from the working tree
        index.update_all(["*"], None)?;
        index.write()?;

        let tree_oid = index.write_tree()?;
        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());

        if let Some(parent) = &parent {
            if parent.tree_id() == tree_oid {
                tracing::debug!("Staged tree matches HEAD, no commit created");
                return Ok(None);
            }
        }

        let tree = self.repo.find_tree(tree_oid)?;
        let signature = self.signature()?;
        let parents: Vec<&git2::Commit> = parent.as_ref().into_iter().collect();

        let commit_oid = self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &parents,
        )?;

        let commit = self.repo.find_commit(commit_oid)?;
        let info = CommitInfo::from_git2(&commit);
        tracing::info!("Created commit {} ({})", info.short_id, info.summary);
        Ok(Some(info))
    }

    fn signature(&self) -> Result<git2::Signature<'static>> {
        match self.repo.signature() {
            Ok(signature) => Ok(signature),
            Err(e) => {
                tracing::warn!(
                    "No git identity configured ({}), committing as {}",
                    e.message(),
                    FALLBACK_NAME
                );
                Ok(git2::Signature::now(FALLBACK_NAME, FALLBACK_EMAIL)?)
            }
        }
    }

    /// Push HEAD to `refs/heads/<branch>` on `remote_name`.
    ///
    /// The push is skipped when the remote itself advertises `<branch>` at
    /// HEAD, and when HEAD has no commit yet.
    pub fn push(
        &self,
        remote_name: &str,
        branch: &str,
        username: Option<&str>,
        token: Option<&str>,
    ) -> Result<PushOutcome> {
        let head = match self.repo.head() {
            Ok(head) => head,
            Err(e)
                if e.code() == git2::ErrorCode::UnbornBranch
                    || e.code() == git2::ErrorCode::NotFound =>
            {
                tracing::info!("HEAD is unborn, nothing to push");
                return Ok(PushOutcome::NothingToPush);
            }
            Err(e) => return Err(e.into()),
        };
        let head_oid = head.peel_to_commit()?.id();

        let mut remote = self.repo.find_remote(remote_name).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                PushDeployError::RemoteNotFound(remote_name.to_string())
            } else {
                PushDeployError::Git(e)
            }
        })?;

        let destination = format!("refs/heads/{}", branch);
        if self.advertised_tip(&mut remote, &destination, username, token)? == Some(head_oid) {
            tracing::info!(
                "{} already at {} on {}, skipping push",
                destination,
                head_oid,
                remote_name
            );
            return Ok(PushOutcome::UpToDate {
                oid: head_oid.to_string(),
                branch: branch.to_string(),
            });
        }

        let source = if head.is_branch() {
            head.name().unwrap_or("HEAD").to_string()
        } else {
            "HEAD".to_string()
        };
        let refspec = format!("{}:{}", source, destination);

        tracing::info!(
            "Pushing {} to {} ({})",
            refspec,
            remote_name,
            crate::models::redact_url(remote.url().unwrap_or(""))
        );

        let (mut push_opts, rejections) =
            get_push_options(username.map(str::to_string), token.map(str::to_string));

        remote
            .push(&[refspec.as_str()], Some(&mut push_opts))
            .map_err(|e| {
                if e.code() == git2::ErrorCode::NotFastForward {
                    PushDeployError::PushRejected {
                        reference: destination.clone(),
                        reason: e.message().to_string(),
                    }
                } else {
                    PushDeployError::from_transport(e)
                }
            })?;

        if let Some((reference, reason)) = rejections.first() {
            return Err(PushDeployError::PushRejected { reference, reason });
        }

        if head.is_branch() {
            self.set_upstream(&head, remote_name, branch);
        }

        Ok(PushOutcome::Pushed {
            oid: head_oid.to_string(),
            branch: branch.to_string(),
        })
    }

    fn set_upstream(&self, head: &git2::Reference, remote_name: &str, branch: &str) {
        let Some(local_name) = head.shorthand() else {
            return;
        };
        let upstream_name = format!("{}/{}", remote_name, branch);
        let result = self
            .repo
            .find_branch(local_name, git2::BranchType::Local)
            .and_then(|mut local| local.set_upstream(Some(&upstream_name)));
        if let Err(e) = result {
            tracing::debug!("Could not set upstream {}: {}", upstream_name, e.message());
        }
    }

    /// Tip of `reference` as the remote advertises it right now
    fn advertised_tip(
        &self,
        remote: &mut git2::Remote,
        reference: &str,
        username: Option<&str>,
        token: Option<&str>,
    ) -> Result<Option<git2::Oid>> {
        let callbacks = CredentialsHelper::new_with_token(
            username.map(str::to_string),
            token.map(str::to_string),
        )
        .get_callbacks();

        let connection = remote
            .connect_auth(git2::Direction::Push, Some(callbacks), None)
            .map_err(PushDeployError::from_transport)?;
        let tip = connection
            .list()?
            .iter()
            .find(|head| head.name() == reference)
            .map(|head| head.oid());

        tracing::debug!("Remote advertises {} at {:?}", reference, tip);
        Ok(tip)
    }

    /// Target of `refs/remotes/<remote>/<branch>`, if known locally
    #[cfg(test)]
    fn tracking_oid(&self, remote_name: &str, branch: &str) -> Option<String> {
        self.repo
            .find_reference(&format!("refs/remotes/{}/{}", remote_name, branch))
            .ok()
            .and_then(|r| r.target())
            .map(|oid| oid.to_string())
    }
}
