//! Git credentials service
//!
//! Supplies libgit2 with credentials for the push. The access token is handed
//! over through the credentials callback so it never has to be written into
//! the remote URL or the repository config.

use std::cell::RefCell;
use std::rc::Rc;

use git2::{Cred, CredentialType, RemoteCallbacks};

/// Credentials helper that provides git2 remote callbacks with authentication support
#[derive(Debug, Default)]
pub struct CredentialsHelper {
    /// User name sent with the token when the URL carries none
    username: Option<String>,
    /// Token used for HTTPS basic auth
    token: Option<String>,
}

impl CredentialsHelper {
    /// Create new credentials helper with a specific user and token
    pub fn new_with_token(username: Option<String>, token: Option<String>) -> Self {
        Self { username, token }
    }

    /// Get remote callbacks configured with credential support
    pub fn get_callbacks<'a>(&self) -> RemoteCallbacks<'a> {
        let username = self.username.clone();
        let token = self.token.clone();
        let mut tried_ssh_agent = false;
        let mut tried_ssh_key = false;
        let mut tried_token = false;

        let mut callbacks = RemoteCallbacks::new();

        callbacks.credentials(move |url, username_from_url, allowed_types| {
            tracing::debug!(
                "Credential callback: url={}, username={:?}, allowed={:?}",
                crate::models::redact_url(url),
                username_from_url,
                allowed_types
            );

            if let Some(ref token_value) = token {
                if allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) && !tried_token {
                    tried_token = true;
                    let user = username_from_url
                        .or(username.as_deref())
                        .unwrap_or("git");
                    tracing::debug!("Using configured token for {}", user);
                    return Cred::userpass_plaintext(user, token_value);
                }
            }

            if allowed_types.contains(CredentialType::SSH_KEY) && !tried_ssh_agent {
                tried_ssh_agent = true;
                let user = username_from_url.unwrap_or("git");
                tracing::debug!("Trying SSH agent for user: {}", user);
                if let Ok(cred) = Cred::ssh_key_from_agent(user) {
                    return Ok(cred);
                }
            }

            if allowed_types.contains(CredentialType::SSH_KEY) && !tried_ssh_key {
                tried_ssh_key = true;
                let user = username_from_url.unwrap_or("git");

                if let Some(home) = dirs::home_dir() {
                    for key_name in &["id_ed25519", "id_rsa", "id_ecdsa"] {
                        let private_key = home.join(".ssh").join(key_name);
                        let public_key = home.join(".ssh").join(format!("{}.pub", key_name));

                        if private_key.exists() {
                            tracing::debug!("Trying SSH key: {:?}", private_key);
                            if let Ok(cred) =
                                Cred::ssh_key(user, Some(&public_key), &private_key, None)
                            {
                                return Ok(cred);
                            }
                        }
                    }
                }
            }

            if allowed_types.contains(CredentialType::DEFAULT) {
                tracing::debug!("Trying default credentials");
                return Cred::default();
            }

            Err(git2::Error::new(
                git2::ErrorCode::Auth,
                git2::ErrorClass::Callback,
                "No valid credentials found. Check GITHUB_TOKEN or configure SSH keys.",
            ))
        });

        callbacks
    }
}

/// Per-reference rejections reported by the server during a push
#[derive(Debug, Default, Clone)]
pub struct PushRejections(Rc<RefCell<Vec<(String, String)>>>);

impl PushRejections {
    /// First rejected reference and the server's reason, if any
    pub fn first(&self) -> Option<(String, String)> {
        self.0.borrow().first().cloned()
    }
}

/// Get push options with credential, progress and status callbacks.
///
/// The returned [`PushRejections`] fills in while the push runs; libgit2
/// reports a rejected reference there rather than as an error.
pub fn get_push_options<'a>(
    username: Option<String>,
    token: Option<String>,
) -> (git2::PushOptions<'a>, PushRejections) {
    let rejections = PushRejections::default();
    let mut callbacks = CredentialsHelper::new_with_token(username, token).get_callbacks();

    let sink = rejections.clone();
    callbacks.push_update_reference(move |refname, status| {
        if let Some(reason) = status {
            tracing::warn!("Remote rejected {}: {}", refname, reason);
            sink.0
                .borrow_mut()
                .push((refname.to_string(), reason.to_string()));
        }
        Ok(())
    });

    callbacks.sideband_progress(|data| {
        if let Ok(msg) = std::str::from_utf8(data) {
            let msg = msg.trim();
            if !msg.is_empty() {
                tracing::info!("Remote: {}", msg);
            }
        }
        true
    });

    callbacks.push_transfer_progress(|current, total, bytes| {
        if total > 0 {
            let percent = (current as f64 / total as f64) * 100.0;
            tracing::debug!(
                "Push progress: {}/{} objects ({:.1}%), {} bytes",
                current,
                total,
                percent,
                bytes
            );
        }
    });

    let mut push_opts = git2::PushOptions::new();
    push_opts.remote_callbacks(callbacks);
    (push_opts, rejections)
}
