//! Remote models

use serde::{Deserialize, Serialize};

/// Remote repository information
///
/// `url` and `push_url` are always stored redacted so the model can be
/// logged and serialized without leaking embedded credentials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Remote {
    pub name: String,
    pub url: String,
    pub push_url: Option<String>,
}

impl Remote {
    pub fn from_git2(remote: &git2::Remote) -> Self {
        Remote {
            name: remote.name().unwrap_or("").to_string(),
            url: redact_url(remote.url().unwrap_or("")),
            push_url: remote.pushurl().map(redact_url),
        }
    }
}

/// Result of `ensure_remote`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteStatus {
    pub remote: Remote,
    /// True when the remote did not exist and was created by this run
    pub created: bool,
}

/// Strip any password from a URL, keeping the user name.
///
/// Non-URL remotes (scp-like SSH, local paths) are returned unchanged.
pub fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut parsed) if parsed.password().is_some() => {
            // set_password only fails for cannot-be-a-base URLs, which carry no password
            let _ = parsed.set_password(Some("***"));
            parsed.to_string()
        }
        _ => raw.to_string(),
    }
}
