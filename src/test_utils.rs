//! Test fixtures: temporary repositories, bare remotes and a one-shot HTTP stub

#![cfg(test)]

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::PathBuf;
use std::thread::JoinHandle;

use tempfile::TempDir;

/// A temporary git working copy
pub struct TestRepo {
    pub dir: TempDir,
    pub path: PathBuf,
}

impl TestRepo {
    /// Create a new empty git repository
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().to_path_buf();

        let repo = git2::Repository::init(&path).expect("Failed to init repo");

        let mut config = repo.config().expect("Failed to get config");
        config
            .set_str("user.name", "Test User")
            .expect("Failed to set user.name");
        config
            .set_str("user.email", "test@example.com")
            .expect("Failed to set user.email");

        Self { dir, path }
    }

    /// Create a repository with an initial commit
    pub fn with_initial_commit() -> Self {
        let test_repo = Self::new();
        test_repo.create_commit("Initial commit", &[("README.md", "# Test Repo")]);
        test_repo
    }

    pub fn path_str(&self) -> String {
        self.path.to_string_lossy().to_string()
    }

    pub fn repo(&self) -> git2::Repository {
        git2::Repository::open(&self.path).expect("Failed to open repo")
    }

    /// Write a file into the working tree, creating parent directories
    pub fn create_file(&self, name: &str, content: &str) {
        let file_path = self.path.join(name);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        std::fs::write(&file_path, content).expect("Failed to write file");
    }

    /// Write, stage and commit the given files
    pub fn create_commit(&self, message: &str, files: &[(&str, &str)]) -> git2::Oid {
        let repo = self.repo();
        let mut index = repo.index().expect("Failed to get index");

        for (name, content) in files {
            self.create_file(name, content);
            index
                .add_path(std::path::Path::new(name))
                .expect("Failed to stage file");
        }
        index.write().expect("Failed to write index");

        let tree_oid = index.write_tree().expect("Failed to write tree");
        let tree = repo.find_tree(tree_oid).expect("Failed to find tree");
        let sig = repo.signature().expect("Failed to get signature");

        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.as_ref().into_iter().collect();

        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .expect("Failed to create commit")
    }

    pub fn head_oid(&self) -> git2::Oid {
        let repo = self.repo();
        let head = repo.head().expect("Failed to get HEAD");
        head.target().expect("Failed to get target")
    }

    pub fn commit_count(&self) -> usize {
        let repo = self.repo();
        let mut revwalk = repo.revwalk().expect("Failed to create revwalk");
        if revwalk.push_head().is_err() {
            return 0;
        }
        revwalk.count()
    }

    pub fn add_remote(&self, name: &str, url: &str) {
        let repo = self.repo();
        repo.remote(name, url).expect("Failed to add remote");
    }
}

impl Default for TestRepo {
    fn default() -> Self {
        Self::new()
    }
}

/// A temporary bare repository used as a push target
pub struct BareRemote {
    pub dir: TempDir,
    pub path: PathBuf,
}

impl BareRemote {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().to_path_buf();
        git2::Repository::init_bare(&path).expect("Failed to init bare repo");
        Self { dir, path }
    }

    pub fn path_str(&self) -> String {
        self.path.to_string_lossy().to_string()
    }

    /// Tip of `refs/heads/<branch>`, if the branch exists
    pub fn branch_tip(&self, branch: &str) -> Option<git2::Oid> {
        let repo = git2::Repository::open_bare(&self.path).expect("Failed to open bare repo");
        let reference = repo.find_reference(&format!("refs/heads/{}", branch)).ok()?;
        reference.target()
    }

    /// Delete `refs/heads/<branch>` behind the publisher's back
    pub fn delete_branch(&self, branch: &str) {
        let repo = git2::Repository::open_bare(&self.path).expect("Failed to open bare repo");
        repo.find_reference(&format!("refs/heads/{}", branch))
            .expect("Branch not found")
            .delete()
            .expect("Failed to delete branch");
    }

    /// Force `refs/heads/<branch>` to `oid`
    pub fn set_branch(&self, branch: &str, oid: git2::Oid) {
        let repo = git2::Repository::open_bare(&self.path).expect("Failed to open bare repo");
        repo.reference(&format!("refs/heads/{}", branch), oid, true, "reset")
            .expect("Failed to set branch");
    }
}

/// Request captured by [`HttpStub`]
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub target: String,
    /// Header names are lowercased
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// Loopback HTTP server that answers exactly one request with a canned
/// response and hands the request back to the test.
pub struct HttpStub {
    pub base_url: String,
    handle: JoinHandle<CapturedRequest>,
}

impl HttpStub {
    pub fn respond(status: u16, body: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind stub");
        let port = listener.local_addr().expect("No local addr").port();
        let body = body.to_string();

        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("Failed to accept");
            let request = read_request(&mut stream);

            let response = format!(
                "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream
                .write_all(response.as_bytes())
                .expect("Failed to write response");
            stream.flush().expect("Failed to flush response");
            request
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            handle,
        }
    }

    /// Wait for the stub to finish and return what it received
    pub fn captured(self) -> CapturedRequest {
        self.handle.join().expect("Stub thread panicked")
    }
}

fn read_request(stream: &mut std::net::TcpStream) -> CapturedRequest {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).expect("Failed to read request");
        assert!(n > 0, "Connection closed before headers were complete");
        buffer.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split(' ');
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();

    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    while buffer.len() < header_end + content_length {
        let n = stream.read(&mut chunk).expect("Failed to read body");
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
    }

    CapturedRequest {
        method,
        target,
        headers,
        body: String::from_utf8_lossy(&buffer[header_end..]).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_repo() {
        let repo = TestRepo::new();
        assert!(repo.path.join(".git").exists());
        assert_eq!(repo.commit_count(), 0);
    }

    #[test]
    fn test_create_commit() {
        let repo = TestRepo::with_initial_commit();
        repo.create_commit("Second", &[("a.txt", "a")]);
        assert_eq!(repo.commit_count(), 2);
    }

    #[test]
    fn test_bare_remote_starts_empty() {
        let remote = BareRemote::new();
        assert_eq!(remote.branch_tip("main"), None);
    }
}
