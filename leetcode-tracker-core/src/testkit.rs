//! Stateful in-memory fake of [`RemoteApi`] for pipeline tests.
//!
//! Behaves like the hosted content API where it matters to the pipeline:
//! files carry a sha that changes on every write, a PUT on an existing file
//! must quote the current sha, and a PUT into a missing repository fails.
//! Every call is recorded so tests can assert on exact call sequences.
//!
//! ```rust,ignore
//! let remote = InMemoryRemote::new();
//! let orchestrator = PushOrchestrator::new(remote.clone(), store, exchange, settings);
//! orchestrator.push(&submission).await?;
//! assert_eq!(remote.create_repository_calls(), 1);
//! ```

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::contract::{ApiError, NewRepository, PutFileRequest, RemoteApi, RemoteFile, RepoLookup, RepoRef};
use crate::identity::Identity;

/// One recorded call against the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    GetFile { path: String },
    PutFile { path: String, sha: Option<String> },
    GetRepository,
    CreateRepository { name: String, private: bool },
    GetAuthenticatedUser,
}

#[derive(Debug, Default)]
struct Inner {
    repos: HashSet<String>,
    files: BTreeMap<(String, String), RemoteFile>,
    calls: Vec<RemoteCall>,
    next_sha: u64,
    user: Option<String>,
    fail_put: HashSet<String>,
    fail_lookup: bool,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryRemote {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Answer `GET /user` with `login`.
    pub fn with_user(self, login: &str) -> Self {
        self.lock().user = Some(login.to_string());
        self
    }

    pub fn add_repository(&self, repo: &RepoRef) {
        self.lock().repos.insert(repo.to_string());
    }

    pub fn has_repository(&self, repo: &RepoRef) -> bool {
        self.lock().repos.contains(&repo.to_string())
    }

    /// Store `content` as-is (already transport-encoded) at `path`.
    pub fn put_raw(&self, repo: &RepoRef, path: &str, encoded_content: &str) {
        let mut inner = self.lock();
        inner.next_sha += 1;
        let sha = format!("sha-{}", inner.next_sha);
        inner.files.insert(
            (repo.to_string(), path.to_string()),
            RemoteFile {
                path: path.to_string(),
                encoded_content: encoded_content.to_string(),
                sha,
            },
        );
    }

    /// Decoded content of `path`, if present and valid base64.
    pub fn file_bytes(&self, repo: &RepoRef, path: &str) -> Option<Vec<u8>> {
        let inner = self.lock();
        let file = inner.files.get(&(repo.to_string(), path.to_string()))?;
        STANDARD.decode(file.encoded_content.as_bytes()).ok()
    }

    pub fn file_text(&self, repo: &RepoRef, path: &str) -> Option<String> {
        self.file_bytes(repo, path)
            .and_then(|bytes| String::from_utf8(bytes).ok())
    }

    /// Transport payload exactly as stored.
    pub fn file_encoded(&self, repo: &RepoRef, path: &str) -> Option<String> {
        self.lock()
            .files
            .get(&(repo.to_string(), path.to_string()))
            .map(|file| file.encoded_content.clone())
    }

    pub fn paths(&self, repo: &RepoRef) -> Vec<String> {
        let key = repo.to_string();
        self.lock()
            .files
            .keys()
            .filter(|(r, _)| *r == key)
            .map(|(_, path)| path.clone())
            .collect()
    }

    /// Make every PUT to `path` fail.
    pub fn fail_put_on(&self, path: &str) {
        self.lock().fail_put.insert(path.to_string());
    }

    /// Make repository lookups fail with a non-404 error.
    pub fn fail_repository_lookup(&self) {
        self.lock().fail_lookup = true;
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Paths of all PUTs, in order.
    pub fn put_paths(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RemoteCall::PutFile { path, .. } => Some(path),
                _ => None,
            })
            .collect()
    }

    pub fn create_repository_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, RemoteCall::CreateRepository { .. }))
            .count()
    }
}

#[async_trait]
impl RemoteApi for InMemoryRemote {
    async fn get_file(
        &self,
        _identity: &Identity,
        repo: &RepoRef,
        path: &str,
    ) -> Result<Option<RemoteFile>, ApiError> {
        let mut inner = self.lock();
        inner.calls.push(RemoteCall::GetFile {
            path: path.to_string(),
        });
        Ok(inner
            .files
            .get(&(repo.to_string(), path.to_string()))
            .cloned())
    }

    async fn put_file(
        &self,
        _identity: &Identity,
        repo: &RepoRef,
        request: PutFileRequest,
    ) -> Result<(), ApiError> {
        let mut inner = self.lock();
        inner.calls.push(RemoteCall::PutFile {
            path: request.path.clone(),
            sha: request.sha.clone(),
        });

        if inner.fail_put.contains(&request.path) {
            return Err(format!("500 Internal Server Error writing {}", request.path).into());
        }
        if !inner.repos.contains(&repo.to_string()) {
            return Err(format!("404 Not Found: repository {repo}").into());
        }

        let key = (repo.to_string(), request.path.clone());
        let current_sha = inner.files.get(&key).map(|file| file.sha.clone());
        if current_sha != request.sha {
            return Err(format!(
                "409 Conflict: {} expected sha {:?}, got {:?}",
                request.path, current_sha, request.sha
            )
            .into());
        }

        inner.next_sha += 1;
        let sha = format!("sha-{}", inner.next_sha);
        inner.files.insert(
            key,
            RemoteFile {
                path: request.path,
                encoded_content: request.encoded_content,
                sha,
            },
        );
        Ok(())
    }

    async fn get_repository(
        &self,
        _identity: &Identity,
        repo: &RepoRef,
    ) -> Result<RepoLookup, ApiError> {
        let mut inner = self.lock();
        inner.calls.push(RemoteCall::GetRepository);
        if inner.fail_lookup {
            return Err("401 Unauthorized: Bad credentials".into());
        }
        if inner.repos.contains(&repo.to_string()) {
            Ok(RepoLookup::Found)
        } else {
            Ok(RepoLookup::NotFound)
        }
    }

    async fn create_repository(
        &self,
        identity: &Identity,
        request: NewRepository,
    ) -> Result<(), ApiError> {
        let mut inner = self.lock();
        inner.calls.push(RemoteCall::CreateRepository {
            name: request.name.clone(),
            private: request.private,
        });
        let repo = RepoRef::new(identity.username.clone(), request.name);
        if !inner.repos.insert(repo.to_string()) {
            return Err(format!("422 Unprocessable Entity: {repo} already exists").into());
        }
        Ok(())
    }

    async fn get_authenticated_user(&self, _token: &str) -> Result<String, ApiError> {
        let mut inner = self.lock();
        inner.calls.push(RemoteCall::GetAuthenticatedUser);
        inner
            .user
            .clone()
            .ok_or_else(|| ApiError::from("401 Unauthorized: no user for token"))
    }
}
