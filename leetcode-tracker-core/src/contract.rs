//! # contract: seams between the push pipeline and the outside world
//!
//! This module defines the traits the core talks to and the plain data types
//! that cross them:
//! - [`RemoteApi`]: the hosted-repository REST API (file contents, repository
//!   lookup/creation, authenticated user).
//! - [`KeyValueStore`]: process-wide persisted storage backing the identity cache.
//! - [`IdentityExchange`]: the external service turning an OAuth code into a token.
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall`, so consumers get `MockRemoteApi`,
//!   `MockKeyValueStore` and `MockIdentityExchange` for unit/integration tests
//!   (exported with the `test-export-mocks` feature, on by default).
//! - [`crate::testkit::InMemoryRemote`] is a stateful fake of [`RemoteApi`] for
//!   end-to-end pipeline tests.
//!
//! ## Errors
//! - Trait methods return boxed `Send + Sync` errors; implementors convert all
//!   upstream failures (status codes, transport, decoding) into them.
//! - A 404 is not an error where the contract says so: `get_file` returns
//!   `Ok(None)` and `get_repository` returns [`RepoLookup::NotFound`].

use async_trait::async_trait;
use serde_json::Value;

use mockall::automock;

use crate::identity::Identity;

/// Error type for remote calls (transport, auth, unexpected status).
pub type ApiError = Box<dyn std::error::Error + Send + Sync>;

/// Error type for the key-value store.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Identifies the target repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A file as returned by the remote content API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub path: String,
    /// Transport encoding (base64, possibly wrapped with line breaks).
    pub encoded_content: String,
    /// Conflict token (blob sha) required when updating this file.
    pub sha: String,
}

/// A create-or-update request for a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutFileRequest {
    pub path: String,
    /// Commit message for the revision this write creates.
    pub message: String,
    /// Base64 payload, exactly as it is sent over the wire.
    pub encoded_content: String,
    /// Present for updates, absent for creates.
    pub sha: Option<String>,
}

/// Outcome of a repository existence check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoLookup {
    Found,
    NotFound,
}

/// Parameters for creating the target repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRepository {
    pub name: String,
    pub description: String,
    pub private: bool,
}

/// The hosted-repository REST API.
///
/// Every call carries the identity whose token authorises it; the core never
/// caches tokens outside the identity cache.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Fetch a file. `Ok(None)` when the file does not exist.
    async fn get_file(
        &self,
        identity: &Identity,
        repo: &RepoRef,
        path: &str,
    ) -> Result<Option<RemoteFile>, ApiError>;

    /// Create or update a file; one call creates exactly one revision.
    async fn put_file(
        &self,
        identity: &Identity,
        repo: &RepoRef,
        request: PutFileRequest,
    ) -> Result<(), ApiError>;

    /// Existence check. Any status other than success or 404 is an error.
    async fn get_repository(
        &self,
        identity: &Identity,
        repo: &RepoRef,
    ) -> Result<RepoLookup, ApiError>;

    /// Create a repository owned by the authenticated user.
    async fn create_repository(
        &self,
        identity: &Identity,
        request: NewRepository,
    ) -> Result<(), ApiError>;

    /// Resolve the login name of the token's owner.
    async fn get_authenticated_user(&self, token: &str) -> Result<String, ApiError>;
}

/// Asynchronous persisted key-value storage.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Remove every key.
    async fn clear(&self) -> Result<(), StoreError>;
}

/// Exchanges an OAuth authorization code for an access token.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait IdentityExchange: Send + Sync {
    async fn exchange_code(&self, code: &str) -> Result<String, ApiError>;
}
