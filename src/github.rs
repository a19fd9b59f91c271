//! GitHub REST v3 implementation of [`RemoteApi`].
//!
//! Only the handful of endpoints the push pipeline needs:
//! repository contents (GET/PUT), repository lookup and creation, and `GET /user`.

use std::time::Duration;

use async_trait::async_trait;
use leetcode_tracker_core::contract::{
    ApiError, NewRepository, PutFileRequest, RemoteApi, RemoteFile, RepoLookup, RepoRef,
};
use leetcode_tracker_core::identity::Identity;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use url::Url;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_USER_AGENT: &str = "leetcode-tracker";
const GITHUB_ACCEPT: &str = "application/vnd.github+json";

#[derive(Debug, thiserror::Error)]
pub enum GitHubError {
    #[error("request to GitHub failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{method} {url} returned {status}: {body}")]
    Status {
        method: Method,
        url: String,
        status: StatusCode,
        body: String,
    },

    #[error("invalid header value: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),

    #[error("invalid API base URL {0}")]
    InvalidBase(String),
}

/// Response shape of `GET /repos/{owner}/{repo}/contents/{path}` for a file.
#[derive(Debug, Deserialize)]
struct ContentsResponse {
    path: String,
    sha: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub(crate) struct PutContentsBody<'a> {
    pub message: &'a str,
    pub content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct CreateRepositoryBody<'a> {
    name: &'a str,
    description: &'a str,
    private: bool,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    login: String,
}

pub struct GitHubClient {
    http: Client,
    api_base: Url,
}

impl GitHubClient {
    pub fn new(api_base: &str, user_agent: &str, timeout: Duration) -> Result<Self, GitHubError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
        headers.insert(USER_AGENT, HeaderValue::from_str(user_agent)?);
        let http = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            api_base: parse_api_base(api_base)?,
        })
    }

    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    fn request(&self, method: Method, url: &str, token: &str) -> Result<RequestBuilder, GitHubError> {
        let mut bearer = HeaderValue::from_str(&format!("Bearer {token}"))?;
        bearer.set_sensitive(true);
        Ok(self.http.request(method, url).header(AUTHORIZATION, bearer))
    }

    async fn send(&self, method: Method, url: &str, request: RequestBuilder) -> Result<Response, GitHubError> {
        debug!(%method, url, "GitHub request");
        Ok(request.send().await.map_err(|e| {
            error!(%method, url, error = %e, "GitHub request failed");
            e
        })?)
    }
}

fn parse_api_base(api_base: &str) -> Result<Url, GitHubError> {
    let url = Url::parse(api_base).map_err(|_| GitHubError::InvalidBase(api_base.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(GitHubError::InvalidBase(api_base.to_string()));
    }
    Ok(url)
}

/// `base` with `segments` appended, each one percent-encoded on its own.
pub(crate) fn endpoint<'s>(
    base: &Url,
    segments: impl IntoIterator<Item = &'s str>,
) -> Result<Url, GitHubError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| GitHubError::InvalidBase(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Contents endpoint for `path`; `/` separates segments, anything else is encoded.
pub(crate) fn contents_url(base: &Url, repo: &RepoRef, path: &str) -> Result<Url, GitHubError> {
    let prefix = ["repos", repo.owner.as_str(), repo.name.as_str(), "contents"];
    endpoint(
        base,
        prefix
            .into_iter()
            .chain(path.trim_start_matches('/').split('/')),
    )
}

pub(crate) fn repository_url(base: &Url, repo: &RepoRef) -> Result<Url, GitHubError> {
    endpoint(base, ["repos", repo.owner.as_str(), repo.name.as_str()])
}

/// Turn a non-success response into [`GitHubError::Status`], keeping the body for the log.
async fn status_error(method: Method, url: &str, response: Response) -> GitHubError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    error!(%method, url, %status, body = %body, "GitHub returned an error status");
    GitHubError::Status {
        method,
        url: url.to_string(),
        status,
        body,
    }
}

#[async_trait]
impl RemoteApi for GitHubClient {
    async fn get_file(
        &self,
        identity: &Identity,
        repo: &RepoRef,
        path: &str,
    ) -> Result<Option<RemoteFile>, ApiError> {
        let url = contents_url(&self.api_base, repo, path)?.to_string();
        let request = self.request(Method::GET, &url, &identity.token)?;
        let response = self.send(Method::GET, &url, request).await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(%repo, path, "File not present");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(status_error(Method::GET, &url, response).await.into());
        }

        let body: ContentsResponse = response.json().await.map_err(GitHubError::from)?;
        Ok(Some(RemoteFile {
            path: body.path,
            encoded_content: body.content,
            sha: body.sha,
        }))
    }

    async fn put_file(
        &self,
        identity: &Identity,
        repo: &RepoRef,
        request: PutFileRequest,
    ) -> Result<(), ApiError> {
        let url = contents_url(&self.api_base, repo, &request.path)?.to_string();
        let body = PutContentsBody {
            message: &request.message,
            content: &request.encoded_content,
            sha: request.sha.as_deref(),
        };
        let builder = self.request(Method::PUT, &url, &identity.token)?.json(&body);
        let response = self.send(Method::PUT, &url, builder).await?;

        if !response.status().is_success() {
            return Err(status_error(Method::PUT, &url, response).await.into());
        }
        info!(%repo, path = %request.path, update = request.sha.is_some(), "File committed");
        Ok(())
    }

    async fn get_repository(
        &self,
        identity: &Identity,
        repo: &RepoRef,
    ) -> Result<RepoLookup, ApiError> {
        let url = repository_url(&self.api_base, repo)?.to_string();
        let request = self.request(Method::GET, &url, &identity.token)?;
        let response = self.send(Method::GET, &url, request).await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(RepoLookup::NotFound),
            status if status.is_success() => Ok(RepoLookup::Found),
            _ => Err(status_error(Method::GET, &url, response).await.into()),
        }
    }

    async fn create_repository(
        &self,
        identity: &Identity,
        request: NewRepository,
    ) -> Result<(), ApiError> {
        let url = endpoint(&self.api_base, ["user", "repos"])?.to_string();
        let body = CreateRepositoryBody {
            name: &request.name,
            description: &request.description,
            private: request.private,
        };
        let builder = self.request(Method::POST, &url, &identity.token)?.json(&body);
        let response = self.send(Method::POST, &url, builder).await?;

        if !response.status().is_success() {
            return Err(status_error(Method::POST, &url, response).await.into());
        }
        info!(name = %request.name, private = request.private, "Repository created");
        Ok(())
    }

    async fn get_authenticated_user(&self, token: &str) -> Result<String, ApiError> {
        let url = endpoint(&self.api_base, ["user"])?.to_string();
        let request = self.request(Method::GET, &url, token)?;
        let response = self.send(Method::GET, &url, request).await?;

        if !response.status().is_success() {
            return Err(status_error(Method::GET, &url, response).await.into());
        }
        let user: UserResponse = response.json().await.map_err(GitHubError::from)?;
        Ok(user.login)
    }
}
