//! Content-store client: read and create-or-update single files by path.
//!
//! Writes always re-read the file first to pick up its current conflict token
//! (the blob sha). Tokens are never cached between writes, so a write only
//! conflicts when someone else changes the file between our read and our put.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{debug, error, info};

use crate::contract::{ApiError, PutFileRequest, RemoteApi, RepoRef};
use crate::identity::Identity;

/// Payload of a write, tagged with the encoding it is already in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    /// Plain text; base64-encoded for transport.
    Text(String),
    /// Binary data that is already base64; sent as-is.
    Base64(String),
}

impl FileContent {
    fn into_transport(self) -> String {
        match self {
            FileContent::Text(text) => STANDARD.encode(text.as_bytes()),
            FileContent::Base64(encoded) => encoded,
        }
    }
}

/// A decoded file plus the token needed to update it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub content: Vec<u8>,
    pub conflict_token: String,
}

impl StoredFile {
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ContentStoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: ApiError,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: ApiError,
    },

    #[error("{path} is not valid base64: {source}")]
    Decode {
        path: String,
        #[source]
        source: base64::DecodeError,
    },
}

/// Commit message used for every write.
pub fn commit_message(path: &str) -> String {
    format!("Update {path}")
}

/// File operations against one repository on behalf of one identity.
pub struct ContentStore<'a, A: ?Sized> {
    api: &'a A,
    identity: &'a Identity,
    repo: &'a RepoRef,
}

impl<'a, A: RemoteApi + ?Sized> ContentStore<'a, A> {
    pub fn new(api: &'a A, identity: &'a Identity, repo: &'a RepoRef) -> Self {
        Self {
            api,
            identity,
            repo,
        }
    }

    pub fn repo(&self) -> &RepoRef {
        self.repo
    }

    /// `Ok(None)` when the file does not exist.
    pub async fn read_file(&self, path: &str) -> Result<Option<StoredFile>, ContentStoreError> {
        let remote = self
            .api
            .get_file(self.identity, self.repo, path)
            .await
            .map_err(|source| {
                error!(repo = %self.repo, path, error = %source, "Remote read failed");
                ContentStoreError::Read {
                    path: path.to_string(),
                    source,
                }
            })?;

        let remote = match remote {
            Some(remote) => remote,
            None => {
                debug!(repo = %self.repo, path, "File not found");
                return Ok(None);
            }
        };

        // The API wraps base64 at 60 columns.
        let compact: String = remote
            .encoded_content
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let content = STANDARD
            .decode(compact.as_bytes())
            .map_err(|source| ContentStoreError::Decode {
                path: path.to_string(),
                source,
            })?;

        Ok(Some(StoredFile {
            content,
            conflict_token: remote.sha,
        }))
    }

    /// Create or update `path`. Looks up the current conflict token first.
    pub async fn write_file(
        &self,
        path: &str,
        content: FileContent,
    ) -> Result<(), ContentStoreError> {
        // Only the token matters here; the existing content is not decoded.
        let sha = self
            .api
            .get_file(self.identity, self.repo, path)
            .await
            .map_err(|source| {
                error!(repo = %self.repo, path, error = %source, "Conflict token lookup failed");
                ContentStoreError::Read {
                    path: path.to_string(),
                    source,
                }
            })?
            .map(|existing| existing.sha);

        let is_update = sha.is_some();
        let request = PutFileRequest {
            path: path.to_string(),
            message: commit_message(path),
            encoded_content: content.into_transport(),
            sha,
        };

        self.api
            .put_file(self.identity, self.repo, request)
            .await
            .map_err(|source| {
                error!(repo = %self.repo, path, error = %source, "Remote write failed");
                ContentStoreError::Write {
                    path: path.to_string(),
                    source,
                }
            })?;

        info!(repo = %self.repo, path, update = is_update, "Wrote file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_encoded_and_base64_passes_through() {
        assert_eq!(
            FileContent::Text("héllo".into()).into_transport(),
            STANDARD.encode("héllo".as_bytes())
        );
        assert_eq!(
            FileContent::Base64("iVBORw0KGgo=".into()).into_transport(),
            "iVBORw0KGgo="
        );
    }

    #[test]
    fn commit_message_names_the_path() {
        assert_eq!(commit_message("README.md"), "Update README.md");
    }
}
