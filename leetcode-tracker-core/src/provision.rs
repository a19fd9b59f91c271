//! Repository provisioner: make sure the target repository exists, creating
//! and seeding it on first use.

use chrono::NaiveDate;
use tracing::{error, info};

use crate::content_store::{ContentStore, ContentStoreError, FileContent};
use crate::contract::{ApiError, NewRepository, RemoteApi, RepoLookup, RepoRef};
use crate::identity::Identity;
use crate::readme::{render_readme, README_PATH};
use crate::stats::{StatsDocument, STATS_PATH};

pub const DEFAULT_REPO_NAME: &str = "leetcode-tracker";
pub const DEFAULT_DESCRIPTION: &str = "📊 Automated LeetCode Tracker";

/// What to create when the repository is missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySettings {
    pub name: String,
    pub description: String,
    pub private: bool,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_REPO_NAME.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            private: false,
        }
    }
}

impl RepositorySettings {
    pub fn repo_for(&self, identity: &Identity) -> RepoRef {
        RepoRef::new(identity.username.clone(), self.name.clone())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("repository lookup for {repo} failed: {source}")]
    Lookup {
        repo: RepoRef,
        #[source]
        source: ApiError,
    },

    #[error("repository creation for {repo} failed: {source}")]
    Create {
        repo: RepoRef,
        #[source]
        source: ApiError,
    },

    #[error("seeding {repo} failed: {source}")]
    Seed {
        repo: RepoRef,
        #[source]
        source: ContentStoreError,
    },
}

/// Whether [`ensure_repository`] had to create the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Provisioned {
    AlreadyPresent,
    Created,
}

/// Check-then-create. On creation, writes the initial README and a zeroed
/// stats document before returning, so later uploads always find both.
pub async fn ensure_repository<A: RemoteApi + ?Sized>(
    api: &A,
    identity: &Identity,
    settings: &RepositorySettings,
    today: NaiveDate,
) -> Result<Provisioned, ProvisionError> {
    let repo = settings.repo_for(identity);

    let lookup = api
        .get_repository(identity, &repo)
        .await
        .map_err(|source| {
            error!(repo = %repo, error = %source, "Repository lookup failed");
            ProvisionError::Lookup {
                repo: repo.clone(),
                source,
            }
        })?;

    if lookup == RepoLookup::Found {
        info!(repo = %repo, "Repository present");
        return Ok(Provisioned::AlreadyPresent);
    }

    info!(repo = %repo, private = settings.private, "Repository not found, creating");
    let request = NewRepository {
        name: settings.name.clone(),
        description: settings.description.clone(),
        private: settings.private,
    };
    api.create_repository(identity, request)
        .await
        .map_err(|source| {
            error!(repo = %repo, error = %source, "Repository creation failed");
            ProvisionError::Create {
                repo: repo.clone(),
                source,
            }
        })?;

    let store = ContentStore::new(api, identity, &repo);
    let zero = StatsDocument::default();
    let seed = [
        (README_PATH, render_readme(&zero, today)),
        (STATS_PATH, zero.to_json()),
    ];
    for (path, content) in seed {
        store
            .write_file(path, FileContent::Text(content))
            .await
            .map_err(|source| ProvisionError::Seed {
                repo: repo.clone(),
                source,
            })?;
    }

    info!(repo = %repo, "Repository created and seeded");
    Ok(Provisioned::Created)
}
