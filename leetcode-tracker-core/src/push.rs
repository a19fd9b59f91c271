//! Push orchestrator: one accepted submission → one sequence of remote writes.
//!
//! States run strictly in order:
//!
//! `Idle → Provisioning → UploadingArtifacts → UpdatingStats → RegeneratingReadme → Done`
//!
//! Any error moves straight to `Failed`. Nothing already written is rolled
//! back; a failed push leaves whatever files it managed to write and is not
//! retried.
//!
//! # Responsibilities
//! - Validate the submission and resolve the identity before any remote write
//! - Drive provisioning, artifact upload, stats and README in that order
//! - Own the pending-submission slot and the status indicator
//!
//! # Callable From
//! - [`crate::command`] dispatch (confirm/deny/capture messages)
//! - The CLI `push` command, which calls [`PushOrchestrator::push`] directly

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::artifacts::upload_artifacts;
use crate::content_store::{ContentStore, ContentStoreError, FileContent};
use crate::contract::{ApiError, IdentityExchange, KeyValueStore, RemoteApi, RepoRef, StoreError};
use crate::identity::{Identity, IdentityCache};
use crate::pending::{Pending, PendingSlot};
use crate::provision::{ensure_repository, ProvisionError, Provisioned, RepositorySettings};
use crate::readme::{render_readme, README_PATH};
use crate::stats::{update_stats, StatsDocument, STATS_PATH};
use crate::status::{PushStatus, StatusIndicator};
use crate::submission::{Difficulty, Submission, UnknownDifficulty};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PushState {
    Idle,
    Provisioning,
    UploadingArtifacts,
    UpdatingStats,
    RegeneratingReadme,
    Done,
    Failed,
}

impl std::fmt::Display for PushState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            PushState::Idle => "preparing",
            PushState::Provisioning => "provisioning the repository",
            PushState::UploadingArtifacts => "uploading artifacts",
            PushState::UpdatingStats => "updating stats",
            PushState::RegeneratingReadme => "regenerating the README",
            PushState::Done => "done",
            PushState::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("not logged in: no token cached")]
    NotAuthenticated,

    #[error("could not resolve the username for the cached token: {0}")]
    UserLookup(#[source] ApiError),

    #[error("identity storage failed: {0}")]
    IdentityStore(#[source] StoreError),

    #[error("invalid submission: {0}")]
    InvalidSubmission(String),

    #[error(transparent)]
    Difficulty(#[from] UnknownDifficulty),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error(transparent)]
    ContentStore(#[from] ContentStoreError),
}

/// A push that ended in [`PushState::Failed`] after stopping in `failed_in`.
#[derive(Debug, thiserror::Error)]
#[error("push failed while {failed_in}: {source}")]
pub struct PushFailure {
    /// Always [`PushState::Failed`].
    pub state: PushState,
    pub failed_in: PushState,
    #[source]
    pub source: PushError,
}

impl PushFailure {
    fn new(failed_in: PushState, source: impl Into<PushError>) -> Self {
        Self {
            state: advance(failed_in, PushState::Failed),
            failed_in,
            source: source.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("code exchange failed: {0}")]
    Exchange(#[source] ApiError),

    #[error("user lookup failed: {0}")]
    UserLookup(#[source] ApiError),

    #[error("identity storage failed: {0}")]
    Store(#[source] StoreError),
}

/// Outcome of a successful push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushReport {
    pub state: PushState,
    pub repository: String,
    pub provisioned: Provisioned,
    pub difficulty: Difficulty,
    /// Every path written, in write order (seed files excluded).
    pub written: Vec<String>,
    pub stats: StatsDocument,
}

fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

pub struct PushOrchestrator<A, S, X> {
    api: A,
    identities: IdentityCache<S>,
    exchange: X,
    settings: RepositorySettings,
    pending: PendingSlot,
    status: StatusIndicator,
    clock: fn() -> NaiveDate,
}

impl<A, S, X> PushOrchestrator<A, S, X>
where
    A: RemoteApi,
    S: KeyValueStore,
    X: IdentityExchange,
{
    pub fn new(api: A, store: S, exchange: X, settings: RepositorySettings) -> Self {
        Self {
            api,
            identities: IdentityCache::new(store),
            exchange,
            settings,
            pending: PendingSlot::new(),
            status: StatusIndicator::default(),
            clock: today_utc,
        }
    }

    pub fn with_status(mut self, status: StatusIndicator) -> Self {
        self.status = status;
        self
    }

    /// Date source for `meta.json` and the README footer.
    pub fn with_clock(mut self, clock: fn() -> NaiveDate) -> Self {
        self.clock = clock;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn identities(&self) -> &IdentityCache<S> {
        &self.identities
    }

    pub fn settings(&self) -> &RepositorySettings {
        &self.settings
    }

    pub fn status(&self) -> &StatusIndicator {
        &self.status
    }

    /// Park a freshly captured submission until the user confirms or denies.
    pub fn capture(&self, submission: Submission) -> u64 {
        info!(slug = %submission.slug, "Captured accepted submission");
        self.pending.set(submission)
    }

    pub fn pending(&self) -> Option<Pending> {
        self.pending.peek()
    }

    /// Drop the pending submission without pushing it.
    pub fn deny(&self) -> Option<Submission> {
        let dropped = self.pending.take_and_clear();
        if let Some(submission) = &dropped {
            info!(slug = %submission.slug, "Push denied, pending submission dropped");
        }
        dropped
    }

    /// Push the pending submission. `Ok(None)` when nothing is pending.
    ///
    /// The slot is cleared only when the push reaches `Done`, and only if no
    /// newer capture replaced it meanwhile.
    pub async fn confirm(&self) -> Result<Option<PushReport>, PushFailure> {
        let Pending { seq, submission } = match self.pending.peek() {
            Some(pending) => pending,
            None => {
                debug!("Push confirmed with nothing pending");
                return Ok(None);
            }
        };
        let report = self.push(&submission).await?;
        self.pending.clear_if_current(seq);
        Ok(Some(report))
    }

    /// Run the whole pipeline for `submission`.
    pub async fn push(&self, submission: &Submission) -> Result<PushReport, PushFailure> {
        self.status.set(PushStatus::Pushing);
        let result = self.run_pipeline(submission).await;
        match &result {
            Ok(report) => {
                info!(
                    slug = %submission.slug,
                    files = report.written.len(),
                    total = report.stats.total,
                    "[PUSH] Push complete"
                );
                self.status.flash(PushStatus::Succeeded);
            }
            Err(failure) => {
                error!(
                    slug = %submission.slug,
                    failed_in = ?failure.failed_in,
                    error = %failure.source,
                    "[PUSH][ERROR] Push failed"
                );
                self.status.flash(PushStatus::Failed);
            }
        }
        result
    }

    async fn run_pipeline(&self, submission: &Submission) -> Result<PushReport, PushFailure> {
        let mut state = PushState::Idle;
        info!(slug = %submission.slug, "[PUSH] Starting push");

        let difficulty = validate(submission).map_err(|e| PushFailure::new(state, e))?;
        let identity = self
            .resolve_identity()
            .await
            .map_err(|e| PushFailure::new(state, e))?;
        let today = (self.clock)();
        let repo: RepoRef = self.settings.repo_for(&identity);

        state = advance(state, PushState::Provisioning);
        let provisioned = ensure_repository(&self.api, &identity, &self.settings, today)
            .await
            .map_err(|e| PushFailure::new(state, e))?;

        let store = ContentStore::new(&self.api, &identity, &repo);

        state = advance(state, PushState::UploadingArtifacts);
        let mut written = upload_artifacts(&store, submission, difficulty, today)
            .await
            .map_err(|e| PushFailure::new(state, e))?;

        state = advance(state, PushState::UpdatingStats);
        let stats = update_stats(&store, difficulty)
            .await
            .map_err(|e| PushFailure::new(state, e))?;
        written.push(STATS_PATH.to_string());

        state = advance(state, PushState::RegeneratingReadme);
        store
            .write_file(README_PATH, FileContent::Text(render_readme(&stats, today)))
            .await
            .map_err(|e| PushFailure::new(state, e))?;
        written.push(README_PATH.to_string());

        state = advance(state, PushState::Done);
        Ok(PushReport {
            state,
            repository: repo.to_string(),
            provisioned,
            difficulty,
            written,
            stats,
        })
    }

    /// Cached identity, or cached token plus a freshly fetched username.
    pub async fn resolve_identity(&self) -> Result<Identity, PushError> {
        if let Some(identity) = self
            .identities
            .get_identity()
            .await
            .map_err(PushError::IdentityStore)?
        {
            return Ok(identity);
        }

        let token = self
            .identities
            .get_token()
            .await
            .map_err(PushError::IdentityStore)?
            .ok_or(PushError::NotAuthenticated)?;

        info!("Username not cached, fetching it for the cached token");
        let username = self
            .api
            .get_authenticated_user(&token)
            .await
            .map_err(PushError::UserLookup)?;
        self.identities
            .set_username(&username)
            .await
            .map_err(PushError::IdentityStore)?;
        Ok(Identity { token, username })
    }

    /// Exchange an OAuth code for a token and cache the resulting identity.
    pub async fn login(&self, code: &str) -> Result<Identity, LoginError> {
        let token = self
            .exchange
            .exchange_code(code)
            .await
            .map_err(LoginError::Exchange)?;
        self.identities
            .set_token(&token)
            .await
            .map_err(LoginError::Store)?;

        let username = self
            .api
            .get_authenticated_user(&token)
            .await
            .map_err(LoginError::UserLookup)?;
        self.identities
            .set_username(&username)
            .await
            .map_err(LoginError::Store)?;

        info!(username = %username, "Login successful");
        Ok(Identity { token, username })
    }

    pub async fn logout(&self) -> Result<(), StoreError> {
        self.identities.clear().await
    }
}

fn advance(from: PushState, to: PushState) -> PushState {
    debug!(from = ?from, to = ?to, "[PUSH] State transition");
    to
}

/// Plain kebab-case: lower-case ASCII letters and digits in `-`-separated words.
fn is_kebab_case(slug: &str) -> bool {
    !slug.is_empty()
        && slug.split('-').all(|word| {
            !word.is_empty()
                && word
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        })
}

/// Reject submissions that cannot be placed in the repository.
fn validate(submission: &Submission) -> Result<Difficulty, PushError> {
    if submission.slug.trim().is_empty() {
        return Err(PushError::InvalidSubmission("slug is empty".into()));
    }
    // The slug becomes a path segment; anything else could land outside problems/<Difficulty>/.
    if !is_kebab_case(&submission.slug) {
        return Err(PushError::InvalidSubmission(format!(
            "slug '{}' is not kebab-case",
            submission.slug
        )));
    }
    Ok(Difficulty::normalize(submission.difficulty.as_deref())?)
}
