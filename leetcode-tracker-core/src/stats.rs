//! Stats aggregator: per-difficulty solve counters kept in the repository.
//!
//! The update is a plain read-increment-write. Two pushes reading before
//! either writes will lose one increment; nothing here detects that.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::content_store::{ContentStore, ContentStoreError, FileContent};
use crate::contract::RemoteApi;
use crate::submission::Difficulty;

pub const STATS_PATH: &str = "stats/summary.json";

/// Counter document stored at [`STATS_PATH`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatsDocument {
    #[serde(default)]
    pub easy: u64,
    #[serde(default)]
    pub medium: u64,
    #[serde(default)]
    pub hard: u64,
    #[serde(default)]
    pub total: u64,
}

impl StatsDocument {
    pub fn count(&self, difficulty: Difficulty) -> u64 {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Medium => self.medium,
            Difficulty::Hard => self.hard,
        }
    }

    /// One solve of `difficulty` and nothing else.
    pub fn single(difficulty: Difficulty) -> Self {
        let mut stats = Self {
            total: 1,
            ..Self::default()
        };
        *stats.bucket_mut(difficulty) = 1;
        stats
    }

    fn bucket_mut(&mut self, difficulty: Difficulty) -> &mut u64 {
        match difficulty {
            Difficulty::Easy => &mut self.easy,
            Difficulty::Medium => &mut self.medium,
            Difficulty::Hard => &mut self.hard,
        }
    }

    /// Bump one bucket and the total. `None` if either counter would overflow.
    pub fn record(&self, difficulty: Difficulty) -> Option<Self> {
        let mut next = *self;
        let bucket = next.bucket_mut(difficulty);
        *bucket = bucket.checked_add(1)?;
        next.total = next.total.checked_add(1)?;
        Some(next)
    }

    pub fn is_consistent(&self) -> bool {
        self.easy
            .checked_add(self.medium)
            .and_then(|sum| sum.checked_add(self.hard))
            == Some(self.total)
    }

    /// Pretty-printed JSON as stored in the repository.
    pub fn to_json(&self) -> String {
        // A struct of integers always serialises.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Current stats; absent, unparseable or inconsistent documents count as zero.
pub async fn read_stats<A: RemoteApi + ?Sized>(
    store: &ContentStore<'_, A>,
) -> Result<StatsDocument, ContentStoreError> {
    let file = match store.read_file(STATS_PATH).await {
        Ok(Some(file)) => file,
        Ok(None) => {
            info!("No stats document yet, starting from zero");
            return Ok(StatsDocument::default());
        }
        Err(ContentStoreError::Decode { path, source }) => {
            warn!(path = %path, error = %source, "Stats document is not valid base64, starting from zero");
            return Ok(StatsDocument::default());
        }
        Err(e) => return Err(e),
    };

    match serde_json::from_slice::<StatsDocument>(&file.content) {
        Ok(stats) if stats.is_consistent() => Ok(stats),
        Ok(stats) => {
            warn!(?stats, "Stats document total does not match its buckets, starting from zero");
            Ok(StatsDocument::default())
        }
        Err(e) => {
            warn!(error = %e, "Stats document is unparseable, starting from zero");
            Ok(StatsDocument::default())
        }
    }
}

/// Read, increment `difficulty` and `Total`, write back. Returns the written document.
pub async fn update_stats<A: RemoteApi + ?Sized>(
    store: &ContentStore<'_, A>,
    difficulty: Difficulty,
) -> Result<StatsDocument, ContentStoreError> {
    let current = read_stats(store).await?;
    let stats = match current.record(difficulty) {
        Some(stats) => stats,
        None => {
            warn!(stats = ?current, "Stats counter would overflow, starting from zero");
            StatsDocument::single(difficulty)
        }
    };
    store
        .write_file(STATS_PATH, FileContent::Text(stats.to_json()))
        .await?;
    info!(
        difficulty = %difficulty,
        count = stats.count(difficulty),
        total = stats.total,
        "Updated stats"
    );
    Ok(stats)
}
