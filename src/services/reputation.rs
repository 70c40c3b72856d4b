// Reputation ledger adjustments
// The counter lives in the user's preference bag; writes are guarded by the
// user document's revision and retried on conflict.

use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::{AppError, AppResult};
use crate::infrastructure::user_directory::UserDirectory;

const BASE_BACKOFF_MS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReputationLevel {
    Newcomer,
    Contributor,
    #[serde(rename = "Rising Star")]
    RisingStar,
    Expert,
    Legend,
}

impl ReputationLevel {
    pub fn for_score(reputation: i64) -> Self {
        match reputation {
            r if r >= 1000 => ReputationLevel::Legend,
            r if r >= 500 => ReputationLevel::Expert,
            r if r >= 100 => ReputationLevel::RisingStar,
            r if r >= 10 => ReputationLevel::Contributor,
            _ => ReputationLevel::Newcomer,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReputationLevel::Newcomer => "Newcomer",
            ReputationLevel::Contributor => "Contributor",
            ReputationLevel::RisingStar => "Rising Star",
            ReputationLevel::Expert => "Expert",
            ReputationLevel::Legend => "Legend",
        }
    }
}

pub struct ReputationService {
    users: Arc<dyn UserDirectory>,
    max_attempts: u32,
}

impl ReputationService {
    pub fn new(users: Arc<dyn UserDirectory>, max_attempts: u32) -> Self {
        Self {
            users,
            max_attempts: max_attempts.max(1),
        }
    }

    pub async fn on_answer_created(&self, author_id: &str) -> AppResult<i64> {
        self.adjust(author_id, 1).await
    }

    pub async fn on_answer_deleted(&self, author_id: &str) -> AppResult<i64> {
        self.adjust(author_id, -1).await
    }

    /// Add `delta` to the user's reputation and return the new value.
    /// Negative results are stored as-is.
    #[instrument(skip(self))]
    pub async fn adjust(&self, user_id: &str, delta: i64) -> AppResult<i64> {
        for attempt in 1..=self.max_attempts {
            let user = self.users.get(user_id).await?;
            let mut prefs = user.prefs;
            let next = prefs.score() + delta;
            prefs.reputation = Some(next);

            match self
                .users
                .update_prefs(user_id, prefs, Some(user.revision))
                .await
            {
                Ok(_) => {
                    debug!(reputation = next, attempt, "Reputation updated");
                    return Ok(next);
                }
                Err(AppError::Conflict(reason)) => {
                    debug!(attempt, "Reputation write lost a race: {}", reason);
                    if attempt < self.max_attempts {
                        tokio::time::sleep(backoff(attempt)).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        warn!(user_id, delta, "Giving up on reputation update");
        Err(AppError::Conflict(format!(
            "Reputation of user {} changed concurrently {} times; update not applied",
            user_id, self.max_attempts
        )))
    }
}

fn backoff(attempt: u32) -> Duration {
    let exponential = BASE_BACKOFF_MS << attempt.saturating_sub(1).min(6);
    let jitter = rand::rng().random_range(0..=BASE_BACKOFF_MS);
    Duration::from_millis(exponential + jitter)
}
