use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::pagination::Pagination;
use super::reputation::ReputationLevel;
use super::required;
use crate::error::{AppError, AppResult};
use crate::infrastructure::document_store::{Collection, DocumentStore, Predicate};
use crate::infrastructure::user_directory::UserDirectory;
use crate::models::User;

pub const TOP_CONTRIBUTORS: usize = 10;
pub const LEADERBOARD_PER_PAGE: u64 = 20;
/// Users examined when ranking by reputation
const USER_SCAN_LIMIT: usize = 100;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterUser {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedUser {
    pub id: String,
    pub name: String,
    pub reputation: i64,
    pub level: ReputationLevel,
}

impl From<&User> for RankedUser {
    fn from(user: &User) -> Self {
        let reputation = user.prefs.score();
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            reputation,
            level: ReputationLevel::for_score(reputation),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: User,
    pub reputation: i64,
    pub level: ReputationLevel,
    pub total_questions: u64,
    pub total_answers: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Leaderboard {
    pub users: Vec<RankedUser>,
    pub pagination: Pagination,
}

pub struct UserService {
    store: Arc<dyn DocumentStore>,
    users: Arc<dyn UserDirectory>,
}

impl UserService {
    pub fn new(store: Arc<dyn DocumentStore>, users: Arc<dyn UserDirectory>) -> Self {
        Self { store, users }
    }

    pub async fn register(&self, input: RegisterUser) -> AppResult<User> {
        let (name, email) = match (required(&input.name), required(&input.email)) {
            (Some(name), Some(email)) => (name, email),
            _ => return Err(AppError::Validation("Missing required fields".to_string())),
        };
        if !email.contains('@') {
            return Err(AppError::Validation("Invalid email address".to_string()));
        }
        let user = self.users.create(name, email).await?;
        info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    pub async fn profile(&self, user_id: &str) -> AppResult<UserProfile> {
        let authored = [Predicate::equal("authorId", user_id)];
        let (user, total_questions, total_answers) = futures::try_join!(
            self.users.get(user_id),
            self.store.count(Collection::Questions, &authored),
            self.store.count(Collection::Answers, &authored),
        )?;

        let reputation = user.prefs.score();
        Ok(UserProfile {
            user,
            reputation,
            level: ReputationLevel::for_score(reputation),
            total_questions,
            total_answers,
        })
    }

    pub async fn top_contributors(&self, limit: Option<usize>) -> AppResult<Vec<RankedUser>> {
        let mut ranked = self.ranked(None).await?;
        ranked.truncate(limit.unwrap_or(TOP_CONTRIBUTORS));
        Ok(ranked)
    }

    /// Users ranked by reputation, optionally filtered by a name or email fragment
    pub async fn leaderboard(&self, page: Option<u64>, search: Option<&str>) -> AppResult<Leaderboard> {
        let ranked = self.ranked(search).await?;
        let pagination = Pagination::new(page.unwrap_or(1), LEADERBOARD_PER_PAGE, ranked.len() as u64);
        let users = ranked
            .into_iter()
            .skip(pagination.offset())
            .take(pagination.limit())
            .collect();
        Ok(Leaderboard { users, pagination })
    }

    async fn ranked(&self, search: Option<&str>) -> AppResult<Vec<RankedUser>> {
        let users = self
            .users
            .list(&[Predicate::order_asc("$createdAt"), Predicate::Limit(USER_SCAN_LIMIT)])
            .await?;

        let needle = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);
        let mut ranked: Vec<RankedUser> = users
            .iter()
            .filter(|u| u.prefs.reputation.is_some())
            .filter(|u| match &needle {
                Some(needle) => {
                    u.name.to_lowercase().contains(needle) || u.email.to_lowercase().contains(needle)
                }
                None => true,
            })
            .map(RankedUser::from)
            .collect();
        ranked.sort_by(|a, b| b.reputation.cmp(&a.reputation));
        Ok(ranked)
    }
}
