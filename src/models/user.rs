use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Preference bag of a user; only `reputation` is interpreted, other keys are kept as-is
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPrefs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reputation: Option<i64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl UserPrefs {
    pub fn with_reputation(reputation: i64) -> Self {
        Self {
            reputation: Some(reputation),
            extra: Default::default(),
        }
    }

    /// Reputation with an unset counter read as zero
    pub fn score(&self) -> i64 {
        self.reputation.unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub prefs: UserPrefs,
    #[serde(skip)]
    pub revision: u64,
    pub created_at: DateTime<Utc>,
}

/// Author summary embedded in question listings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorSummary {
    pub id: String,
    pub name: String,
    pub reputation: i64,
}

impl From<&User> for AuthorSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            reputation: user.prefs.score(),
        }
    }
}
