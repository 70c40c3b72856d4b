use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::AppResult;
use crate::infrastructure::document_store::{Collection, DocumentStore, Predicate};
use crate::models::question::QuestionFields;

/// Questions examined when counting tags
const TAG_SCAN_LIMIT: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub name: String,
    pub count: u64,
}

pub struct TagService {
    store: Arc<dyn DocumentStore>,
}

impl TagService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Tag usage across the most recent questions, most used first
    pub async fn tag_counts(&self, search: Option<&str>) -> AppResult<Vec<TagCount>> {
        let listed = self
            .store
            .list(
                Collection::Questions,
                &[
                    Predicate::order_desc("$createdAt"),
                    Predicate::Limit(TAG_SCAN_LIMIT),
                ],
            )
            .await?;

        let mut counts: HashMap<String, u64> = HashMap::new();
        for doc in &listed.documents {
            let fields: QuestionFields = doc.decode()?;
            for tag in fields.tags {
                *counts.entry(tag).or_default() += 1;
            }
        }

        let needle = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);
        let mut tags: Vec<TagCount> = counts
            .into_iter()
            .filter(|(name, _)| match &needle {
                Some(needle) => name.to_lowercase().contains(needle),
                None => true,
            })
            .map(|(name, count)| TagCount { name, count })
            .collect();
        tags.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
        Ok(tags)
    }
}
