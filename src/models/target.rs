use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AppError, AppResult};
use crate::infrastructure::document_store::{Collection, Predicate};

/// Kind of record a comment or vote points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Question,
    Answer,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Question => "question",
            TargetKind::Answer => "answer",
        }
    }

    pub fn parse(kind: &str) -> AppResult<Self> {
        match kind {
            "question" => Ok(TargetKind::Question),
            "answer" => Ok(TargetKind::Answer),
            _ => Err(AppError::Validation(
                "Invalid type. Must be 'question' or 'answer'".to_string(),
            )),
        }
    }

    pub fn collection(&self) -> Collection {
        match self {
            TargetKind::Question => Collection::Questions,
            TargetKind::Answer => Collection::Answers,
        }
    }
}

/// Polymorphic reference from a comment or vote to a question or an answer.
/// On the wire and in storage it is the `type` + `typeId` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "TargetRef", into = "TargetRef")]
pub enum Target {
    Question(String),
    Answer(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TargetRef {
    #[serde(rename = "type")]
    kind: TargetKind,
    #[serde(rename = "typeId")]
    type_id: String,
}

impl From<TargetRef> for Target {
    fn from(r: TargetRef) -> Self {
        Target::new(r.kind, r.type_id)
    }
}

impl From<Target> for TargetRef {
    fn from(t: Target) -> Self {
        TargetRef {
            kind: t.kind(),
            type_id: t.id().to_string(),
        }
    }
}

impl Target {
    pub fn new(kind: TargetKind, id: impl Into<String>) -> Self {
        match kind {
            TargetKind::Question => Target::Question(id.into()),
            TargetKind::Answer => Target::Answer(id.into()),
        }
    }

    /// Build a target from the raw request pair, rejecting unknown kinds
    pub fn parse(kind: &str, id: &str) -> AppResult<Self> {
        let kind = TargetKind::parse(kind)?;
        if id.trim().is_empty() {
            return Err(AppError::Validation("Missing required fields".to_string()));
        }
        Ok(Target::new(kind, id.trim()))
    }

    pub fn kind(&self) -> TargetKind {
        match self {
            Target::Question(_) => TargetKind::Question,
            Target::Answer(_) => TargetKind::Answer,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Target::Question(id) | Target::Answer(id) => id,
        }
    }

    /// Filters selecting every record pointing at this target
    pub fn predicates(&self) -> Vec<Predicate> {
        vec![
            Predicate::equal("type", self.kind().as_str()),
            Predicate::equal("typeId", self.id()),
        ]
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind().as_str(), self.id())
    }
}
