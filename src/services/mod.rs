// Application services built on the document store, attachment store and user directory

pub mod answer_service;
pub mod cascade;
pub mod comment_service;
pub mod pagination;
pub mod question_service;
pub mod reputation;
pub mod sweeper;
pub mod tag_service;
pub mod user_service;
pub mod vote_service;

pub use answer_service::AnswerService;
pub use cascade::{CascadeDeleter, DeletedSummary, DeletionCounts};
pub use comment_service::CommentService;
pub use pagination::Pagination;
pub use question_service::QuestionService;
pub use reputation::{ReputationLevel, ReputationService};
pub use sweeper::{OrphanSweeper, SweepReport};
pub use tag_service::TagService;
pub use user_service::UserService;
pub use vote_service::VoteService;

/// A request field that is present and not blank, trimmed
pub(crate) fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
