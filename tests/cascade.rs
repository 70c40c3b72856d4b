mod common;

use serde_json::json;
use std::sync::Arc;

use common::{fields, CountingAttachments, CountingStore};
use qa_forum::infrastructure::{AttachmentStore, Collection, DocumentStore};
use qa_forum::services::CascadeDeleter;

struct Fixture {
    store: Arc<CountingStore>,
    attachments: Arc<CountingAttachments>,
    cascade: CascadeDeleter,
}

fn fixture() -> Fixture {
    let store = Arc::new(CountingStore::new());
    let attachments = Arc::new(CountingAttachments::new());
    let cascade = CascadeDeleter::new(store.clone(), attachments.clone(), 4);
    Fixture {
        store,
        attachments,
        cascade,
    }
}

async fn question(store: &CountingStore, id: &str, attachment_id: Option<&str>) {
    store
        .create(
            Collection::Questions,
            id,
            fields(json!({
                "title": "How do lifetimes work?",
                "content": "Details inside",
                "authorId": "alice",
                "tags": ["rust"],
                "attachmentId": attachment_id,
            })),
        )
        .await
        .unwrap();
}

async fn answer(store: &CountingStore, id: &str, question_id: &str) {
    store
        .create(
            Collection::Answers,
            id,
            fields(json!({"content": "Like this", "authorId": "bob", "questionId": question_id})),
        )
        .await
        .unwrap();
}

async fn comment(store: &CountingStore, id: &str, kind: &str, target: &str) {
    store
        .create(
            Collection::Comments,
            id,
            fields(json!({"content": "+1", "authorId": "carol", "type": kind, "typeId": target})),
        )
        .await
        .unwrap();
}

async fn vote(store: &CountingStore, id: &str, kind: &str, target: &str) {
    store
        .create(
            Collection::Votes,
            id,
            fields(json!({"type": kind, "typeId": target, "voteStatus": "upvoted", "voterId": "dave"})),
        )
        .await
        .unwrap();
}

/// Q1 with an attachment, two answers and their comments and votes
async fn seed_q1(f: &Fixture) -> String {
    let attachment_id = f.attachments.upload(b"diagram".to_vec()).await.unwrap();
    question(&f.store, "Q1", Some(&attachment_id)).await;
    answer(&f.store, "A1", "Q1").await;
    answer(&f.store, "A2", "Q1").await;
    comment(&f.store, "C1", "answer", "A1").await;
    comment(&f.store, "C2", "answer", "A1").await;
    vote(&f.store, "V1", "answer", "A1").await;
    vote(&f.store, "V2", "answer", "A2").await;
    comment(&f.store, "C3", "question", "Q1").await;
    vote(&f.store, "V3", "question", "Q1").await;
    attachment_id
}

async fn remaining(store: &CountingStore) -> u64 {
    let mut total = 0;
    for collection in [
        Collection::Questions,
        Collection::Answers,
        Collection::Comments,
        Collection::Votes,
    ] {
        total += store.count(collection, &[]).await.unwrap();
    }
    total
}

#[tokio::test]
async fn test_delete_question_removes_everything() {
    let f = fixture();
    let attachment_id = seed_q1(&f).await;

    let deleted = f.cascade.delete_question("Q1", None).await.unwrap();

    assert_eq!(deleted.question.id, "Q1");
    assert_eq!(deleted.question.attachment_id.as_deref(), Some(attachment_id.as_str()));
    let counts = deleted.counts;
    assert_eq!(counts.answer_comments, 2);
    assert_eq!(counts.answer_votes, 2);
    assert_eq!(counts.answers, 2);
    assert_eq!(counts.question_comments, 1);
    assert_eq!(counts.question_votes, 1);
    assert_eq!(counts.attachments, 1);
    assert_eq!(counts.questions, 1);
    assert_eq!(counts.total(), 10);

    assert_eq!(f.store.delete_count(), 9);
    assert_eq!(f.attachments.delete_calls(), 1);
    assert_eq!(remaining(&f.store).await, 0);
    assert!(f.attachments.download(&attachment_id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_question_is_deleted_last() {
    let f = fixture();
    seed_q1(&f).await;

    f.cascade.delete_question("Q1", Some("alice")).await.unwrap();

    let deletes = f.store.deletes();
    assert_eq!(deletes.last(), Some(&(Collection::Questions, "Q1".to_string())));

    // Each answer goes after its own votes and comments
    let position = |id: &str| deletes.iter().position(|(_, d)| d == id).unwrap();
    assert!(position("C1") < position("A1"));
    assert!(position("C2") < position("A1"));
    assert!(position("V1") < position("A1"));
    assert!(position("V2") < position("A2"));
}

#[tokio::test]
async fn test_second_delete_reports_not_found() {
    let f = fixture();
    seed_q1(&f).await;

    f.cascade.delete_question("Q1", None).await.unwrap();
    let before = f.store.delete_count();

    let err = f.cascade.delete_question("Q1", None).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(f.store.delete_count(), before);
}

#[tokio::test]
async fn test_non_author_deletes_nothing() {
    let f = fixture();
    seed_q1(&f).await;

    let err = f.cascade.delete_question("Q1", Some("mallory")).await.unwrap_err();

    assert_eq!(err.status_code(), 403);
    assert_eq!(err.to_string(), "You are not authorized to delete this question");
    assert_eq!(f.store.delete_count(), 0);
    assert_eq!(f.attachments.delete_calls(), 0);
    assert_eq!(remaining(&f.store).await, 9);
}

#[tokio::test]
async fn test_question_without_dependents_or_attachment() {
    let f = fixture();
    question(&f.store, "Q2", None).await;

    let deleted = f.cascade.delete_question("Q2", None).await.unwrap();

    assert_eq!(deleted.counts.total(), 1);
    assert_eq!(deleted.counts.questions, 1);
    assert_eq!(f.attachments.delete_calls(), 0);
}

#[tokio::test]
async fn test_missing_attachment_is_skipped() {
    let f = fixture();
    question(&f.store, "Q3", Some("already-gone")).await;
    vote(&f.store, "V9", "question", "Q3").await;

    let deleted = f.cascade.delete_question("Q3", None).await.unwrap();

    assert_eq!(f.attachments.delete_calls(), 1);
    assert_eq!(deleted.counts.attachments, 0);
    assert_eq!(deleted.counts.question_votes, 1);
    assert_eq!(deleted.counts.questions, 1);
}

#[tokio::test]
async fn test_unaddressable_attachment_id_does_not_block_delete() {
    let f = fixture();
    question(&f.store, "Q4", Some("my file.png")).await;
    answer(&f.store, "A4", "Q4").await;

    let deleted = f.cascade.delete_question("Q4", None).await.unwrap();

    assert_eq!(deleted.counts.attachments, 0);
    assert_eq!(deleted.counts.answers, 1);
    assert_eq!(deleted.counts.questions, 1);
    assert_eq!(remaining(&f.store).await, 0);
}

#[tokio::test]
async fn test_store_failure_aborts_and_retry_completes() {
    let f = fixture();
    seed_q1(&f).await;
    f.store.fail_deletes_in(Some(Collection::Votes));

    let err = f.cascade.delete_question("Q1", None).await.unwrap_err();
    assert_eq!(err.status_code(), 503);
    assert_eq!(err.to_string(), "document store unavailable");

    // The question and attachment stay because they are removed last
    assert!(f.store.exists(Collection::Questions, "Q1").await.unwrap());
    assert_eq!(f.attachments.delete_calls(), 0);
    assert_eq!(f.store.deletes_in(Collection::Votes), 0);

    f.store.fail_deletes_in(None);
    let deleted = f.cascade.delete_question("Q1", None).await.unwrap();
    assert_eq!(deleted.counts.questions, 1);
    assert_eq!(remaining(&f.store).await, 0);
    assert_eq!(f.store.delete_count(), 9);
}

#[tokio::test]
async fn test_dependents_deleted_elsewhere_are_tolerated() {
    let f = fixture();
    seed_q1(&f).await;
    f.store.delete(Collection::Comments, "C1").await.unwrap();
    f.store.delete(Collection::Answers, "A2").await.unwrap();

    let deleted = f.cascade.delete_question("Q1", None).await.unwrap();

    assert_eq!(deleted.counts.answers, 1);
    assert_eq!(deleted.counts.answer_comments, 1);
    assert_eq!(deleted.counts.answer_votes, 1);
    // V2 still pointed at the answer removed beforehand
    assert_eq!(f.store.count(Collection::Votes, &[]).await.unwrap(), 1);
}

#[tokio::test]
async fn test_concurrent_deletes_of_same_question() {
    // Not serialized: either call may win and the other may see NotFound,
    // but the data ends up fully removed and nothing fails otherwise.
    let f = fixture();
    seed_q1(&f).await;

    let (first, second) = tokio::join!(
        f.cascade.delete_question("Q1", None),
        f.cascade.delete_question("Q1", None),
    );

    for result in [&first, &second] {
        if let Err(e) = result {
            assert!(e.is_not_found(), "unexpected error: {}", e);
        }
    }
    assert!(first.is_ok() || second.is_ok());
    assert_eq!(remaining(&f.store).await, 0);
    assert_eq!(f.store.delete_count(), 9);
}

#[tokio::test]
async fn test_unknown_question_is_not_found() {
    let f = fixture();
    let err = f.cascade.delete_question("nope", None).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(f.store.delete_count(), 0);
}
