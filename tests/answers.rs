mod common;

use std::sync::Arc;

use common::{ContendedUsers, CountingAttachments, CountingStore};
use qa_forum::app_state::AppState;
use qa_forum::config::Config;
use qa_forum::infrastructure::{Collection, DocumentStore, DocumentUserDirectory, UserDirectory};
use qa_forum::models::User;
use qa_forum::services::answer_service::{CreateAnswer, DeleteAnswer};
use qa_forum::services::comment_service::CreateComment;
use qa_forum::services::question_service::CreateQuestion;
use qa_forum::services::vote_service::CastVote;

fn state() -> (Arc<CountingStore>, AppState) {
    let store = Arc::new(CountingStore::new());
    let attachments = Arc::new(CountingAttachments::new());
    let users: Arc<dyn UserDirectory> = Arc::new(DocumentUserDirectory::new(store.clone()));
    let state = AppState::from_parts(Config::default(), store.clone(), attachments, users);
    (store, state)
}

async fn user(state: &AppState, name: &str) -> User {
    state
        .users
        .create(name, &format!("{}@example.com", name))
        .await
        .unwrap()
}

async fn question_by(state: &AppState, author: &User) -> String {
    state
        .questions
        .create_question(CreateQuestion {
            title: Some("Borrow checker".into()),
            content: Some("Why does this not compile?".into()),
            author_id: Some(author.id.clone()),
            tags: Some(vec!["rust".into()]),
            attachment_id: None,
        })
        .await
        .unwrap()
        .id
}

fn new_answer(question_id: &str, author: &User) -> CreateAnswer {
    CreateAnswer {
        question_id: Some(question_id.to_string()),
        answer: Some("Add a lifetime".into()),
        author_id: Some(author.id.clone()),
    }
}

#[tokio::test]
async fn test_answer_round_trip_restores_reputation() {
    let (_, state) = state();
    let asker = user(&state, "alice").await;
    let helper = user(&state, "bob").await;
    let question_id = question_by(&state, &asker).await;

    let answer = state
        .answers
        .create_answer(new_answer(&question_id, &helper))
        .await
        .unwrap();
    assert_eq!(state.users.get_prefs(&helper.id).await.unwrap().reputation, Some(1));

    state
        .answers
        .delete_answer(DeleteAnswer {
            answer_id: Some(answer.id),
            author_id: Some(helper.id.clone()),
        })
        .await
        .unwrap();
    assert_eq!(state.users.get_prefs(&helper.id).await.unwrap().reputation, Some(0));
}

#[tokio::test]
async fn test_answer_delete_takes_votes_and_comments() {
    let (store, state) = state();
    let asker = user(&state, "alice").await;
    let helper = user(&state, "bob").await;
    let question_id = question_by(&state, &asker).await;
    let answer = state
        .answers
        .create_answer(new_answer(&question_id, &helper))
        .await
        .unwrap();

    state
        .comments
        .create_comment(CreateComment {
            content: Some("Thanks".into()),
            author_id: Some(asker.id.clone()),
            kind: Some("answer".into()),
            type_id: Some(answer.id.clone()),
        })
        .await
        .unwrap();
    state
        .votes
        .cast_vote(CastVote {
            kind: Some("answer".into()),
            type_id: Some(answer.id.clone()),
            vote_status: Some("upvoted".into()),
            voter_id: Some(asker.id.clone()),
        })
        .await
        .unwrap();

    state
        .answers
        .delete_answer(DeleteAnswer {
            answer_id: Some(answer.id.clone()),
            author_id: None,
        })
        .await
        .unwrap();

    assert_eq!(store.count(Collection::Comments, &[]).await.unwrap(), 0);
    assert_eq!(store.count(Collection::Votes, &[]).await.unwrap(), 0);
    assert_eq!(store.deletes_in(Collection::Answers), 1);
}

#[tokio::test]
async fn test_answer_delete_by_other_user_is_rejected() {
    let (store, state) = state();
    let asker = user(&state, "alice").await;
    let helper = user(&state, "bob").await;
    let question_id = question_by(&state, &asker).await;
    let answer = state
        .answers
        .create_answer(new_answer(&question_id, &helper))
        .await
        .unwrap();

    let err = state
        .answers
        .delete_answer(DeleteAnswer {
            answer_id: Some(answer.id),
            author_id: Some(asker.id.clone()),
        })
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 403);
    assert_eq!(store.delete_count(), 0);
    assert_eq!(state.users.get_prefs(&helper.id).await.unwrap().reputation, Some(1));
}

#[tokio::test]
async fn test_answer_requires_existing_question() {
    let (store, state) = state();
    let helper = user(&state, "bob").await;

    let err = state
        .answers
        .create_answer(new_answer("missing", &helper))
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(store.count(Collection::Answers, &[]).await.unwrap(), 0);
    assert_eq!(state.users.get_prefs(&helper.id).await.unwrap().reputation, Some(0));
}

#[tokio::test]
async fn test_question_delete_leaves_answer_authors_reputation() {
    let (_, state) = state();
    let asker = user(&state, "alice").await;
    let helper = user(&state, "bob").await;
    let question_id = question_by(&state, &asker).await;
    state
        .answers
        .create_answer(new_answer(&question_id, &helper))
        .await
        .unwrap();

    let deleted = state
        .cascade
        .delete_question(&question_id, Some(&asker.id))
        .await
        .unwrap();

    assert_eq!(deleted.counts.answers, 1);
    assert_eq!(state.users.get_prefs(&helper.id).await.unwrap().reputation, Some(1));
}

fn contended_state(max_attempts: u32) -> (Arc<CountingStore>, Arc<ContendedUsers>, AppState) {
    let store = Arc::new(CountingStore::new());
    let attachments = Arc::new(CountingAttachments::new());
    let users = Arc::new(ContendedUsers::new(store.clone()));
    let mut config = Config::default();
    config.orchestration.reputation_max_attempts = max_attempts;
    let state = AppState::from_parts(config, store.clone(), attachments, users.clone());
    (store, users, state)
}

#[tokio::test]
async fn test_answer_kept_when_reputation_credit_fails() {
    let (store, users, state) = contended_state(3);
    let asker = user(&state, "alice").await;
    let helper = user(&state, "bob").await;
    let question_id = question_by(&state, &asker).await;
    users.set_contended(true);

    let err = state
        .answers
        .create_answer(new_answer(&question_id, &helper))
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 409);
    assert_eq!(users.prefs_writes(), 3);
    assert_eq!(store.count(Collection::Answers, &[]).await.unwrap(), 1);
    assert_eq!(state.users.get_prefs(&helper.id).await.unwrap().reputation, Some(0));
}

#[tokio::test]
async fn test_answer_stays_deleted_when_reputation_debit_fails() {
    let (store, users, state) = contended_state(2);
    let asker = user(&state, "alice").await;
    let helper = user(&state, "bob").await;
    let question_id = question_by(&state, &asker).await;
    let answer = state
        .answers
        .create_answer(new_answer(&question_id, &helper))
        .await
        .unwrap();
    users.set_contended(true);

    let err = state
        .answers
        .delete_answer(DeleteAnswer {
            answer_id: Some(answer.id.clone()),
            author_id: Some(helper.id.clone()),
        })
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 409);
    assert!(!store.exists(Collection::Answers, &answer.id).await.unwrap());
    assert_eq!(state.users.get_prefs(&helper.id).await.unwrap().reputation, Some(1));
}
