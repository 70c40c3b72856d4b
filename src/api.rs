// HTTP surface - axum handlers over the application services

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path as AxumPath, Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    app_state::AppState,
    error::{AppError, AppResult},
    models::Target,
    services::{
        answer_service::{CreateAnswer, DeleteAnswer},
        comment_service::{CreateComment, DeleteComment},
        question_service::{CreateQuestion, ListQuestions, UpdateQuestion},
        required,
        user_service::RegisterUser,
        vote_service::{CastVote, DeleteVote},
    },
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteQuestionRequest {
    pub question_id: Option<String>,
    pub author_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub type_id: Option<String>,
}

impl TargetQuery {
    fn target(&self) -> AppResult<Target> {
        match (required(&self.kind), required(&self.type_id)) {
            (Some(kind), Some(id)) => Target::parse(kind, id),
            _ => Err(AppError::Validation("Missing type or typeId".to_string())),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UsersQuery {
    pub page: Option<u64>,
    pub search: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TagsQuery {
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UploadAttachment {
    /// Base64-encoded file contents
    pub data: Option<String>,
}

// Malformed bodies are validation errors like any other missing field
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

fn query<T>(params: Result<Query<T>, QueryRejection>) -> AppResult<T> {
    params
        .map(|Query(value)| value)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

fn created(data: impl serde::Serialize) -> AppResult<(StatusCode, Json<Value>)> {
    Ok((StatusCode::CREATED, Json(json!({ "data": data }))))
}

fn to_value(data: impl serde::Serialize) -> AppResult<Value> {
    Ok(serde_json::to_value(data)?)
}

// HTTP Handlers

pub async fn create_question_handler(
    State(state): State<AppState>,
    payload: Result<Json<CreateQuestion>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let question = state.questions.create_question(body(payload)?).await?;
    created(question)
}

pub async fn get_question_handler(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> AppResult<Json<Value>> {
    let question = state.questions.get_question(&id).await?;
    let attachment_url = question
        .attachment_id
        .as_deref()
        .map(|id| state.attachments.preview_url(id));
    Ok(Json(json!({ "data": question, "attachmentUrl": attachment_url })))
}

pub async fn update_question_handler(
    State(state): State<AppState>,
    payload: Result<Json<UpdateQuestion>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let question = state.questions.update_question(body(payload)?).await?;
    Ok(Json(json!({ "data": question })))
}

pub async fn delete_question_handler(
    State(state): State<AppState>,
    payload: Result<Json<DeleteQuestionRequest>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let request = body(payload)?;
    let question_id = required(&request.question_id)
        .ok_or_else(|| AppError::Validation("Missing questionId".to_string()))?;

    let deleted = state
        .cascade
        .delete_question(question_id, required(&request.author_id))
        .await?;

    let mut summary = to_value(deleted.counts)?;
    if let Value::Object(map) = &mut summary {
        map.insert("total".to_string(), deleted.counts.total().into());
    }
    Ok(Json(json!({
        "data": deleted.question,
        "summary": summary,
        "message": "Question and all related data deleted successfully",
    })))
}

pub async fn list_questions_handler(
    State(state): State<AppState>,
    params: Result<Query<ListQuestions>, QueryRejection>,
) -> AppResult<Json<Value>> {
    let page = state.questions.list_questions(query(params)?).await?;
    let links = page.pagination.links();
    let mut value = to_value(page)?;
    if let Value::Object(map) = &mut value {
        map.insert("pages".to_string(), to_value(links)?);
    }
    Ok(Json(value))
}

pub async fn create_answer_handler(
    State(state): State<AppState>,
    payload: Result<Json<CreateAnswer>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let answer = state.answers.create_answer(body(payload)?).await?;
    created(answer)
}

pub async fn delete_answer_handler(
    State(state): State<AppState>,
    payload: Result<Json<DeleteAnswer>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let answer = state.answers.delete_answer(body(payload)?).await?;
    Ok(Json(json!({ "data": answer })))
}

pub async fn list_answers_handler(
    State(state): State<AppState>,
    AxumPath(question_id): AxumPath<String>,
) -> AppResult<Json<Value>> {
    let answers = state.answers.list_answers(&question_id).await?;
    Ok(Json(json!({ "total": answers.len(), "documents": answers })))
}

pub async fn create_comment_handler(
    State(state): State<AppState>,
    payload: Result<Json<CreateComment>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let comment = state.comments.create_comment(body(payload)?).await?;
    created(comment)
}

pub async fn delete_comment_handler(
    State(state): State<AppState>,
    payload: Result<Json<DeleteComment>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let comment = state.comments.delete_comment(body(payload)?).await?;
    Ok(Json(json!({ "data": comment })))
}

pub async fn list_comments_handler(
    State(state): State<AppState>,
    params: Result<Query<TargetQuery>, QueryRejection>,
) -> AppResult<Json<Value>> {
    let target = query(params)?.target()?;
    let comments = state.comments.list_comments(&target).await?;
    Ok(Json(json!({ "total": comments.len(), "documents": comments })))
}

pub async fn cast_vote_handler(
    State(state): State<AppState>,
    payload: Result<Json<CastVote>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let vote = state.votes.cast_vote(body(payload)?).await?;
    created(vote)
}

pub async fn delete_vote_handler(
    State(state): State<AppState>,
    payload: Result<Json<DeleteVote>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let vote = state.votes.delete_vote(body(payload)?).await?;
    Ok(Json(json!({ "data": vote })))
}

pub async fn tally_votes_handler(
    State(state): State<AppState>,
    params: Result<Query<TargetQuery>, QueryRejection>,
) -> AppResult<Json<Value>> {
    let target = query(params)?.target()?;
    let tally = state.votes.tally(&target).await?;
    Ok(Json(json!({
        "upvotes": tally.upvotes,
        "downvotes": tally.downvotes,
        "total": tally.total(),
        "score": tally.score(),
    })))
}

pub async fn upload_attachment_handler(
    State(state): State<AppState>,
    payload: Result<Json<UploadAttachment>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let request = body(payload)?;
    let encoded = required(&request.data)
        .ok_or_else(|| AppError::Validation("Missing data".to_string()))?;
    let bytes = base64::engine::general_purpose::STANDARD.decode(encoded)?;

    let id = state.attachments.upload(bytes).await?;
    let url = state.attachments.preview_url(&id);
    Ok((StatusCode::CREATED, Json(json!({ "id": id, "url": url }))))
}

pub async fn preview_attachment_handler(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> AppResult<Response> {
    let bytes = state.attachments.download(&id).await?;
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], bytes).into_response())
}

pub async fn register_user_handler(
    State(state): State<AppState>,
    payload: Result<Json<RegisterUser>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let user = state.profiles.register(body(payload)?).await?;
    created(user)
}

pub async fn leaderboard_handler(
    State(state): State<AppState>,
    params: Result<Query<UsersQuery>, QueryRejection>,
) -> AppResult<Json<Value>> {
    let params = query(params)?;
    let board = state
        .profiles
        .leaderboard(params.page, required(&params.search))
        .await?;
    Ok(Json(to_value(board)?))
}

pub async fn top_contributors_handler(
    State(state): State<AppState>,
    params: Result<Query<UsersQuery>, QueryRejection>,
) -> AppResult<Json<Value>> {
    let users = state.profiles.top_contributors(query(params)?.limit).await?;
    Ok(Json(json!({ "users": users })))
}

pub async fn user_profile_handler(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> AppResult<Json<Value>> {
    let profile = state.profiles.profile(&id).await?;
    Ok(Json(json!({ "data": profile })))
}

pub async fn tags_handler(
    State(state): State<AppState>,
    params: Result<Query<TagsQuery>, QueryRejection>,
) -> AppResult<Json<Value>> {
    let params = query(params)?;
    let tags = state.tags.tag_counts(required(&params.search)).await?;
    Ok(Json(json!({ "total": tags.len(), "tags": tags })))
}

pub async fn sweep_handler(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let report = state.sweeper.sweep().await?;
    Ok(Json(json!({ "data": report, "total": report.total() })))
}

pub async fn health_handler(State(state): State<AppState>) -> AppResult<Json<Value>> {
    state.store.count(crate::infrastructure::Collection::Questions, &[]).await?;
    Ok(Json(json!({ "status": "ok" })))
}

// Create application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Questions
        .route(
            "/question",
            post(create_question_handler)
                .put(update_question_handler)
                .delete(delete_question_handler),
        )
        .route("/question/{id}", get(get_question_handler))
        .route("/question/{id}/answers", get(list_answers_handler))
        .route("/questions", get(list_questions_handler))

        // Answers, comments and votes
        .route("/answer", post(create_answer_handler).delete(delete_answer_handler))
        .route("/comment", post(create_comment_handler).delete(delete_comment_handler))
        .route("/comments", get(list_comments_handler))
        .route("/vote", post(cast_vote_handler).delete(delete_vote_handler))
        .route("/votes", get(tally_votes_handler))

        // Attachments
        .route("/attachment", post(upload_attachment_handler))
        .route("/attachment/{id}/preview", get(preview_attachment_handler))

        // Users and tags
        .route("/users", post(register_user_handler).get(leaderboard_handler))
        .route("/users/top", get(top_contributors_handler))
        .route("/users/{id}", get(user_profile_handler))
        .route("/tags", get(tags_handler))

        // Operations
        .route("/admin/sweep", post(sweep_handler))
        .route("/health", get(health_handler))

        .with_state(state)
}
