use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use domain::commands::{CreateComment, EditComment, LikeComment, ListComments, UpdateStatus};
use domain::{ActorRef, ChangedBy, Comment, CommentStatus, StatusChange, ThreadNode};
use moderation::Moderator;
use serde::Deserialize;

use crate::http::error::{http_error, ApiError, ApiResult};

#[derive(Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
    pub author_id: Option<String>,
    pub author_email: Option<String>,
    pub article_id: i64,
    pub parent_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: CommentStatus,
    pub actor_id: Option<String>,
    pub actor_email: Option<String>,
    pub reason: Option<String>,
    pub changed_by: Option<ChangedBy>,
    pub expected_status: Option<CommentStatus>,
}

/// Identifies the user liking or editing a comment.
#[derive(Deserialize)]
pub struct ActorRequest {
    pub user_id: Option<String>,
    pub user_email: Option<String>,
}

#[derive(Deserialize)]
pub struct EditCommentRequest {
    pub content: String,
    #[serde(flatten)]
    pub actor: ActorRequest,
}

#[derive(Deserialize, Default)]
pub struct ListCommentsQuery {
    /// Comma separated, e.g. `PENDING,FLAGGED`. Empty means every status.
    pub status: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

fn require_actor(id: Option<String>, email: Option<String>, what: &str) -> Result<ActorRef, ApiError> {
    ActorRef::from_parts(id, email)
        .ok_or_else(|| (StatusCode::BAD_REQUEST, format!("Missing {} id or email", what)))
}

fn parse_statuses(raw: Option<&str>) -> Result<Vec<CommentStatus>, ApiError> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_uppercase().parse::<CommentStatus>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| (StatusCode::BAD_REQUEST, e))
}

pub async fn create_comment(
    State(moderator): State<Moderator>,
    Json(payload): Json<CreateCommentRequest>,
) -> ApiResult<Comment> {
    let author = require_actor(payload.author_id, payload.author_email, "author")?;
    let cmd = CreateComment {
        content: payload.content,
        author,
        article_id: payload.article_id,
        parent_id: payload.parent_id,
    };
    moderator.create_comment(cmd).await.map(Json).map_err(http_error)
}

pub async fn list_comments(
    State(moderator): State<Moderator>,
    Query(query): Query<ListCommentsQuery>,
) -> ApiResult<Vec<Comment>> {
    let statuses = parse_statuses(query.status.as_deref())?;
    let list = ListComments {
        statuses,
        page: query.page.unwrap_or(0),
        page_size: query.page_size,
    };
    moderator.list_comments(list).await.map(Json).map_err(http_error)
}

pub async fn get_comment(
    State(moderator): State<Moderator>,
    Path(comment_id): Path<i64>,
) -> ApiResult<Comment> {
    moderator
        .get_comment(comment_id)
        .await
        .map(Json)
        .map_err(http_error)
}

pub async fn update_status(
    State(moderator): State<Moderator>,
    Path(comment_id): Path<i64>,
    Json(payload): Json<UpdateStatusRequest>,
) -> ApiResult<Comment> {
    let cmd = UpdateStatus {
        comment_id,
        status: payload.status,
        actor: ActorRef::from_parts(payload.actor_id, payload.actor_email),
        reason: payload.reason,
        changed_by: payload.changed_by,
        expected_status: payload.expected_status,
    };
    moderator.transition(cmd).await.map(Json).map_err(http_error)
}

pub async fn like_comment(
    State(moderator): State<Moderator>,
    Path(comment_id): Path<i64>,
    Json(payload): Json<ActorRequest>,
) -> ApiResult<Comment> {
    let actor = require_actor(payload.user_id, payload.user_email, "user")?;
    moderator
        .like(LikeComment { comment_id, actor })
        .await
        .map(Json)
        .map_err(http_error)
}

pub async fn edit_comment(
    State(moderator): State<Moderator>,
    Path(comment_id): Path<i64>,
    Json(payload): Json<EditCommentRequest>,
) -> ApiResult<Comment> {
    let actor = require_actor(payload.actor.user_id, payload.actor.user_email, "user")?;
    let cmd = EditComment {
        comment_id,
        content: payload.content,
        actor,
    };
    moderator.edit(cmd).await.map(Json).map_err(http_error)
}

pub async fn get_thread(
    State(moderator): State<Moderator>,
    Path(comment_id): Path<i64>,
) -> ApiResult<ThreadNode> {
    moderator
        .resolve_thread(comment_id)
        .await
        .map(Json)
        .map_err(http_error)
}

pub async fn comment_history(
    State(moderator): State<Moderator>,
    Path(comment_id): Path<i64>,
) -> ApiResult<Vec<StatusChange>> {
    moderator
        .list_status_changes(Some(comment_id))
        .await
        .map(Json)
        .map_err(http_error)
}
