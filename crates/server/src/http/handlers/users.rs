use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDateTime;
use domain::commands::{NewUser, SuspendUser};
use domain::{Role, User};
use moderation::Moderator;
use serde::{Deserialize, Serialize};

use crate::http::error::{http_error, ApiResult};

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct SuspendRequest {
    pub suspended_by_id: String,
    pub suspended: bool,
    pub suspended_until: Option<NaiveDateTime>,
    pub suspended_reason: Option<String>,
}

#[derive(Deserialize)]
pub struct RoleRequest {
    pub updated_by_id: String,
    pub role: Role,
}

#[derive(Deserialize)]
pub struct DeleteQuery {
    pub deleted_by_id: String,
}

#[derive(Deserialize)]
pub struct AuthorizeQuery {
    pub actor_id: String,
}

#[derive(Serialize)]
pub struct AuthorizeResponse {
    pub authorized: bool,
}

pub async fn create_user(
    State(moderator): State<Moderator>,
    Json(payload): Json<CreateUserRequest>,
) -> ApiResult<User> {
    let new = NewUser {
        id: payload.id,
        name: payload.name,
        email: payload.email,
        role: payload.role,
    };
    moderator.create_user(new).await.map(Json).map_err(http_error)
}

pub async fn list_users(State(moderator): State<Moderator>) -> ApiResult<Vec<User>> {
    moderator.list_users().await.map(Json).map_err(http_error)
}

pub async fn get_user(
    State(moderator): State<Moderator>,
    Path(user_id): Path<String>,
) -> ApiResult<User> {
    moderator.get_user(&user_id).await.map(Json).map_err(http_error)
}

pub async fn rename_user(
    State(moderator): State<Moderator>,
    Path(user_id): Path<String>,
    Json(payload): Json<RenameRequest>,
) -> ApiResult<User> {
    moderator
        .rename_user(&user_id, &payload.name)
        .await
        .map(Json)
        .map_err(http_error)
}

pub async fn suspend_user(
    State(moderator): State<Moderator>,
    Path(user_id): Path<String>,
    Json(payload): Json<SuspendRequest>,
) -> ApiResult<User> {
    let cmd = SuspendUser {
        actor_id: payload.suspended_by_id,
        suspended: payload.suspended,
        until: payload.suspended_until,
        reason: payload.suspended_reason,
    };
    moderator
        .suspend_user(&user_id, cmd)
        .await
        .map(Json)
        .map_err(http_error)
}

pub async fn set_role(
    State(moderator): State<Moderator>,
    Path(user_id): Path<String>,
    Json(payload): Json<RoleRequest>,
) -> ApiResult<User> {
    moderator
        .set_role(&user_id, &payload.updated_by_id, payload.role)
        .await
        .map(Json)
        .map_err(http_error)
}

pub async fn delete_user(
    State(moderator): State<Moderator>,
    Path(user_id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> ApiResult<User> {
    moderator
        .delete_user(&user_id, &query.deleted_by_id)
        .await
        .map(Json)
        .map_err(http_error)
}

/// Whether `actor_id` may moderate the user in the path.
pub async fn check_authorization(
    State(moderator): State<Moderator>,
    Path(user_id): Path<String>,
    Query(query): Query<AuthorizeQuery>,
) -> Json<AuthorizeResponse> {
    let authorized = moderator.is_authorized(&query.actor_id, &user_id).await;
    Json(AuthorizeResponse { authorized })
}
