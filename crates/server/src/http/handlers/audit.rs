use axum::{extract::State, Json};
use domain::{ModerationStats, StatusChange};
use moderation::Moderator;

use crate::http::error::{http_error, ApiResult};

pub async fn list_status_changes(
    State(moderator): State<Moderator>,
) -> ApiResult<Vec<StatusChange>> {
    moderator
        .list_status_changes(None)
        .await
        .map(Json)
        .map_err(http_error)
}

pub async fn statistics(State(moderator): State<Moderator>) -> ApiResult<ModerationStats> {
    moderator.statistics().await.map(Json).map_err(http_error)
}
