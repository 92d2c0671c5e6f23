use crate::Moderator;
use chrono::Utc;
use domain::commands::require_id;
use domain::{ModerationResult, ModerationStats, StatusChange};

impl Moderator {
    /// Audit history, newest first. With `comment_id` only that comment's rows.
    pub async fn list_status_changes(
        &self,
        comment_id: Option<i64>,
    ) -> ModerationResult<Vec<StatusChange>> {
        if let Some(id) = comment_id {
            require_id("comment ID", id)?;
        }
        self.guarded(
            "list_status_changes",
            self.db.list_status_changes(comment_id),
        )
        .await
    }

    /// Dashboard counters and activity series; "today" starts at midnight UTC.
    pub async fn statistics(&self) -> ModerationResult<ModerationStats> {
        self.guarded("statistics", self.db.statistics(Utc::now().naive_utc())).await
    }
}
