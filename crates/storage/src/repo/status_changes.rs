use crate::{
    models::{convert_all, SqlStatusChange},
    Db,
};
use chrono::NaiveDateTime;
use domain::{ChangedBy, CommentStatus, StatusChange};
use sqlx::SqliteConnection;

const STATUS_CHANGE_COLUMNS: &str = "id, comment_id, old_status, new_status, changed_by, \
     changed_by_id, changed_reason, changed_at";

pub(crate) struct NewStatusChange<'a> {
    pub comment_id: i64,
    pub old_status: CommentStatus,
    pub new_status: CommentStatus,
    pub changed_by: ChangedBy,
    pub changed_by_id: Option<&'a str>,
    pub changed_reason: Option<&'a str>,
    pub changed_at: NaiveDateTime,
}

/// Appends an audit row on the caller's connection, so it lands in the same
/// transaction as the comment update it describes.
pub(crate) async fn insert_status_change(
    conn: &mut SqliteConnection,
    change: &NewStatusChange<'_>,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO comment_status_changes (
            comment_id, old_status, new_status,
            changed_by, changed_by_id, changed_reason, changed_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(change.comment_id)
    .bind(change.old_status.as_str())
    .bind(change.new_status.as_str())
    .bind(change.changed_by.as_str())
    .bind(change.changed_by_id)
    .bind(change.changed_reason)
    .bind(change.changed_at)
    .execute(conn)
    .await?;
    Ok(())
}

impl Db {
    /// Audit rows, newest first, optionally narrowed to one comment.
    pub async fn list_status_changes(
        &self,
        comment_id: Option<i64>,
    ) -> anyhow::Result<Vec<StatusChange>> {
        let rows = match comment_id {
            Some(id) => {
                sqlx::query_as::<_, SqlStatusChange>(&format!(
                    "SELECT {} FROM comment_status_changes WHERE comment_id = ? \
                     ORDER BY changed_at DESC, id DESC",
                    STATUS_CHANGE_COLUMNS
                ))
                .bind(id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, SqlStatusChange>(&format!(
                    "SELECT {} FROM comment_status_changes ORDER BY changed_at DESC, id DESC",
                    STATUS_CHANGE_COLUMNS
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };
        convert_all(rows)
    }

    pub async fn count_status_changes(&self, comment_id: i64) -> anyhow::Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM comment_status_changes WHERE comment_id = ?")
                .bind(comment_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}
