use crate::{
    models::{convert_all, SqlComment, COMMENT_COLUMNS},
    now,
    repo::status_changes::{insert_status_change, NewStatusChange},
    Db,
};
use anyhow::anyhow;
use domain::classifier::SYSTEM_REASON;
use domain::{ChangedBy, Comment, CommentStatus, Verdict};
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};

pub struct NewComment<'a> {
    pub content: &'a str,
    pub author_id: &'a str,
    pub article_id: i64,
    pub parent_id: Option<i64>,
}

pub struct StatusUpdate<'a> {
    pub comment_id: i64,
    pub new_status: CommentStatus,
    /// Resolved acting user; `None` records the change as unattributed.
    pub actor_id: Option<&'a str>,
    pub reason: Option<&'a str>,
    pub changed_by: ChangedBy,
    pub expected_status: Option<CommentStatus>,
}

#[derive(Debug)]
pub enum TransitionOutcome {
    Applied(Comment),
    NotFound,
    /// The stored status did not match the caller's expectation, or a
    /// concurrent transition bumped the version first. Nothing was written.
    Stale { current: CommentStatus },
}

#[derive(Debug)]
pub enum LikeOutcome {
    Liked(Comment),
    AlreadyLiked,
    NotFound,
}

async fn fetch_comment(conn: &mut SqliteConnection, id: i64) -> anyhow::Result<Option<Comment>> {
    let row = sqlx::query_as::<_, SqlComment>(&format!(
        "SELECT {} FROM comments WHERE id = ?",
        COMMENT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;

    row.map(Comment::try_from).transpose()
}

impl Db {
    /// Stores a new comment with the status the classifier chose. A non-pass
    /// verdict also writes the SYSTEM audit row, in the same transaction.
    pub async fn insert_comment(
        &self,
        new: &NewComment<'_>,
        verdict: Verdict,
    ) -> anyhow::Result<Comment> {
        let status = verdict.initial_status().unwrap_or(CommentStatus::Pending);
        let flagged_count: i64 = if verdict == Verdict::Flag { 1 } else { 0 };
        let ts = now();

        let mut tx = self.pool.begin().await?;

        let id = sqlx::query(
            r#"
            INSERT INTO comments (
                content, author_id, article_id, parent_id,
                status, like_count, flagged_count, reviewed_by_id,
                version, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, 0, ?, NULL, 0, ?, ?)
            "#,
        )
        .bind(new.content)
        .bind(new.author_id)
        .bind(new.article_id)
        .bind(new.parent_id)
        .bind(status.as_str())
        .bind(flagged_count)
        .bind(ts)
        .bind(ts)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        if status != CommentStatus::Pending {
            insert_status_change(
                &mut tx,
                &NewStatusChange {
                    comment_id: id,
                    old_status: CommentStatus::Pending,
                    new_status: status,
                    changed_by: ChangedBy::System,
                    changed_by_id: None,
                    changed_reason: Some(SYSTEM_REASON),
                    changed_at: ts,
                },
            )
            .await?;
        }

        let comment = fetch_comment(&mut tx, id)
            .await?
            .ok_or_else(|| anyhow!("comment {} missing right after insert", id))?;
        tx.commit().await?;
        Ok(comment)
    }

    pub async fn get_comment(&self, comment_id: i64) -> anyhow::Result<Option<Comment>> {
        let mut conn = self.pool.acquire().await?;
        fetch_comment(&mut conn, comment_id).await
    }

    /// `None` if the comment does not exist, `Some(None)` for a root comment.
    pub async fn get_parent_id(&self, comment_id: i64) -> anyhow::Result<Option<Option<i64>>> {
        let row = sqlx::query("SELECT parent_id FROM comments WHERE id = ?")
            .bind(comment_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<Option<i64>, _>(0)))
    }

    /// Moderation queue listing, newest first. An empty filter means every status.
    pub async fn list_comments(
        &self,
        statuses: &[CommentStatus],
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Comment>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM comments", COMMENT_COLUMNS));
        if !statuses.is_empty() {
            qb.push(" WHERE status IN (");
            let mut separated = qb.separated(", ");
            for status in statuses {
                separated.push_bind(status.as_str());
            }
            separated.push_unseparated(")");
        }
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let rows = qb
            .build_query_as::<SqlComment>()
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }

    /// Every comment on an article in creation order, as the thread builder expects.
    pub async fn list_article_comments(&self, article_id: i64) -> anyhow::Result<Vec<Comment>> {
        let rows = sqlx::query_as::<_, SqlComment>(&format!(
            "SELECT {} FROM comments WHERE article_id = ? ORDER BY created_at ASC, id ASC",
            COMMENT_COLUMNS
        ))
        .bind(article_id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    pub async fn list_approved_for_article(&self, article_id: i64) -> anyhow::Result<Vec<Comment>> {
        let rows = sqlx::query_as::<_, SqlComment>(&format!(
            "SELECT {} FROM comments WHERE article_id = ? AND status = 'APPROVED' \
             ORDER BY created_at DESC, id DESC",
            COMMENT_COLUMNS
        ))
        .bind(article_id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    pub async fn count_approved(&self, article_id: i64) -> anyhow::Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM comments WHERE article_id = ? AND status = 'APPROVED'",
        )
        .bind(article_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Replaces the text of a comment. Ownership is checked by the caller.
    pub async fn update_content(
        &self,
        comment_id: i64,
        content: &str,
    ) -> anyhow::Result<Option<Comment>> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("UPDATE comments SET content = ?, updated_at = ? WHERE id = ?")
            .bind(content)
            .bind(now())
            .bind(comment_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        let comment = fetch_comment(&mut tx, comment_id).await?;
        tx.commit().await?;
        Ok(comment)
    }

    /// Applies one status transition: audit row, flag bookkeeping and the
    /// comment update either all commit or all roll back.
    ///
    /// The transaction opens with a write so it holds the SQLite write lock
    /// before reading; concurrent transitions queue on `busy_timeout` and the
    /// later one sees the committed status instead of a stale snapshot.
    pub async fn apply_status_change(
        &self,
        update: &StatusUpdate<'_>,
    ) -> anyhow::Result<TransitionOutcome> {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query("UPDATE comments SET version = version WHERE id = ?")
            .bind(update.comment_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if locked == 0 {
            return Ok(TransitionOutcome::NotFound);
        }

        let current = fetch_comment(&mut tx, update.comment_id)
            .await?
            .ok_or_else(|| anyhow!("comment {} vanished mid-transaction", update.comment_id))?;
        if let Some(expected) = update.expected_status {
            if expected != current.status {
                tx.rollback().await?;
                return Ok(TransitionOutcome::Stale {
                    current: current.status,
                });
            }
        }

        let ts = now();
        insert_status_change(
            &mut tx,
            &NewStatusChange {
                comment_id: current.id,
                old_status: current.status,
                new_status: update.new_status,
                changed_by: update.changed_by,
                changed_by_id: update.actor_id,
                changed_reason: update.reason,
                changed_at: ts,
            },
        )
        .await?;

        let (reviewed_by_id, flag_increment) = if update.new_status == CommentStatus::Flagged {
            let increment = match update.actor_id {
                // 同一用户重复举报不再累加
                Some(user_id) => sqlx::query(
                    r#"
                    INSERT INTO comment_flags (user_id, comment_id, created_at)
                    VALUES (?, ?, ?)
                    ON CONFLICT(user_id, comment_id) DO NOTHING
                    "#,
                )
                .bind(user_id)
                .bind(current.id)
                .bind(ts)
                .execute(&mut *tx)
                .await?
                .rows_affected() as i64,
                None => 1,
            };
            (None, increment)
        } else {
            (update.actor_id, 0)
        };

        let result = sqlx::query(
            r#"
            UPDATE comments
            SET status = ?, reviewed_by_id = ?, flagged_count = flagged_count + ?,
                version = version + 1, updated_at = ?
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(update.new_status.as_str())
        .bind(reviewed_by_id)
        .bind(flag_increment)
        .bind(ts)
        .bind(current.id)
        .bind(current.version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(TransitionOutcome::Stale {
                current: current.status,
            });
        }

        let updated = fetch_comment(&mut tx, current.id)
            .await?
            .ok_or_else(|| anyhow!("comment {} vanished mid-transaction", current.id))?;
        tx.commit().await?;
        Ok(TransitionOutcome::Applied(updated))
    }

    /// Records a like from `user_id`; the primary key on `comment_likes`
    /// turns a second like from the same user into `AlreadyLiked`.
    ///
    /// The insert is the first statement so the transaction takes the write
    /// lock up front, which lets racing likes wait on `busy_timeout`.
    pub async fn like_comment(&self, comment_id: i64, user_id: &str) -> anyhow::Result<LikeOutcome> {
        let mut tx = self.pool.begin().await?;

        let ts = now();
        let inserted = sqlx::query(
            r#"
            INSERT INTO comment_likes (user_id, comment_id, created_at)
            SELECT ?, ?, ?
            WHERE EXISTS (SELECT 1 FROM comments WHERE id = ?)
            ON CONFLICT(user_id, comment_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(comment_id)
        .bind(ts)
        .bind(comment_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if inserted == 0 {
            let exists = sqlx::query("SELECT 1 FROM comments WHERE id = ?")
                .bind(comment_id)
                .fetch_optional(&mut *tx)
                .await?
                .is_some();
            return Ok(if exists {
                LikeOutcome::AlreadyLiked
            } else {
                LikeOutcome::NotFound
            });
        }

        sqlx::query("UPDATE comments SET like_count = like_count + 1, updated_at = ? WHERE id = ?")
            .bind(ts)
            .bind(comment_id)
            .execute(&mut *tx)
            .await?;

        let comment = fetch_comment(&mut tx, comment_id)
            .await?
            .ok_or_else(|| anyhow!("comment {} vanished mid-transaction", comment_id))?;
        tx.commit().await?;
        Ok(LikeOutcome::Liked(comment))
    }
}
