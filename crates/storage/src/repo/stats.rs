use crate::Db;
use chrono::{Duration, NaiveDateTime, Timelike};
use domain::{ArticleActivity, CommentStatus, DailyCount, HourlyCount, ModerationStats};
use sqlx::Row;
use std::collections::HashMap;

/// How many articles the "busiest today" list holds.
pub const TOP_ARTICLES_LIMIT: i64 = 5;

// 时间以 "%F %T%.f" 文本存储，前缀即可作为分组键
const DAY_KEY: &str = "%Y-%m-%d";
const HOUR_KEY: &str = "%Y-%m-%d %H";

impl Db {
    /// Dashboard counters as of `now`. "Today" starts at `now`'s midnight.
    pub async fn statistics(&self, now: NaiveDateTime) -> anyhow::Result<ModerationStats> {
        let mut stats = ModerationStats::default();

        let rows = sqlx::query("SELECT status, COUNT(*) AS n FROM comments GROUP BY status")
            .fetch_all(&self.pool)
            .await?;
        for row in rows {
            let status: String = row.try_get("status")?;
            let n: i64 = row.try_get("n")?;
            stats.total_comments += n;
            match status.parse::<CommentStatus>() {
                Ok(CommentStatus::Pending) => stats.pending = n,
                Ok(CommentStatus::Approved) => stats.approved = n,
                Ok(CommentStatus::Rejected) => stats.rejected = n,
                Ok(CommentStatus::Flagged) => stats.flagged = n,
                Err(e) => tracing::warn!("Skipping unknown status in statistics: {}", e),
            }
        }

        let today = now.date().and_hms_opt(0, 0, 0).unwrap_or(now);
        stats.new_comments_today =
            sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE created_at >= ?")
                .bind(today)
                .fetch_one(&self.pool)
                .await?;
        stats.active_users = self.count_active_users().await?;

        let first_day = today - Duration::days(6);
        let per_day = self
            .bucket_counts(
                "SELECT substr(created_at, 1, 10) AS bucket, COUNT(*) AS n \
                 FROM users WHERE created_at >= ? GROUP BY bucket",
                first_day,
            )
            .await?;
        stats.new_users_last_7_days = (0..7)
            .map(|i| {
                let day = first_day.date() + Duration::days(i);
                DailyCount {
                    day,
                    count: per_day
                        .get(&day.format(DAY_KEY).to_string())
                        .copied()
                        .unwrap_or(0),
                }
            })
            .collect();

        let current_hour = now.date().and_hms_opt(now.hour(), 0, 0).unwrap_or(today);
        let first_hour = current_hour - Duration::hours(23);
        let per_hour = self
            .bucket_counts(
                "SELECT substr(created_at, 1, 13) AS bucket, COUNT(*) AS n \
                 FROM comments WHERE created_at >= ? GROUP BY bucket",
                first_hour,
            )
            .await?;
        stats.comments_last_24_hours = (0..24)
            .map(|i| {
                let hour = first_hour + Duration::hours(i);
                HourlyCount {
                    hour,
                    count: per_hour
                        .get(&hour.format(HOUR_KEY).to_string())
                        .copied()
                        .unwrap_or(0),
                }
            })
            .collect();

        stats.top_articles_today = self.top_articles_since(today).await?;

        Ok(stats)
    }

    async fn bucket_counts(
        &self,
        sql: &str,
        since: NaiveDateTime,
    ) -> anyhow::Result<HashMap<String, i64>> {
        let rows = sqlx::query(sql).bind(since).fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|row| -> anyhow::Result<(String, i64)> {
                Ok((row.try_get("bucket")?, row.try_get("n")?))
            })
            .collect()
    }

    /// Articles with at least one comment since `since`, busiest first.
    async fn top_articles_since(&self, since: NaiveDateTime) -> anyhow::Result<Vec<ArticleActivity>> {
        let rows = sqlx::query(
            r#"
            SELECT a.id, a.title, a.url, COUNT(*) AS n
            FROM comments c JOIN articles a ON a.id = c.article_id
            WHERE c.created_at >= ?
            GROUP BY a.id, a.title, a.url
            ORDER BY n DESC, a.id ASC
            LIMIT ?
            "#,
        )
        .bind(since)
        .bind(TOP_ARTICLES_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> anyhow::Result<ArticleActivity> {
                Ok(ArticleActivity {
                    article_id: row.try_get("id")?,
                    title: row.try_get("title")?,
                    url: row.try_get("url")?,
                    comment_count: row.try_get("n")?,
                })
            })
            .collect()
    }
}
