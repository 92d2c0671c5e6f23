use anyhow::anyhow;
use chrono::NaiveDateTime;
use domain::{Article, Comment, StatusChange, User};
use sqlx::FromRow;

// 枚举在库里以大写字符串保存，读出时再解析
fn parse<T: std::str::FromStr<Err = String>>(raw: &str) -> anyhow::Result<T> {
    raw.parse::<T>().map_err(|e| anyhow!(e))
}

pub(crate) const COMMENT_COLUMNS: &str = "id, content, author_id, article_id, parent_id, status, \
     like_count, flagged_count, reviewed_by_id, version, created_at, updated_at";

#[derive(FromRow)]
pub struct SqlComment {
    pub id: i64,
    pub content: String,
    pub author_id: String,
    pub article_id: i64,
    pub parent_id: Option<i64>,
    pub status: String,
    pub like_count: i64,
    pub flagged_count: i64,
    pub reviewed_by_id: Option<String>,
    pub version: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<SqlComment> for Comment {
    type Error = anyhow::Error;

    fn try_from(sql: SqlComment) -> anyhow::Result<Self> {
        Ok(Comment {
            id: sql.id,
            content: sql.content,
            author_id: sql.author_id,
            article_id: sql.article_id,
            parent_id: sql.parent_id,
            status: parse(&sql.status)?,
            like_count: sql.like_count,
            flagged_count: sql.flagged_count,
            reviewed_by_id: sql.reviewed_by_id,
            version: sql.version,
            created_at: sql.created_at,
            updated_at: sql.updated_at,
        })
    }
}

#[derive(FromRow)]
pub struct SqlStatusChange {
    pub id: i64,
    pub comment_id: i64,
    pub old_status: String,
    pub new_status: String,
    pub changed_by: String,
    pub changed_by_id: Option<String>,
    pub changed_reason: Option<String>,
    pub changed_at: NaiveDateTime,
}

impl TryFrom<SqlStatusChange> for StatusChange {
    type Error = anyhow::Error;

    fn try_from(sql: SqlStatusChange) -> anyhow::Result<Self> {
        Ok(StatusChange {
            id: sql.id,
            comment_id: sql.comment_id,
            old_status: parse(&sql.old_status)?,
            new_status: parse(&sql.new_status)?,
            changed_by: parse(&sql.changed_by)?,
            changed_by_id: sql.changed_by_id,
            changed_reason: sql.changed_reason,
            changed_at: sql.changed_at,
        })
    }
}

pub(crate) const ARTICLE_COLUMNS: &str = "a.id, a.external_id, a.title, a.url, a.author_id, a.status, a.created_at";

#[derive(FromRow)]
pub struct SqlArticle {
    pub id: i64,
    pub external_id: String,
    pub title: String,
    pub url: String,
    pub author_id: String,
    pub status: String,
    pub created_at: NaiveDateTime,
}

impl TryFrom<SqlArticle> for Article {
    type Error = anyhow::Error;

    fn try_from(sql: SqlArticle) -> anyhow::Result<Self> {
        Ok(Article {
            id: sql.id,
            external_id: sql.external_id,
            title: sql.title,
            url: sql.url,
            author_id: sql.author_id,
            status: parse(&sql.status)?,
            created_at: sql.created_at,
        })
    }
}

pub(crate) const USER_COLUMNS: &str = "id, name, email, role, active, deleted, suspended, \
     suspended_until, suspended_reason, suspended_by_id, created_at";

#[derive(FromRow)]
pub struct SqlUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub active: bool,
    pub deleted: bool,
    pub suspended: bool,
    pub suspended_until: Option<NaiveDateTime>,
    pub suspended_reason: Option<String>,
    pub suspended_by_id: Option<String>,
    pub created_at: NaiveDateTime,
}

impl TryFrom<SqlUser> for User {
    type Error = anyhow::Error;

    fn try_from(sql: SqlUser) -> anyhow::Result<Self> {
        Ok(User {
            id: sql.id,
            name: sql.name,
            email: sql.email,
            role: parse(&sql.role)?,
            active: sql.active,
            deleted: sql.deleted,
            suspended: sql.suspended,
            suspended_until: sql.suspended_until,
            suspended_reason: sql.suspended_reason,
            suspended_by_id: sql.suspended_by_id,
            created_at: sql.created_at,
        })
    }
}

/// Converts a batch of rows, failing on the first malformed one.
pub(crate) fn convert_all<S, T>(rows: Vec<S>) -> anyhow::Result<Vec<T>>
where
    T: TryFrom<S, Error = anyhow::Error>,
{
    rows.into_iter().map(T::try_from).collect()
}
