//! Inbound operations and their shape checks. Everything here runs before the
//! datastore is touched; a failure never has side effects.

use crate::error::{ModerationError, ModerationResult};
use crate::models::{ActorRef, ChangedBy, CommentStatus, CommentingStatus, Role};
use chrono::NaiveDateTime;

pub const DEFAULT_PAGE_SIZE: i64 = 15;
pub const MAX_PAGE_SIZE: i64 = 100;
pub const ARTICLE_PAGE_SIZE: i64 = 15;

#[derive(Debug, Clone)]
pub struct CreateComment {
    pub content: String,
    pub author: ActorRef,
    pub article_id: i64,
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct UpdateStatus {
    pub comment_id: i64,
    pub status: CommentStatus,
    pub actor: Option<ActorRef>,
    pub reason: Option<String>,
    pub changed_by: Option<ChangedBy>,
    /// When set, the change only applies if the comment still has this status.
    pub expected_status: Option<CommentStatus>,
}

#[derive(Debug, Clone)]
pub struct LikeComment {
    pub comment_id: i64,
    pub actor: ActorRef,
}

#[derive(Debug, Clone)]
pub struct EditComment {
    pub comment_id: i64,
    pub content: String,
    pub actor: ActorRef,
}

#[derive(Debug, Clone, Default)]
pub struct ListComments {
    pub statuses: Vec<CommentStatus>,
    pub page: i64,
    pub page_size: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct SuspendUser {
    pub actor_id: String,
    pub suspended: bool,
    pub until: Option<NaiveDateTime>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct NewArticle {
    pub external_id: String,
    pub title: String,
    pub url: String,
    pub author_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct ArticlePatch {
    pub title: Option<String>,
    pub url: Option<String>,
    pub status: Option<CommentingStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct ArticleQuery {
    pub search: Option<String>,
    pub status: Option<CommentingStatus>,
    pub page: i64,
}

pub fn require_id(name: &str, id: i64) -> ModerationResult<()> {
    if id <= 0 {
        return Err(ModerationError::validation(format!("Invalid {}", name)));
    }
    Ok(())
}

pub fn require_text(name: &str, value: &str) -> ModerationResult<()> {
    if value.trim().is_empty() {
        return Err(ModerationError::validation(format!(
            "Missing required field: {}",
            name
        )));
    }
    Ok(())
}

fn require_actor(actor: &ActorRef) -> ModerationResult<()> {
    match actor {
        ActorRef::ById(id) => require_text("actor id", id),
        ActorRef::ByEmail(email) => require_text("actor email", email),
    }
}

/// Blank optional text is treated as absent.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl CreateComment {
    pub fn validate(&self) -> ModerationResult<()> {
        require_text("content", &self.content)?;
        require_actor(&self.author)?;
        require_id("article ID", self.article_id)?;
        if let Some(parent_id) = self.parent_id {
            require_id("comment parent ID", parent_id)?;
        }
        Ok(())
    }
}

impl UpdateStatus {
    pub fn validate(&self) -> ModerationResult<()> {
        require_id("comment ID", self.comment_id)?;
        if let Some(actor) = &self.actor {
            require_actor(actor)?;
        }
        Ok(())
    }
}

impl LikeComment {
    pub fn validate(&self) -> ModerationResult<()> {
        require_id("comment ID", self.comment_id)?;
        require_actor(&self.actor)
    }
}

impl EditComment {
    pub fn validate(&self) -> ModerationResult<()> {
        require_id("comment ID", self.comment_id)?;
        require_text("content", &self.content)?;
        require_actor(&self.actor)
    }
}

impl ArticleQuery {
    /// Returns `(limit, offset)`; article pages have a fixed size.
    pub fn window(&self) -> ModerationResult<(i64, i64)> {
        if self.page < 0 {
            return Err(ModerationError::validation("page must not be negative"));
        }
        let offset = self
            .page
            .checked_mul(ARTICLE_PAGE_SIZE)
            .ok_or_else(|| ModerationError::validation("Invalid page number"))?;
        Ok((ARTICLE_PAGE_SIZE, offset))
    }
}

impl ListComments {
    /// Returns `(limit, offset)` for the requested page.
    pub fn window(&self) -> ModerationResult<(i64, i64)> {
        if self.page < 0 {
            return Err(ModerationError::validation("Invalid page number"));
        }
        let size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&size) {
            return Err(ModerationError::validation(format!(
                "Page size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        let offset = self
            .page
            .checked_mul(size)
            .ok_or_else(|| ModerationError::validation("Invalid page number"))?;
        Ok((size, offset))
    }
}

impl SuspendUser {
    pub fn validate(&self) -> ModerationResult<()> {
        require_text("suspendedById", &self.actor_id)?;
        if self.suspended {
            if self.until.is_none() {
                return Err(ModerationError::validation(
                    "Missing required field: suspendedUntil",
                ));
            }
            if normalize_optional(self.reason.clone()).is_none() {
                return Err(ModerationError::validation(
                    "Missing required field: suspendedReason",
                ));
            }
        }
        Ok(())
    }
}

impl NewUser {
    pub fn validate(&self) -> ModerationResult<()> {
        require_text("userId", &self.id)?;
        require_text("name", &self.name)?;
        require_text("email", &self.email)?;
        if !self.email.contains('@') {
            return Err(ModerationError::validation("Malformed email address"));
        }
        Ok(())
    }
}

impl NewArticle {
    pub fn validate(&self) -> ModerationResult<()> {
        require_text("articleId", &self.external_id)?;
        require_text("articleTitle", &self.title)?;
        require_text("articleUrl", &self.url)?;
        require_text("authorId", &self.author_id)
    }
}

impl ArticlePatch {
    pub fn validate(&self) -> ModerationResult<()> {
        if let Some(title) = &self.title {
            require_text("articleTitle", title)?;
        }
        if let Some(url) = &self.url {
            require_text("articleUrl", url)?;
        }
        Ok(())
    }
}
