use crate::Moderator;
use domain::commands::{
    normalize_optional, require_id, CreateComment, EditComment, LikeComment, ListComments,
    UpdateStatus,
};
use domain::{Comment, ModerationError, ModerationResult, Verdict};
use storage::{LikeOutcome, NewComment, StatusUpdate, TransitionOutcome};
use tracing::{debug, info, warn};

impl Moderator {
    /// Creates a comment, letting the classifier pick REJECTED or FLAGGED
    /// instead of PENDING when the text matches a word list.
    #[tracing::instrument(skip_all, fields(article_id = cmd.article_id))]
    pub async fn create_comment(&self, cmd: CreateComment) -> ModerationResult<Comment> {
        cmd.validate()?;

        let author = self
            .guarded("create_comment", self.db.resolve_actor(&cmd.author))
            .await?
            .ok_or_else(|| ModerationError::not_found("user", &cmd.author))?;

        let article = self
            .guarded("create_comment", self.db.get_article(cmd.article_id))
            .await?
            .ok_or_else(|| ModerationError::not_found("article", cmd.article_id))?;
        if !article.is_open() {
            return Err(ModerationError::Forbidden(
                "Commenting is disabled for this article".into(),
            ));
        }

        if let Some(parent_id) = cmd.parent_id {
            let parent = self
                .guarded("create_comment", self.db.get_comment(parent_id))
                .await?
                .ok_or_else(|| ModerationError::not_found("comment", parent_id))?;
            if parent.article_id != article.id {
                return Err(ModerationError::validation(
                    "Parent comment belongs to a different article",
                ));
            }
        }

        let verdict = self.classifier.classify(&cmd.content);
        let comment = self
            .guarded(
                "create_comment",
                self.db.insert_comment(
                    &NewComment {
                        content: &cmd.content,
                        author_id: &author.id,
                        article_id: article.id,
                        parent_id: cmd.parent_id,
                    },
                    verdict,
                ),
            )
            .await?;

        if verdict != Verdict::Pass {
            info!(
                comment_id = comment.id,
                status = %comment.status,
                "Comment pre-moderated by word filter"
            );
        }
        Ok(comment)
    }

    /// Moves a comment to any status. The audit row, flag bookkeeping and the
    /// comment update commit together or not at all.
    #[tracing::instrument(skip_all, fields(comment_id = cmd.comment_id, status = %cmd.status))]
    pub async fn transition(&self, cmd: UpdateStatus) -> ModerationResult<Comment> {
        cmd.validate()?;

        let actor = match &cmd.actor {
            Some(actor_ref) => {
                let user = self
                    .guarded("transition", self.db.resolve_actor(actor_ref))
                    .await?;
                if user.is_none() {
                    warn!(actor = %actor_ref, "Unknown actor, recording status change as unattributed");
                }
                user
            }
            None => None,
        };
        let reason = normalize_optional(cmd.reason.clone());

        let update = StatusUpdate {
            comment_id: cmd.comment_id,
            new_status: cmd.status,
            actor_id: actor.as_ref().map(|u| u.id.as_str()),
            reason: reason.as_deref(),
            changed_by: cmd.changed_by.unwrap_or_default(),
            expected_status: cmd.expected_status,
        };

        match self
            .guarded("transition", self.db.apply_status_change(&update))
            .await?
        {
            TransitionOutcome::Applied(comment) => {
                info!(
                    actor = update.actor_id.unwrap_or("-"),
                    flagged_count = comment.flagged_count,
                    "Comment status changed"
                );
                Ok(comment)
            }
            TransitionOutcome::NotFound => {
                Err(ModerationError::not_found("comment", cmd.comment_id))
            }
            TransitionOutcome::Stale { current } => match cmd.expected_status {
                Some(expected) if expected != current => Err(ModerationError::Conflict(format!(
                    "Comment {} is {}, expected {}",
                    cmd.comment_id, current, expected
                ))),
                _ => Err(ModerationError::Conflict(format!(
                    "Comment {} was modified concurrently, retry the status change",
                    cmd.comment_id
                ))),
            },
        }
    }

    #[tracing::instrument(skip_all, fields(comment_id = cmd.comment_id))]
    pub async fn like(&self, cmd: LikeComment) -> ModerationResult<Comment> {
        cmd.validate()?;

        let actor = self
            .guarded("like", self.db.resolve_actor(&cmd.actor))
            .await?
            .ok_or_else(|| ModerationError::not_found("user", &cmd.actor))?;

        match self
            .guarded("like", self.db.like_comment(cmd.comment_id, &actor.id))
            .await?
        {
            LikeOutcome::Liked(comment) => Ok(comment),
            LikeOutcome::AlreadyLiked => Err(ModerationError::Conflict(
                "Comment already liked by this user".into(),
            )),
            LikeOutcome::NotFound => Err(ModerationError::not_found("comment", cmd.comment_id)),
        }
    }

    /// Content edits are reserved for the comment's author.
    #[tracing::instrument(skip_all, fields(comment_id = cmd.comment_id))]
    pub async fn edit(&self, cmd: EditComment) -> ModerationResult<Comment> {
        cmd.validate()?;

        let comment = self
            .guarded("edit_comment", self.db.get_comment(cmd.comment_id))
            .await?
            .ok_or_else(|| ModerationError::not_found("comment", cmd.comment_id))?;

        let actor = self
            .guarded("edit_comment", self.db.resolve_actor(&cmd.actor))
            .await?;
        match actor {
            Some(user) if user.id == comment.author_id => {}
            _ => {
                debug!(actor = %cmd.actor, "Edit refused, actor is not the author");
                return Err(ModerationError::Forbidden(
                    "You are not authorised to edit this comment".into(),
                ));
            }
        }

        self.guarded(
            "edit_comment",
            self.db.update_content(comment.id, &cmd.content),
        )
        .await?
        .ok_or_else(|| ModerationError::not_found("comment", cmd.comment_id))
    }

    pub async fn list_comments(&self, query: ListComments) -> ModerationResult<Vec<Comment>> {
        let (limit, offset) = query.window()?;
        self.guarded(
            "list_comments",
            self.db.list_comments(&query.statuses, limit, offset),
        )
        .await
    }

    pub async fn get_comment(&self, comment_id: i64) -> ModerationResult<Comment> {
        require_id("comment ID", comment_id)?;
        self.guarded("get_comment", self.db.get_comment(comment_id))
            .await?
            .ok_or_else(|| ModerationError::not_found("comment", comment_id))
    }
}
