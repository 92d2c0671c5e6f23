use crate::Moderator;
use domain::commands::require_id;
use domain::thread::{build_thread, MAX_SEARCH_DEPTH};
use domain::{ModerationError, ModerationResult, ThreadNode};
use tracing::debug;

impl Moderator {
    /// Returns the whole thread that `comment_id` belongs to, starting from
    /// its root, for moderation review.
    #[tracing::instrument(skip(self))]
    pub async fn resolve_thread(&self, comment_id: i64) -> ModerationResult<ThreadNode> {
        require_id("comment ID", comment_id)?;

        let root_id = self.find_root(comment_id).await?;
        let root = self
            .guarded("resolve_thread", self.db.get_comment(root_id))
            .await?
            .ok_or_else(|| ModerationError::not_found("comment", root_id))?;

        let comments = self
            .guarded(
                "resolve_thread",
                self.db.list_article_comments(root.article_id),
            )
            .await?;

        build_thread(comments, root_id).ok_or_else(|| ModerationError::not_found("comment", root_id))
    }

    /// Follows parent links for at most `MAX_SEARCH_DEPTH` hops. Deeper chains
    /// stop at the last comment visited, which then acts as the root.
    async fn find_root(&self, comment_id: i64) -> ModerationResult<i64> {
        let mut current = comment_id;
        for _ in 0..MAX_SEARCH_DEPTH {
            match self
                .guarded("resolve_thread", self.db.get_parent_id(current))
                .await?
            {
                None => return Err(ModerationError::not_found("comment", current)),
                Some(None) => return Ok(current),
                Some(Some(parent_id)) => current = parent_id,
            }
        }
        debug!(
            "Root search for comment {} stopped after {} hops at {}",
            comment_id, MAX_SEARCH_DEPTH, current
        );
        Ok(current)
    }
}
