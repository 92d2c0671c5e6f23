use crate::Moderator;
use domain::commands::{require_id, ArticlePatch, ArticleQuery, NewArticle};
use domain::{Article, Comment, ModerationError, ModerationResult};
use tracing::info;

impl Moderator {
    pub async fn create_article(&self, new: NewArticle) -> ModerationResult<Article> {
        new.validate()?;
        // the foreign key would otherwise surface as an internal error
        self.guarded("create_article", self.db.get_user(&new.author_id))
            .await?
            .ok_or_else(|| ModerationError::not_found("user", &new.author_id))?;

        let article = self
            .guarded("create_article", self.db.insert_article(&new))
            .await?
            .ok_or_else(|| {
                ModerationError::Conflict(format!(
                    "Article {} is already registered",
                    new.external_id
                ))
            })?;
        info!(id = article.id, external_id = %article.external_id, "Article registered");
        Ok(article)
    }

    pub async fn get_article(&self, id: i64) -> ModerationResult<Article> {
        require_id("article ID", id)?;
        self.guarded("get_article", self.db.get_article(id))
            .await?
            .ok_or_else(|| ModerationError::not_found("article", id))
    }

    pub async fn update_article(&self, id: i64, patch: ArticlePatch) -> ModerationResult<Article> {
        require_id("article ID", id)?;
        patch.validate()?;
        let article = self
            .guarded("update_article", self.db.update_article(id, &patch))
            .await?
            .ok_or_else(|| ModerationError::not_found("article", id))?;
        if let Some(status) = patch.status {
            info!(id, status = status.as_str(), "Commenting status changed");
        }
        Ok(article)
    }

    pub async fn list_articles(&self, query: ArticleQuery) -> ModerationResult<Vec<Article>> {
        let (limit, offset) = query.window()?;
        self.guarded(
            "list_articles",
            self.db
                .list_articles(query.search.as_deref(), query.status, limit, offset),
        )
        .await
    }

    /// Number of approved comments, or `None` while commenting is closed.
    pub async fn approved_comment_count(&self, article_id: i64) -> ModerationResult<Option<i64>> {
        let article = self.get_article(article_id).await?;
        if !article.is_open() {
            return Ok(None);
        }
        self.guarded("approved_comment_count", self.db.count_approved(article_id))
            .await
            .map(Some)
    }

    /// The publicly visible comments of an article, newest first.
    pub async fn list_approved_for_article(&self, article_id: i64) -> ModerationResult<Vec<Comment>> {
        self.get_article(article_id).await?;
        self.guarded(
            "list_approved_for_article",
            self.db.list_approved_for_article(article_id),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{moderator, seed_article, seed_user};
    use domain::commands::{ArticlePatch, ArticleQuery, CreateComment, NewArticle, UpdateStatus};
    use domain::{ActorRef, CommentStatus, CommentingStatus, ModerationError, Role};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn registration_checks_author_and_duplicates() {
        let m = moderator().await;
        let new = NewArticle {
            external_id: "ext-1".into(),
            title: "Title".into(),
            url: "https://news.example.com/ext-1".into(),
            author_id: "writer".into(),
        };

        let err = m.create_article(new.clone()).await.unwrap_err();
        assert!(matches!(err, ModerationError::NotFound { entity: "user", .. }));

        seed_user(&m, "writer", Role::User).await;
        let article = m.create_article(new.clone()).await.unwrap();
        assert_eq!(article.status, CommentingStatus::Open);

        let err = m.create_article(new).await.unwrap_err();
        assert!(matches!(err, ModerationError::Conflict(_)));
    }

    #[tokio::test]
    async fn approved_count_hidden_when_closed() {
        let m = moderator().await;
        seed_user(&m, "writer", Role::User).await;
        let article = seed_article(&m, "story", "writer").await;

        let comment = m
            .create_comment(CreateComment {
                content: "Nice piece".into(),
                author: ActorRef::ById("writer".into()),
                article_id: article.id,
                parent_id: None,
            })
            .await
            .unwrap();
        assert_eq!(m.approved_comment_count(article.id).await.unwrap(), Some(0));

        m.transition(UpdateStatus {
            comment_id: comment.id,
            status: CommentStatus::Approved,
            actor: None,
            reason: None,
            changed_by: None,
            expected_status: None,
        })
        .await
        .unwrap();
        assert_eq!(m.approved_comment_count(article.id).await.unwrap(), Some(1));
        assert_eq!(m.list_approved_for_article(article.id).await.unwrap().len(), 1);

        m.update_article(
            article.id,
            ArticlePatch {
                status: Some(CommentingStatus::Closed),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(m.approved_comment_count(article.id).await.unwrap(), None);

        let err = m.approved_comment_count(999).await.unwrap_err();
        assert!(matches!(err, ModerationError::NotFound { .. }));
    }

    #[tokio::test]
    async fn search_by_title_or_author() {
        let m = moderator().await;
        seed_user(&m, "writer", Role::User).await;
        seed_user(&m, "other", Role::User).await;
        seed_article(&m, "alpha", "writer").await;
        seed_article(&m, "beta", "other").await;

        let found = m
            .list_articles(ArticleQuery {
                search: Some("ALPHA".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].external_id, "alpha");

        let found = m
            .list_articles(ArticleQuery {
                search: Some("user other".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].external_id, "beta");

        for page in [-1, i64::MAX] {
            let err = m
                .list_articles(ArticleQuery {
                    page,
                    ..Default::default()
                })
                .await
                .unwrap_err();
            assert!(matches!(err, ModerationError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn empty_patch_fields_are_rejected() {
        let m = moderator().await;
        seed_user(&m, "writer", Role::User).await;
        let article = seed_article(&m, "story", "writer").await;

        let err = m
            .update_article(
                article.id,
                ArticlePatch {
                    title: Some("  ".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ModerationError::Validation(_)));

        let updated = m
            .update_article(
                article.id,
                ArticlePatch {
                    title: Some("Renamed".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.url, article.url);
    }
}
