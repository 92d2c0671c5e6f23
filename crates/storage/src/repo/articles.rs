use crate::{
    models::{convert_all, SqlArticle, ARTICLE_COLUMNS},
    now, Db,
};
use domain::commands::{ArticlePatch, NewArticle};
use domain::{Article, CommentingStatus};
use sqlx::{QueryBuilder, Sqlite};

impl Db {
    /// Returns `None` when the external id is already registered.
    pub async fn insert_article(&self, new: &NewArticle) -> anyhow::Result<Option<Article>> {
        let result = sqlx::query(
            r#"
            INSERT INTO articles (external_id, title, url, author_id, status, created_at)
            VALUES (?, ?, ?, ?, 'OPEN', ?)
            ON CONFLICT(external_id) DO NOTHING
            "#,
        )
        .bind(&new.external_id)
        .bind(&new.title)
        .bind(&new.url)
        .bind(&new.author_id)
        .bind(now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_article(result.last_insert_rowid()).await
    }

    pub async fn get_article(&self, id: i64) -> anyhow::Result<Option<Article>> {
        let row = sqlx::query_as::<_, SqlArticle>(&format!(
            "SELECT {} FROM articles a WHERE a.id = ?",
            ARTICLE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Article::try_from).transpose()
    }

    /// Applies the fields present in `patch`; absent fields keep their value.
    pub async fn update_article(
        &self,
        id: i64,
        patch: &ArticlePatch,
    ) -> anyhow::Result<Option<Article>> {
        let result = sqlx::query(
            r#"
            UPDATE articles
            SET title = COALESCE(?, title),
                url = COALESCE(?, url),
                status = COALESCE(?, status)
            WHERE id = ?
            "#,
        )
        .bind(patch.title.as_deref())
        .bind(patch.url.as_deref())
        .bind(patch.status.map(|s| s.as_str()))
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_article(id).await
    }

    /// Newest first, fifteen per page. `search` matches the title or the
    /// author's name, case-insensitively.
    pub async fn list_articles(
        &self,
        search: Option<&str>,
        status: Option<CommentingStatus>,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Article>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM articles a JOIN users u ON u.id = a.author_id WHERE 1 = 1",
            ARTICLE_COLUMNS
        ));
        if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = format!("%{}%", term.to_lowercase());
            qb.push(" AND (LOWER(a.title) LIKE ");
            qb.push_bind(pattern.clone());
            qb.push(" OR LOWER(u.name) LIKE ");
            qb.push_bind(pattern);
            qb.push(")");
        }
        if let Some(status) = status {
            qb.push(" AND a.status = ");
            qb.push_bind(status.as_str());
        }
        qb.push(" ORDER BY a.created_at DESC, a.id DESC LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let rows = qb
            .build_query_as::<SqlArticle>()
            .fetch_all(&self.pool)
            .await?;
        convert_all(rows)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{memory_db, seed_article, seed_user};
    use domain::commands::{ArticlePatch, NewArticle};
    use domain::{CommentingStatus, Role};

    #[tokio::test]
    async fn external_id_is_unique() {
        let db = memory_db().await;
        seed_user(&db, "writer", Role::User).await;
        seed_article(&db, "story-1", "writer").await;

        let dup = NewArticle {
            external_id: "story-1".into(),
            title: "Again".into(),
            url: "https://news.example.com/again".into(),
            author_id: "writer".into(),
        };
        assert!(db.insert_article(&dup).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn patch_only_touches_given_fields() {
        let db = memory_db().await;
        seed_user(&db, "writer", Role::User).await;
        let article = seed_article(&db, "story-1", "writer").await;

        let patch = ArticlePatch {
            status: Some(CommentingStatus::Closed),
            ..Default::default()
        };
        let updated = db.update_article(article.id, &patch).await.unwrap().unwrap();
        assert_eq!(updated.status, CommentingStatus::Closed);
        assert_eq!(updated.title, article.title);
        assert!(db.update_article(999, &patch).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn search_by_title_or_author() {
        let db = memory_db().await;
        seed_user(&db, "writer", Role::User).await;
        seed_article(&db, "budget", "writer").await;
        seed_article(&db, "weather", "writer").await;

        let hits = db.list_articles(Some("BUDGET"), None, 15, 0).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].external_id, "budget");

        // seeded author names are "User writer"
        let hits = db.list_articles(Some("user writer"), None, 15, 0).await.unwrap();
        assert_eq!(hits.len(), 2);

        let closed = db
            .list_articles(None, Some(CommentingStatus::Closed), 15, 0)
            .await
            .unwrap();
        assert!(closed.is_empty());
    }
}
