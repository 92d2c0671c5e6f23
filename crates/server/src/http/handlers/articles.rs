use axum::{
    extract::{Path, Query, State},
    Json,
};
use domain::commands::{ArticlePatch, ArticleQuery, NewArticle};
use domain::{Article, Comment, CommentingStatus};
use moderation::Moderator;
use serde::{Deserialize, Serialize};

use crate::http::error::{http_error, ApiResult};

#[derive(Deserialize)]
pub struct CreateArticleRequest {
    pub external_id: String,
    pub title: String,
    pub url: String,
    pub author_id: String,
}

#[derive(Deserialize, Default)]
pub struct UpdateArticleRequest {
    pub title: Option<String>,
    pub url: Option<String>,
    pub status: Option<CommentingStatus>,
}

#[derive(Deserialize, Default)]
pub struct ListArticlesQuery {
    pub search: Option<String>,
    pub status: Option<CommentingStatus>,
    pub page: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ApprovedCount {
    /// Absent while commenting on the article is closed.
    pub count: Option<i64>,
}

pub async fn create_article(
    State(moderator): State<Moderator>,
    Json(payload): Json<CreateArticleRequest>,
) -> ApiResult<Article> {
    let new = NewArticle {
        external_id: payload.external_id,
        title: payload.title,
        url: payload.url,
        author_id: payload.author_id,
    };
    moderator.create_article(new).await.map(Json).map_err(http_error)
}

pub async fn list_articles(
    State(moderator): State<Moderator>,
    Query(query): Query<ListArticlesQuery>,
) -> ApiResult<Vec<Article>> {
    let query = ArticleQuery {
        search: query.search,
        status: query.status,
        page: query.page.unwrap_or(0),
    };
    moderator.list_articles(query).await.map(Json).map_err(http_error)
}

pub async fn get_article(
    State(moderator): State<Moderator>,
    Path(article_id): Path<i64>,
) -> ApiResult<Article> {
    moderator
        .get_article(article_id)
        .await
        .map(Json)
        .map_err(http_error)
}

pub async fn update_article(
    State(moderator): State<Moderator>,
    Path(article_id): Path<i64>,
    Json(payload): Json<UpdateArticleRequest>,
) -> ApiResult<Article> {
    let patch = ArticlePatch {
        title: payload.title,
        url: payload.url,
        status: payload.status,
    };
    moderator
        .update_article(article_id, patch)
        .await
        .map(Json)
        .map_err(http_error)
}

pub async fn approved_count(
    State(moderator): State<Moderator>,
    Path(article_id): Path<i64>,
) -> ApiResult<ApprovedCount> {
    moderator
        .approved_comment_count(article_id)
        .await
        .map(|count| Json(ApprovedCount { count }))
        .map_err(http_error)
}

pub async fn approved_comments(
    State(moderator): State<Moderator>,
    Path(article_id): Path<i64>,
) -> ApiResult<Vec<Comment>> {
    moderator
        .list_approved_for_article(article_id)
        .await
        .map(Json)
        .map_err(http_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::test_support::{moderator, seed};
    use axum::http::StatusCode;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn closing_hides_the_count() {
        let m = moderator().await;
        let article_id = seed(&m).await;

        let Json(open) = approved_count(State(m.clone()), Path(article_id)).await.unwrap();
        assert_eq!(open.count, Some(0));

        update_article(
            State(m.clone()),
            Path(article_id),
            Json(UpdateArticleRequest {
                status: Some(CommentingStatus::Closed),
                ..Default::default()
            }),
        )
        .await
        .unwrap();

        let Json(closed) = approved_count(State(m.clone()), Path(article_id)).await.unwrap();
        assert_eq!(closed.count, None);

        let (code, _) = approved_count(State(m), Path(404)).await.unwrap_err();
        assert_eq!(code, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let m = moderator().await;
        seed(&m).await;

        let request = || CreateArticleRequest {
            external_id: "launch".into(),
            title: "Launch day".into(),
            url: "https://news.example.com/launch".into(),
            author_id: "reader".into(),
        };
        create_article(State(m.clone()), Json(request())).await.unwrap();
        let (code, _) = create_article(State(m.clone()), Json(request()))
            .await
            .unwrap_err();
        assert_eq!(code, StatusCode::CONFLICT);

        let Json(list) = list_articles(
            State(m),
            Query(ListArticlesQuery {
                search: Some("launch".into()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(list.len(), 1);
    }
}
