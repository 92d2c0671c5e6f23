use super::auth::require_api_key;
use super::handlers::{articles, audit, comments, users};
use crate::state::AppState;
use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

const METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
];

fn cors_layer(allowed_origins: &str) -> CorsLayer {
    if allowed_origins == "*" {
        return CorsLayer::new()
            .allow_methods(METHODS)
            .allow_origin(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<HeaderValue>().ok())
        .collect();

    if origins.is_empty() {
        tracing::warn!("CORS config is invalid or empty, falling back to allow ANY.");
        CorsLayer::new()
            .allow_methods(METHODS)
            .allow_origin(Any)
            .allow_headers(Any)
    } else {
        tracing::info!("CORS enabled for origins: {:?}", origins);
        CorsLayer::new()
            .allow_methods(METHODS)
            .allow_origin(origins)
            .allow_headers(Any)
    }
}

pub fn build_router(state: AppState, allowed_origins: &str) -> Router {
    let api = Router::new()
        .route(
            "/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route(
            "/comments/:id",
            get(comments::get_comment).patch(comments::edit_comment),
        )
        .route("/comments/:id/status", put(comments::update_status))
        .route("/comments/:id/like", post(comments::like_comment))
        .route("/comments/:id/thread", get(comments::get_thread))
        .route("/comments/:id/status-changes", get(comments::comment_history))
        .route("/status-changes", get(audit::list_status_changes))
        .route("/statistics", get(audit::statistics))
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/:id",
            get(users::get_user)
                .patch(users::rename_user)
                .delete(users::delete_user),
        )
        .route("/users/:id/suspension", put(users::suspend_user))
        .route("/users/:id/role", put(users::set_role))
        .route("/users/:id/authorization", get(users::check_authorization))
        .route(
            "/articles",
            get(articles::list_articles).post(articles::create_article),
        )
        .route(
            "/articles/:id",
            get(articles::get_article).patch(articles::update_article),
        )
        .route("/articles/:id/approved-count", get(articles::approved_count))
        .route("/articles/:id/comments", get(articles::approved_comments))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::test_support::{moderator, seed};
    use axum::http::StatusCode;
    use domain::{Comment, CommentStatus};
    use pretty_assertions::assert_eq;
    use reqwest::Client;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tokio::net::TcpListener;

    const KEY: &str = "test-key";

    struct TestApp {
        base: String,
        client: Client,
        article_id: i64,
    }

    impl TestApp {
        fn url(&self, path: &str) -> String {
            format!("{}{}", self.base, path)
        }

        fn get(&self, path: &str) -> reqwest::RequestBuilder {
            self.client.get(self.url(path)).header("x-api-key", KEY)
        }
    }

    async fn spawn_app() -> TestApp {
        let m = moderator().await;
        let article_id = seed(&m).await;
        let state = AppState {
            moderator: m,
            api_key: Arc::from(KEY),
        };
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = build_router(state, "*");
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        TestApp {
            base: format!("http://{}", addr),
            client: Client::new(),
            article_id,
        }
    }

    #[tokio::test]
    async fn api_routes_require_the_key() {
        let app = spawn_app().await;

        let res = app.client.get(app.url("/api/statistics")).send().await.unwrap();
        assert_eq!(res.status().as_u16(), StatusCode::UNAUTHORIZED.as_u16());

        let res = app
            .client
            .get(app.url("/api/statistics"))
            .header("x-api-key", "nope")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), StatusCode::UNAUTHORIZED.as_u16());

        let res = app.get("/api/statistics").send().await.unwrap();
        assert_eq!(res.status().as_u16(), StatusCode::OK.as_u16());
        let stats: Value = res.json().await.unwrap();
        assert_eq!(stats["active_users"], json!(2));
        assert_eq!(stats["new_users_last_7_days"].as_array().map(Vec::len), Some(7));
        assert_eq!(stats["comments_last_24_hours"].as_array().map(Vec::len), Some(24));

        let res = app.client.get(app.url("/health")).send().await.unwrap();
        assert_eq!(res.status().as_u16(), StatusCode::OK.as_u16());
        assert_eq!(res.text().await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn review_and_like_over_http() {
        let app = spawn_app().await;

        let res = app
            .client
            .post(app.url("/api/comments"))
            .header("x-api-key", KEY)
            .json(&json!({
                "content": "Interesting read",
                "author_id": "reader",
                "article_id": app.article_id,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), StatusCode::OK.as_u16());
        let created: Comment = res.json().await.unwrap();
        assert_eq!(created.status, CommentStatus::Pending);

        let review = json!({
            "status": "APPROVED",
            "actor_id": "mod",
            "expected_status": "PENDING",
        });
        let status_url = app.url(&format!("/api/comments/{}/status", created.id));
        let res = app
            .client
            .put(&status_url)
            .header("x-api-key", KEY)
            .json(&review)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), StatusCode::OK.as_u16());
        let approved: Comment = res.json().await.unwrap();
        assert_eq!(approved.status, CommentStatus::Approved);
        assert_eq!(approved.reviewed_by_id.as_deref(), Some("mod"));

        // the same review again no longer matches the stored status
        let res = app
            .client
            .put(&status_url)
            .header("x-api-key", KEY)
            .json(&review)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), StatusCode::CONFLICT.as_u16());

        let like_url = app.url(&format!("/api/comments/{}/like", created.id));
        let like = json!({ "user_email": "mod@example.com" });
        let res = app
            .client
            .post(&like_url)
            .header("x-api-key", KEY)
            .json(&like)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), StatusCode::OK.as_u16());
        let liked: Comment = res.json().await.unwrap();
        assert_eq!(liked.like_count, 1);

        let res = app
            .client
            .post(&like_url)
            .header("x-api-key", KEY)
            .json(&like)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), StatusCode::CONFLICT.as_u16());
    }

    #[tokio::test]
    async fn error_kinds_map_to_status_codes() {
        let app = spawn_app().await;

        let res = app.get("/api/comments/12345").send().await.unwrap();
        assert_eq!(res.status().as_u16(), StatusCode::NOT_FOUND.as_u16());

        let res = app
            .get(&format!("/api/comments?page={}", i64::MAX))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), StatusCode::BAD_REQUEST.as_u16());

        let res = app
            .get(&format!("/api/articles?page={}", i64::MAX))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), StatusCode::BAD_REQUEST.as_u16());

        let res = app
            .client
            .delete(app.url("/api/users/mod?deleted_by_id=reader"))
            .header("x-api-key", KEY)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), StatusCode::FORBIDDEN.as_u16());
        assert_eq!(
            res.text().await.unwrap(),
            "You are not authorised to delete this user"
        );
    }
}
