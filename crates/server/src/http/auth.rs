use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

fn key_matches(headers: &HeaderMap, expected: &str) -> Result<(), (StatusCode, String)> {
    let provided = headers
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or((StatusCode::UNAUTHORIZED, "Missing x-api-key header".into()))?;
    if provided != expected {
        return Err((StatusCode::UNAUTHORIZED, "Invalid API key".into()));
    }
    Ok(())
}

pub async fn require_api_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, (StatusCode, String)> {
    if let Err(rejection) = key_matches(req.headers(), &state.api_key) {
        tracing::warn!(path = %req.uri().path(), "Rejected request: {}", rejection.1);
        return Err(rejection);
    }
    Ok(next.run(req).await)
}
