use axum::{http::StatusCode, Json};
use domain::ModerationError;

pub type ApiError = (StatusCode, String);
pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// Maps the service error onto a status code. Internal failures were already
/// logged with their cause, so the client only gets a generic message.
pub fn http_error(err: ModerationError) -> ApiError {
    match err {
        ModerationError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
        e @ ModerationError::NotFound { .. } => (StatusCode::NOT_FOUND, e.to_string()),
        ModerationError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
        ModerationError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        ModerationError::Internal(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn maps_each_kind() {
        let cases = [
            (ModerationError::validation("Missing content"), StatusCode::BAD_REQUEST),
            (ModerationError::not_found("comment", 42), StatusCode::NOT_FOUND),
            (ModerationError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (ModerationError::Conflict("stale".into()), StatusCode::CONFLICT),
            (ModerationError::Internal("transition"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, code) in cases {
            assert_eq!(http_error(err).0, code);
        }
    }

    #[test]
    fn internal_detail_is_hidden() {
        let (_, body) = http_error(ModerationError::Internal("apply_status_change"));
        assert_eq!(body, "Internal server error");

        let (_, body) = http_error(ModerationError::not_found("comment", 42));
        assert_eq!(body, "comment not found: 42");
    }
}
