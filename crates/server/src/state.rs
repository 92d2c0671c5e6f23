use axum::extract::FromRef;
use moderation::Moderator;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub moderator: Moderator,
    pub api_key: Arc<str>,
}

impl FromRef<AppState> for Moderator {
    fn from_ref(state: &AppState) -> Self {
        state.moderator.clone()
    }
}
