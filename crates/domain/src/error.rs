use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModerationError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    /// Storage or transaction failure. Only the operation name is kept here;
    /// the underlying cause is logged where it happens.
    #[error("internal error during {0}")]
    Internal(&'static str),
}

impl ModerationError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        ModerationError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        ModerationError::Validation(msg.into())
    }
}

pub type ModerationResult<T> = Result<T, ModerationError>;
