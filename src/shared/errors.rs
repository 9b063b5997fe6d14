use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation: {0}")]
    Validation(String),

    #[error("Already exists: {0}")]
    Duplicate(String),

    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Persistence: {0}")]
    Persistence(#[from] sea_orm::DbErr),
}

impl DomainError {
    /// Whether this error is likely transient (e.g. DB connection lost)
    /// and the operation may succeed on a later tick.
    pub fn is_transient(&self) -> bool {
        matches!(self, DomainError::Persistence(_))
    }

    /// Rejections reported back to the requesting user rather than logged
    /// as failures.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            DomainError::Validation(_) | DomainError::Duplicate(_) | DomainError::NotFound { .. }
        )
    }
}
