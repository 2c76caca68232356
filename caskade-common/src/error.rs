use std::error::Error;

#[derive(thiserror::Error, Debug)]
pub enum CaskadeError {
    #[error("database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),
    #[error("invalid service URL: {0}")]
    InvalidServiceUrl(#[from] url::ParseError),
    #[error("service not allowed: {0}")]
    ServiceNotAllowed(String),
    #[error("account locked: {0}")]
    AccountLocked(String),
    #[error("user {0} not found")]
    UserNotFound(String),
    #[error("deserialization failed: {0}")]
    DeserializeJson(#[from] serde_json::Error),
    #[error("inconsistent state error")]
    InconsistentState,
    #[error(transparent)]
    Other(Box<dyn Error + Send + Sync>),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl CaskadeError {
    pub fn other<E: Error + Send + Sync + 'static>(err: E) -> Self {
        Self::Other(Box::new(err))
    }
}
