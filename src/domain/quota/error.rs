use crate::error::AppError;

#[derive(Debug, thiserror::Error)]
pub enum QuotaServiceError {
    #[error("dependency error: {0}")]
    Dependency(String),
}

impl From<AppError> for QuotaServiceError {
    fn from(err: AppError) -> Self {
        QuotaServiceError::Dependency(err.to_string())
    }
}

impl From<QuotaServiceError> for AppError {
    fn from(err: QuotaServiceError) -> Self {
        match err {
            QuotaServiceError::Dependency(msg) => AppError::Internal(msg),
        }
    }
}
