use thiserror::Error;

use crate::auth::AuthError;
use crate::dao::base::DaoError;

/// Failure of a remote capability (LLM, maps, mail, WhatsApp).
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{0} timed out")]
    Timeout(&'static str),
    #[error("{0} rejected the request: {1}")]
    Rejected(&'static str, String),
    #[error("{0} unavailable: {1}")]
    Unavailable(&'static str, String),
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

impl ProviderError {
    /// Maps a reqwest failure for `provider` into the taxonomy.
    pub fn from_reqwest(provider: &'static str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout(provider)
        } else if let Some(status) = e.status().filter(|s| s.is_client_error()) {
            ProviderError::Rejected(provider, status.to_string())
        } else {
            ProviderError::Unavailable(provider, e.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Authentication required: {0}")]
    AuthRequired(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Provider timeout: {0}")]
    ProviderTimeout(String),
    #[error("Provider rejected: {0}")]
    ProviderRejected(String),
    #[error("Transcoding failed: {0}")]
    TranscodeFailed(String),
    #[error("No speech recognised")]
    NoSpeech,
    #[error("Dependency unavailable: {0}")]
    DependencyUnavailable(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<DaoError> for ServiceError {
    fn from(e: DaoError) -> Self {
        match e {
            DaoError::NotFound => ServiceError::NotFound("Entity not found".to_string()),
            DaoError::DuplicateKey(msg) => ServiceError::Conflict(msg),
            DaoError::Validation(msg) => ServiceError::Validation(msg),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for ServiceError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::HashError(msg) => ServiceError::Internal(msg),
            other => ServiceError::AuthRequired(other.to_string()),
        }
    }
}

impl From<ProviderError> for ServiceError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Timeout(_) => ServiceError::ProviderTimeout(e.to_string()),
            ProviderError::Rejected(..) => ServiceError::ProviderRejected(e.to_string()),
            ProviderError::Unavailable(..) | ProviderError::NotConfigured(_) => {
                ServiceError::DependencyUnavailable(e.to_string())
            }
        }
    }
}
