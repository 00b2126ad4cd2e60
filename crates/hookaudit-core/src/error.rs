use thiserror::Error;

pub type Result<T> = std::result::Result<T, HookAuditError>;

#[derive(Debug, Error)]
pub enum HookAuditError {
    #[error("invalid environment: {0}")]
    InvalidEnvironment(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no webhook registered for URL: {0}")]
    HookNotFound(String),

    #[error("upstream call failed: {0}")]
    Upstream(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl HookAuditError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidEnvironment(_) => "INVALID_ENVIRONMENT",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::HookNotFound(_) => "HOOK_NOT_FOUND",
            Self::Upstream(_) => "UPSTREAM_ERROR",
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Http(_) => "HTTP_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
