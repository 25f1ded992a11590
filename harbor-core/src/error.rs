use harbor_model::ModelError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarborError {
    #[error("sandbox mode was detected but {key} is not set")]
    MissingConfiguration { key: &'static str },

    #[error("Invalid resource model: {0}")]
    InvalidModel(#[from] ModelError),

    #[error("Resource not found: {0}")]
    UnknownResource(String),

    #[error("Resource already registered: {0}")]
    DuplicateResource(String),

    #[error("Health check already registered: {0}")]
    DuplicateHealthCheck(String),

    #[error("Resource already started: {0}")]
    AlreadyStarted(String),

    #[error("Application host already started")]
    HostAlreadyStarted,

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, HarborError>;
