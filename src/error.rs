use thiserror::Error;

#[derive(Error, Debug)]
pub enum AllocationError {
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Payment reference '{0}' already exists")]
    DuplicateReference(String),
    #[error("Payment '{0}' not found")]
    NotFound(String),
    #[error("Invalid status transition from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },
}

pub type Result<T> = std::result::Result<T, AllocationError>;

impl AllocationError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }
}
