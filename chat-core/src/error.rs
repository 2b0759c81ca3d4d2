use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChatError {
    /// True for rejections produced by the gate or the access policy.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, ChatError::PermissionDenied(_))
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
