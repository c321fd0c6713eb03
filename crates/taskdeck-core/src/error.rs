use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskdeckError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl TaskdeckError {
    /// The bare message, without the variant prefix. This is what screens show.
    pub fn message(&self) -> &str {
        match self {
            TaskdeckError::NotFound(msg) | TaskdeckError::InvalidInput(msg) => msg,
        }
    }
}
