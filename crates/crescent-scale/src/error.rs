use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScaleError {
    #[error("invalid scaling config: {0}")]
    InvalidConfig(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type ScaleResult<T> = Result<T, ScaleError>;
