use crate::filter::FilterError;
use crate::pipe::PipeError;
use crate::sender::SenderError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid scenario JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),

    #[error("Filter configuration rejected: {0}")]
    Filter(#[from] FilterError),

    #[error("Sender configuration rejected: {0}")]
    Sender(#[from] SenderError),

    #[error("Pipe configuration rejected: {0}")]
    Pipe(#[from] PipeError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
