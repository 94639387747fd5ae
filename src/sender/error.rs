use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum SenderError {
    #[error("Invalid frame rate: {0} fps")]
    InvalidFrameRate(f32),

    #[error("First frame offset must be in [0, 1), got {0}")]
    InvalidFrameOffset(f32),
}

pub type SenderResult<T> = Result<T, SenderError>;
