use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum PipeError {
    #[error("Link capacity must be at least 8 kbps, got {0}")]
    InvalidLinkCapacity(u32),

    #[error("Loss percentage must be within [0, 100], got {0}")]
    InvalidLossPercent(f32),

    #[error("Queue delay must not be negative, got {0} ms")]
    NegativeQueueDelay(i64),
}

pub type PipeResult<T> = Result<T, PipeError>;
