use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Percentage must be within [0, 100], got {0}")]
    InvalidPercentage(f32),

    #[error("Invalid capacity: {0} kbps")]
    InvalidCapacity(u32),

    #[error("Negative delay: {0} ms")]
    NegativeDelay(i64),

    #[error("Failed to read trace file {path:?}: {source}")]
    TraceIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed trace timestamp on line {line}: {value:?}")]
    TraceParse { line: usize, value: String },

    #[error("Trace timestamps must be strictly ascending (line {line})")]
    TraceNotAscending { line: usize },

    #[error("Trace contains no timestamps")]
    EmptyTrace,
}

pub type FilterResult<T> = Result<T, FilterError>;
