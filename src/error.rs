use crate::time::Nanos;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("transform from frame '{from}' to frame '{to}' not found")]
    TransformNotFound { from: String, to: String },

    #[error("no transform sample within the allowed window at {0}")]
    SampleTimeNotAvailable(Nanos),

    #[error("frame '{0}' does not exist")]
    FrameNotFound(String),

    #[error("adding transform would create a cycle through frame '{0}'")]
    CycleDetected(String),

    #[error("frame id '{0}' is longer than 64 bytes")]
    FrameIdTooLong(String),
}

pub type TransformResult<T> = Result<T, TransformError>;
