// Stream store errors

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("unknown namespace {0:?}")]
    NamespaceNotFound(Option<String>),

    #[error("unknown stream {0}")]
    StreamNotFound(String),

    #[error("stream already exists: {0}")]
    StreamExists(String),

    #[error("invalid frame number {0}")]
    InvalidFrameNumber(i64),
}
