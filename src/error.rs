//! Failure taxonomy of a fill request.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FillError {
    /// Shared secret missing or wrong.
    #[error("unauthorized")]
    Unauthorized,

    /// No card carries the requested ordering number.
    #[error("no page found where {prop}={index}")]
    CardNotFound { prop: String, index: i64 },

    /// The card has no usable verse key.
    #[error("page has no \"{prop}\" value")]
    MissingVerseKey { prop: String },

    #[error("invalid index \"{0}\"")]
    InvalidIndex(String),

    #[error("missing query parameter {0}")]
    MissingParam(&'static str),

    #[error("{0} is not configured")]
    MissingConfig(&'static str),

    /// Any failure talking to the document database or the text store.
    #[error("{0:#}")]
    Upstream(#[from] anyhow::Error),
}
