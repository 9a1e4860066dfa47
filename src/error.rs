use thiserror::Error;

/// Failure of the one network load. Surfaced as a terminal UI state; never retried.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server answered HTTP {status}")]
    Status { status: u16 },

    #[error("malformed member list: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("member id {0} appears more than once")]
    DuplicateId(String),
}
