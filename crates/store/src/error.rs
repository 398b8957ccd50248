use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Not found")]
    NotFound,
    #[error("Denied: {0}")]
    Denied(String),
    #[error("Validation: {0}")]
    Validation(String),
    #[error("Unexpected status {status}: {body}")]
    Unexpected { status: u16, body: String },
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Unknown table: {0}")]
    UnknownTable(String),
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),
    #[error("Envelope missing `{0}` row")]
    MissingRow(&'static str),
    #[error("Row decode error: {0}")]
    Decode(#[from] serde_json::Error),
}
