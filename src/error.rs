use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to chat backend failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("event stream failed: {0}")]
    Stream(String),

    #[error("session storage failed: {0}")]
    Storage(#[from] std::io::Error),

    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;
