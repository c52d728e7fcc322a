use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("http request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("keystone rejected token request: {status}")]
    Rejected { status: StatusCode },

    #[error("keystone response carries no token id")]
    MissingToken,
}
