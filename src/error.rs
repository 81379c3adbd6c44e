//! Errors raised while talking to the content repository

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("content repository answered {status} for {url}")]
    Status { status: u16, url: String },

    #[error("malformed repository response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid repository URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("cursor {0} does not belong to the configured repository")]
    ForeignCursor(String),

    #[error("repository did not advertise a master ref")]
    MissingMasterRef,
}
