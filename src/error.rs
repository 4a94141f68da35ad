//! Failure taxonomy for the fetch pipeline.
//!
//! None of these are fatal to a run. The pipeline catches each one at the
//! smallest scope that makes sense and turns it into a [`Notice`](crate::notice::Notice)
//! so a partial run still leaves the vault in a consistent state.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The app access token could not be obtained.
    #[error("token request failed: {0}")]
    Auth(String),

    /// The API answered with an error payload.
    #[error("{0}")]
    Api(String),

    /// The request never produced a usable response body.
    #[error("{0}")]
    Transport(String),

    /// A single vault operation failed.
    #[error("Failed to write file: {0}")]
    Write(String),
}

impl FetchError {
    /// Short machine-readable kind, used in JSON notices.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Auth(_) => "auth",
            FetchError::Api(_) => "api",
            FetchError::Transport(_) => "transport",
            FetchError::Write(_) => "write",
        }
    }
}
