//! Error types for retrieving the remote photo collection.

use thiserror::Error;

/// A refresh cycle could not obtain the remote collection.
///
/// These never reach HTTP clients; the refresh worker logs them and leaves the
/// store untouched.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to remote source failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote source answered with status {status}")]
    Status { status: u16 },

    #[error("remote payload is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("remote payload is not an array (found {found})")]
    NotAnArray { found: &'static str },
}

impl FetchError {
    /// Short machine-friendly label used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Http(_) => "http",
            FetchError::Status { .. } => "status",
            FetchError::Decode(_) => "decode",
            FetchError::NotAnArray { .. } => "not_an_array",
        }
    }
}
