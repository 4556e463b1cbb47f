use thiserror::Error;

use crate::github::ContentHash;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file not found: {path}")]
    NotFound { path: String },

    /// The content API refuses to inline files above its size ceiling.
    #[error("file too large for the content api: {path}")]
    TooLarge { path: String },

    #[error("no permission to write: {path}")]
    NoPermission { path: String },

    #[error("conflict on {path}: {message}")]
    Conflict {
        path: String,
        expected: Option<ContentHash>,
        message: String,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("unknown remote error{}: {message}", status_suffix(.status))]
    Unknown { status: Option<u16>, message: String },

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Remote path the error refers to, when there is one.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::NotFound { path }
            | Self::TooLarge { path }
            | Self::NoPermission { path }
            | Self::Conflict { path, .. } => Some(path),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Self::Decode(err.to_string())
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {s})")).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, Error>;
