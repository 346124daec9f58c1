use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// REST operation a client error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Signup,
    Login,
    Upload,
    GetVideo,
    ListResources,
    Vote,
}

impl Operation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Operation::Signup => "signup",
            Operation::Login => "login",
            Operation::Upload => "upload",
            Operation::GetVideo => "get-video",
            Operation::ListResources => "list",
            Operation::Vote => "vote",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Invalid base URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Failed to build URL for '{path}': {source}")]
    JoinUrlFailed {
        path: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Failed to build HTTP client: {source}")]
    BuildClientFailed {
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to build multipart body: {source}")]
    BuildMultipartFailed {
        #[source]
        source: reqwest::Error,
    },
    #[error("{operation} request failed: {source}")]
    Transport {
        operation: Operation,
        #[source]
        source: reqwest::Error,
    },
    #[error("{operation} request timed out.")]
    Timeout { operation: Operation },
    #[error("{operation} returned status {status} (expected {expected}).")]
    UnexpectedStatus {
        operation: Operation,
        status: u16,
        expected: u16,
    },
    #[error("{operation} returned an invalid JSON body: {source}")]
    InvalidBody {
        operation: Operation,
        #[source]
        source: serde_json::Error,
    },
    #[error("{operation} response is missing '{field}'.")]
    MissingField {
        operation: Operation,
        field: &'static str,
    },
    #[error("{operation} response body is not an array.")]
    NotAnArray { operation: Operation },
    #[error("Unknown video status '{value}'.")]
    UnknownVideoStatus { value: String },
    #[error("Failed to read video file '{path}': {source}")]
    ReadVideoFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl HttpError {
    /// Maps a reqwest failure to a timeout or transport error.
    #[must_use]
    pub fn from_reqwest(operation: Operation, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            HttpError::Timeout { operation }
        } else {
            HttpError::Transport { operation, source }
        }
    }

    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, HttpError::Timeout { .. })
    }

    /// Status code the service answered with, when it answered at all.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            HttpError::UnexpectedStatus { status, .. } => Some(*status),
            HttpError::InvalidBaseUrl { .. }
            | HttpError::JoinUrlFailed { .. }
            | HttpError::BuildClientFailed { .. }
            | HttpError::BuildMultipartFailed { .. }
            | HttpError::Transport { .. }
            | HttpError::Timeout { .. }
            | HttpError::InvalidBody { .. }
            | HttpError::MissingField { .. }
            | HttpError::NotAnArray { .. }
            | HttpError::UnknownVideoStatus { .. }
            | HttpError::ReadVideoFile { .. } => None,
        }
    }
}
