use bytes::Bytes;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::HttpError;

/// Body uploaded when no video file is configured.
const DUMMY_VIDEO: &[u8] = b"This is a dummy video file for testing purposes";
const DUMMY_FILE_NAME: &str = "test-video.mp4";
pub(crate) const VIDEO_MIME: &str = "video/mp4";

/// Server-assigned video identifier, kept as text whether the service sent a
/// string or a number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reads an id from a JSON string or non-negative integer.
    pub(crate) fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(text) if !text.is_empty() => Some(Self(text.clone())),
            serde_json::Value::Number(number) => number.as_u64().map(|id| Self(id.to_string())),
            serde_json::Value::Null
            | serde_json::Value::Bool(_)
            | serde_json::Value::String(_)
            | serde_json::Value::Array(_)
            | serde_json::Value::Object(_) => None,
        }
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Processing state reported by `GET /api/videos/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Uploaded,
    Processing,
    Processed,
    Failed,
}

impl VideoStatus {
    /// Position in the forward-only lifecycle; both terminal states share a rank.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            VideoStatus::Uploaded => 0,
            VideoStatus::Processing => 1,
            VideoStatus::Processed | VideoStatus::Failed => 2,
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, VideoStatus::Processed | VideoStatus::Failed)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            VideoStatus::Uploaded => "uploaded",
            VideoStatus::Processing => "processing",
            VideoStatus::Processed => "processed",
            VideoStatus::Failed => "failed",
        }
    }
}

impl FromStr for VideoStatus {
    type Err = HttpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uploaded" => Ok(VideoStatus::Uploaded),
            "processing" => Ok(VideoStatus::Processing),
            "processed" => Ok(VideoStatus::Processed),
            "failed" => Ok(VideoStatus::Failed),
            _ => Err(HttpError::UnknownVideoStatus {
                value: s.to_owned(),
            }),
        }
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub video_id: VideoId,
    pub task_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    Registered,
    AlreadyVoted,
}

/// File bytes sent as the `video_file` part of every upload. Clones share
/// one buffer.
#[derive(Debug, Clone)]
pub struct VideoPayload {
    pub file_name: String,
    pub bytes: Bytes,
}

impl VideoPayload {
    /// Reads the configured video file, or falls back to a small dummy body.
    ///
    /// # Errors
    ///
    /// Returns an error when a configured file cannot be read.
    pub async fn load(path: Option<&Path>) -> Result<Self, HttpError> {
        let Some(path) = path else {
            return Ok(Self::dummy());
        };
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|err| HttpError::ReadVideoFile {
                path: path.to_path_buf(),
                source: err,
            })?;
        let file_name = path
            .file_name()
            .and_then(|value| value.to_str())
            .unwrap_or(DUMMY_FILE_NAME)
            .to_owned();
        Ok(Self {
            file_name,
            bytes: Bytes::from(bytes),
        })
    }

    #[must_use]
    pub fn dummy() -> Self {
        Self {
            file_name: DUMMY_FILE_NAME.to_owned(),
            bytes: Bytes::from_static(DUMMY_VIDEO),
        }
    }
}
