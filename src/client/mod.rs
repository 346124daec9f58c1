//! REST client for the video service under test.
mod http;
mod types;

#[cfg(test)]
pub(crate) mod scripted;

use async_trait::async_trait;

use crate::error::HttpError;
use crate::fixtures::{SignupProfile, TestIdentity};

pub use http::{ClientSettings, HttpWorkflowClient};
pub use types::{UploadReceipt, VideoId, VideoPayload, VideoStatus, VoteOutcome};

pub const SIGNUP_PATH: &str = "/api/auth/signup";
pub const LOGIN_PATH: &str = "/api/auth/login";
pub const UPLOAD_PATH: &str = "/api/videos/upload";
pub const MY_VIDEOS_PATH: &str = "/api/videos";
pub const PUBLIC_VIDEOS_PATH: &str = "/api/public/videos";
pub const RANKINGS_PATH: &str = "/api/public/rankings";

/// Calls a load iteration makes against the service.
///
/// Every call is a single attempt bounded by the client timeout; callers
/// decide what a failure means.
#[async_trait]
pub trait WorkflowClient: Send + Sync {
    /// Creates an account. Expects 201.
    async fn signup(&self, profile: &SignupProfile) -> Result<(), HttpError>;

    /// Exchanges credentials for a bearer token. Expects 200.
    async fn login(&self, identity: &TestIdentity) -> Result<String, HttpError>;

    /// Submits one multipart upload. Expects 201.
    async fn upload_video(
        &self,
        token: &str,
        title: &str,
        payload: &VideoPayload,
    ) -> Result<UploadReceipt, HttpError>;

    /// Reads the processing status of an uploaded video. Expects 200.
    async fn get_video_status(&self, token: &str, video_id: &VideoId)
    -> Result<VideoStatus, HttpError>;

    /// Lists a collection endpoint. Expects 200 and a JSON array.
    async fn list_resources(
        &self,
        token: Option<&str>,
        path: &str,
    ) -> Result<Vec<serde_json::Value>, HttpError>;

    /// Votes for a public video. 409 means the vote already exists.
    async fn vote(&self, token: &str, video_id: &VideoId) -> Result<VoteOutcome, HttpError>;
}

/// Path of a single video.
#[must_use]
pub fn video_path(video_id: &VideoId) -> String {
    format!("{}/{}", MY_VIDEOS_PATH, video_id)
}

/// Path of the vote endpoint for a public video.
#[must_use]
pub fn vote_path(video_id: &VideoId) -> String {
    format!("{}/{}/vote", PUBLIC_VIDEOS_PATH, video_id)
}

/// Id of a listed video; list items carry `video_id`, `id` or `ID`.
#[must_use]
pub fn listed_video_id(item: &serde_json::Value) -> Option<VideoId> {
    ["video_id", "id", "ID"]
        .iter()
        .find_map(|key| item.get(*key).and_then(VideoId::from_json))
}
