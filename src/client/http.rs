use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, RequestBuilder, StatusCode, Url};
use std::time::Duration;
use tracing::debug;

use crate::args::DEFAULT_USER_AGENT;
use crate::error::{HttpError, Operation};
use crate::fixtures::{SignupProfile, TestIdentity};

use super::types::{UploadReceipt, VIDEO_MIME, VideoId, VideoPayload, VideoStatus, VoteOutcome};
use super::{LOGIN_PATH, SIGNUP_PATH, UPLOAD_PATH, WorkflowClient, video_path, vote_path};

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

/// `WorkflowClient` over a shared reqwest connection pool.
#[derive(Debug, Clone)]
pub struct HttpWorkflowClient {
    client: Client,
    base_url: String,
}

impl HttpWorkflowClient {
    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns an error when the base URL is invalid or the client cannot be built.
    pub fn new(settings: &ClientSettings) -> Result<Self, HttpError> {
        Url::parse(&settings.base_url).map_err(|err| HttpError::InvalidBaseUrl {
            url: settings.base_url.clone(),
            source: err,
        })?;
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .connect_timeout(settings.connect_timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()
            .map_err(|err| HttpError::BuildClientFailed { source: err })?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_owned(),
        })
    }

    fn url(&self, path: &str) -> Result<Url, HttpError> {
        let joined = format!("{}{}", self.base_url, path);
        Url::parse(&joined).map_err(|err| HttpError::JoinUrlFailed {
            path: path.to_owned(),
            source: err,
        })
    }

    async fn send(
        operation: Operation,
        request: RequestBuilder,
    ) -> Result<(StatusCode, Vec<u8>), HttpError> {
        let response = request
            .send()
            .await
            .map_err(|err| HttpError::from_reqwest(operation, err))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| HttpError::from_reqwest(operation, err))?;
        debug!("{} -> {} ({} bytes)", operation, status.as_u16(), body.len());
        Ok((status, body.to_vec()))
    }

    async fn expect_json(
        operation: Operation,
        request: RequestBuilder,
        expected: StatusCode,
    ) -> Result<serde_json::Value, HttpError> {
        let (status, body) = Self::send(operation, request).await?;
        expect_status(operation, status, expected)?;
        serde_json::from_slice(&body).map_err(|err| HttpError::InvalidBody {
            operation,
            source: err,
        })
    }
}

fn expect_status(
    operation: Operation,
    status: StatusCode,
    expected: StatusCode,
) -> Result<(), HttpError> {
    if status == expected {
        Ok(())
    } else {
        Err(HttpError::UnexpectedStatus {
            operation,
            status: status.as_u16(),
            expected: expected.as_u16(),
        })
    }
}

fn string_field(
    operation: Operation,
    body: &serde_json::Value,
    keys: &[&'static str],
    field: &'static str,
) -> Result<String, HttpError> {
    keys.iter()
        .find_map(|key| body.get(*key).and_then(serde_json::Value::as_str))
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .ok_or(HttpError::MissingField { operation, field })
}

#[async_trait]
impl WorkflowClient for HttpWorkflowClient {
    async fn signup(&self, profile: &SignupProfile) -> Result<(), HttpError> {
        let request = self.client.post(self.url(SIGNUP_PATH)?).json(profile);
        let (status, _body) = Self::send(Operation::Signup, request).await?;
        expect_status(Operation::Signup, status, StatusCode::CREATED)
    }

    async fn login(&self, identity: &TestIdentity) -> Result<String, HttpError> {
        let request = self
            .client
            .post(self.url(LOGIN_PATH)?)
            .json(&serde_json::json!({
                "email": identity.email,
                "password": identity.password,
            }));
        let body = Self::expect_json(Operation::Login, request, StatusCode::OK).await?;
        string_field(
            Operation::Login,
            &body,
            &["access_token", "token"],
            "access_token",
        )
    }

    async fn upload_video(
        &self,
        token: &str,
        title: &str,
        payload: &VideoPayload,
    ) -> Result<UploadReceipt, HttpError> {
        let length = u64::try_from(payload.bytes.len()).unwrap_or(u64::MAX);
        let part = Part::stream_with_length(Body::from(payload.bytes.clone()), length)
            .file_name(payload.file_name.clone())
            .mime_str(VIDEO_MIME)
            .map_err(|err| HttpError::BuildMultipartFailed { source: err })?;
        let form = Form::new()
            .text("title", title.to_owned())
            .part("video_file", part);
        let request = self
            .client
            .post(self.url(UPLOAD_PATH)?)
            .bearer_auth(token)
            .multipart(form);
        let body = Self::expect_json(Operation::Upload, request, StatusCode::CREATED).await?;
        let video_id = body
            .get("video_id")
            .and_then(VideoId::from_json)
            .ok_or(HttpError::MissingField {
                operation: Operation::Upload,
                field: "video_id",
            })?;
        let task_id = body
            .get("task_id")
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned);
        Ok(UploadReceipt { video_id, task_id })
    }

    async fn get_video_status(
        &self,
        token: &str,
        video_id: &VideoId,
    ) -> Result<VideoStatus, HttpError> {
        let request = self
            .client
            .get(self.url(&video_path(video_id))?)
            .bearer_auth(token);
        let body = Self::expect_json(Operation::GetVideo, request, StatusCode::OK).await?;
        string_field(Operation::GetVideo, &body, &["status", "Status"], "status")?.parse()
    }

    async fn list_resources(
        &self,
        token: Option<&str>,
        path: &str,
    ) -> Result<Vec<serde_json::Value>, HttpError> {
        let mut request = self.client.get(self.url(path)?);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        match Self::expect_json(Operation::ListResources, request, StatusCode::OK).await? {
            serde_json::Value::Array(items) => Ok(items),
            serde_json::Value::Null
            | serde_json::Value::Bool(_)
            | serde_json::Value::Number(_)
            | serde_json::Value::String(_)
            | serde_json::Value::Object(_) => Err(HttpError::NotAnArray {
                operation: Operation::ListResources,
            }),
        }
    }

    async fn vote(&self, token: &str, video_id: &VideoId) -> Result<VoteOutcome, HttpError> {
        let request = self
            .client
            .post(self.url(&vote_path(video_id))?)
            .bearer_auth(token);
        let (status, _body) = Self::send(Operation::Vote, request).await?;
        if status == StatusCode::CONFLICT {
            return Ok(VoteOutcome::AlreadyVoted);
        }
        expect_status(Operation::Vote, status, StatusCode::OK)?;
        Ok(VoteOutcome::Registered)
    }
}
