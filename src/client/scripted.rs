//! In-memory `WorkflowClient` with scripted responses for executor tests.
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::error::{HttpError, Operation};
use crate::fixtures::{SignupProfile, TestIdentity};

use super::{UploadReceipt, VideoId, VideoPayload, VideoStatus, VoteOutcome, WorkflowClient};

/// `None` in a status script answers that poll with a 500.
pub(crate) type StatusScript = Vec<Option<VideoStatus>>;

#[derive(Debug, Default, Clone)]
pub(crate) struct CallLog {
    pub signups: Vec<String>,
    pub logins: usize,
    pub uploads: Vec<String>,
    pub polls: HashMap<String, usize>,
    pub lists: Vec<String>,
    pub votes: Vec<String>,
}

impl CallLog {
    pub fn total_polls(&self) -> usize {
        self.polls.values().sum()
    }
}

#[derive(Debug)]
struct ScriptState {
    reject_login: bool,
    failing_signups: Vec<usize>,
    failing_uploads: Vec<usize>,
    statuses: HashMap<String, StatusScript>,
    default_statuses: StatusScript,
    next_video_id: u64,
    public_videos: Vec<serde_json::Value>,
    calls: CallLog,
}

#[derive(Debug)]
pub(crate) struct ScriptedClient {
    state: Mutex<ScriptState>,
}

impl Default for ScriptedClient {
    fn default() -> Self {
        Self {
            state: Mutex::new(ScriptState {
                reject_login: false,
                failing_signups: Vec::new(),
                failing_uploads: Vec::new(),
                statuses: HashMap::new(),
                default_statuses: Vec::new(),
                next_video_id: 42,
                public_videos: Vec::new(),
                calls: CallLog::default(),
            }),
        }
    }
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state(self, update: impl FnOnce(&mut ScriptState)) -> Self {
        update(&mut self.state.lock().unwrap_or_else(PoisonError::into_inner));
        self
    }

    pub fn rejecting_login(self) -> Self {
        self.with_state(|state| state.reject_login = true)
    }

    pub fn failing_signups(self, indices: &[usize]) -> Self {
        self.with_state(|state| state.failing_signups = indices.to_vec())
    }

    pub fn failing_uploads(self, indices: &[usize]) -> Self {
        self.with_state(|state| state.failing_uploads = indices.to_vec())
    }

    pub fn statuses_for(self, video_id: &str, script: StatusScript) -> Self {
        self.with_state(|state| {
            state.statuses.insert(video_id.to_owned(), script);
        })
    }

    /// Script used by videos without their own.
    pub fn default_statuses(self, script: StatusScript) -> Self {
        self.with_state(|state| state.default_statuses = script)
    }

    pub fn public_videos(self, items: Vec<serde_json::Value>) -> Self {
        self.with_state(|state| state.public_videos = items)
    }

    pub fn calls(&self) -> CallLog {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn server_error(operation: Operation) -> HttpError {
    HttpError::UnexpectedStatus {
        operation,
        status: 500,
        expected: 200,
    }
}

#[async_trait]
impl WorkflowClient for ScriptedClient {
    async fn signup(&self, profile: &SignupProfile) -> Result<(), HttpError> {
        let mut state = self.lock();
        let index = state.calls.signups.len();
        state.calls.signups.push(profile.email.clone());
        if state.failing_signups.contains(&index) {
            return Err(HttpError::UnexpectedStatus {
                operation: Operation::Signup,
                status: 400,
                expected: 201,
            });
        }
        Ok(())
    }

    async fn login(&self, identity: &TestIdentity) -> Result<String, HttpError> {
        let mut state = self.lock();
        state.calls.logins = state.calls.logins.saturating_add(1);
        if state.reject_login {
            return Err(HttpError::UnexpectedStatus {
                operation: Operation::Login,
                status: 401,
                expected: 200,
            });
        }
        Ok(format!("token-{}", identity.email))
    }

    async fn upload_video(
        &self,
        _token: &str,
        title: &str,
        _payload: &VideoPayload,
    ) -> Result<UploadReceipt, HttpError> {
        let mut state = self.lock();
        let index = state.calls.uploads.len();
        state.calls.uploads.push(title.to_owned());
        if state.failing_uploads.contains(&index) {
            return Err(server_error(Operation::Upload));
        }
        let video_id = VideoId::new(state.next_video_id.to_string());
        state.next_video_id = state.next_video_id.saturating_add(1);
        Ok(UploadReceipt {
            video_id,
            task_id: Some(format!("task-{}", index)),
        })
    }

    async fn get_video_status(
        &self,
        _token: &str,
        video_id: &VideoId,
    ) -> Result<VideoStatus, HttpError> {
        let mut state = self.lock();
        let poll = state.calls.polls.entry(video_id.as_str().to_owned()).or_insert(0);
        let attempt = *poll;
        *poll = poll.saturating_add(1);
        let script = state
            .statuses
            .get(video_id.as_str())
            .unwrap_or(&state.default_statuses);
        let step = script.get(attempt).or_else(|| script.last()).copied();
        match step {
            Some(Some(status)) => Ok(status),
            Some(None) => Err(server_error(Operation::GetVideo)),
            None => Ok(VideoStatus::Processing),
        }
    }

    async fn list_resources(
        &self,
        _token: Option<&str>,
        path: &str,
    ) -> Result<Vec<serde_json::Value>, HttpError> {
        let mut state = self.lock();
        state.calls.lists.push(path.to_owned());
        if path == super::PUBLIC_VIDEOS_PATH {
            Ok(state.public_videos.clone())
        } else {
            Ok(Vec::new())
        }
    }

    async fn vote(&self, _token: &str, video_id: &VideoId) -> Result<VoteOutcome, HttpError> {
        let mut state = self.lock();
        let already = state.calls.votes.iter().any(|id| id == video_id.as_str());
        state.calls.votes.push(video_id.as_str().to_owned());
        if already {
            Ok(VoteOutcome::AlreadyVoted)
        } else {
            Ok(VoteOutcome::Registered)
        }
    }
}
