use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::State;
use crate::error::{ErrorKind, PipelineError};

/// What the user asked for: a type tag and the entry file they picked.
///
/// Kept as raw text so an unsupported tag still produces a job that fails
/// visibly in `Validating`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    pub document_type: String,
    pub entry: String,
}

impl JobRequest {
    pub fn new(document_type: impl Into<String>, entry: impl Into<String>) -> Self {
        Self {
            document_type: document_type.into(),
            entry: entry.into(),
        }
    }
}

/// A classified failure with its diagnostic text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&PipelineError> for Failure {
    fn from(err: &PipelineError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// The result of executing a job stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobOutcome {
    Success,
    Failure(Failure),
}

/// Tracks the lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

/// One document generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub request: JobRequest,
    pub status: JobStatus,
    pub state: State,
    pub state_history: Vec<State>,
    /// State the job was in when it failed.
    pub failed_in: Option<State>,
    pub failure: Option<Failure>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(request: JobRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            request,
            status: JobStatus::Pending,
            state: State::Idle,
            state_history: Vec::new(),
            failed_in: None,
            failure: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Outcome recorded so far; `Success` unless a failure was recorded.
    pub fn outcome(&self) -> JobOutcome {
        match &self.failure {
            Some(failure) => JobOutcome::Failure(failure.clone()),
            None => JobOutcome::Success,
        }
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Structured audit record produced when a job ends, successful or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub job_id: String,
    pub session_id: String,
    pub request: JobRequest,
    pub status: JobStatus,
    pub state_transitions: Vec<State>,
    pub failure: Option<Failure>,
    pub failed_in: Option<State>,
    pub delivered_to: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl AuditRecord {
    pub fn from_job(job: &Job, session_id: &str, delivered_to: Option<String>) -> Self {
        let now = Utc::now();
        let duration = now - job.created_at;
        let mut transitions = job.state_history.clone();
        transitions.push(job.state);

        Self {
            job_id: job.id.clone(),
            session_id: session_id.to_string(),
            request: job.request.clone(),
            status: job.status,
            state_transitions: transitions,
            failure: job.failure.clone(),
            failed_in: job.failed_in,
            delivered_to,
            started_at: job.created_at,
            completed_at: now,
            duration_ms: duration.num_milliseconds(),
        }
    }
}
