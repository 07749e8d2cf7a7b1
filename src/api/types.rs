// src/api/types.rs
// Wire types and error definitions for the processing backend API

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse job lifecycle status.
///
/// Closed set; an unrecognized wire string fails deserialization instead
/// of leaking through untyped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Complete,
    Error,
}

impl JobStatus {
    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Error)
    }

    /// Lifecycle ordering for regression checks among non-terminal states.
    pub(crate) fn rank(&self) -> u8 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::Processing => 1,
            JobStatus::Complete | JobStatus::Error => 2,
        }
    }
}

/// Status of one named processing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Complete,
    Error,
}

impl StepStatus {
    /// Ordering for regression checks. A failed step may still recover
    /// to complete; complete never moves back.
    pub(crate) fn rank(&self) -> u8 {
        match self {
            StepStatus::Pending => 0,
            StepStatus::InProgress => 1,
            StepStatus::Error => 2,
            StepStatus::Complete => 3,
        }
    }
}

/// Handle for one submitted job. The id is server-assigned and opaque.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Response body of the upload and resume endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub message: String,
}

/// One point-in-time status read for a job.
///
/// Snapshots carry no deltas; each one is sufficient on its own to
/// reconstruct full current progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub progress: Option<f32>,
    #[serde(default)]
    pub current_step: Option<String>,
    #[serde(default)]
    pub steps: Option<Vec<ProcessingStep>>,
    #[serde(default)]
    pub error: Option<String>,
    // The backend emits naive ISO 8601 timestamps, no offset.
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// One named sub-stage of processing with its own progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingStep {
    pub name: String,
    pub progress: f32,
    pub status: StepStatus,
    #[serde(default)]
    pub details: Option<String>,
}

/// Raw result payload as returned by the backend, before option filtering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultsPayload {
    #[serde(default)]
    pub summary: Option<MeetingSummary>,
    #[serde(default)]
    pub slides: Option<Vec<UniqueSlide>>,
    #[serde(default)]
    pub transcript: Option<Vec<TranscriptSegment>>,
}

/// Meeting summary section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingSummary {
    pub executive_summary: String,
    pub decisions: Vec<String>,
    pub action_items: Vec<String>,
    #[serde(default)]
    pub key_topics: Option<Vec<String>>,
}

/// Deduplicated slide with its on-screen appearance intervals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniqueSlide {
    pub slide_id: String,
    pub image_url: String,
    pub appearances: Vec<SlideAppearance>,
    pub ocr_text: String,
    #[serde(default)]
    pub discussion_summary: Option<String>,
}

/// Appearance interval, formatted "HH:MM:SS".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlideAppearance {
    pub start: String,
    pub end: String,
}

/// Transcript segment with times in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(default)]
    pub speaker: Option<i64>,
}

/// Downloadable document formats. Passthrough, not assembled client-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Txt,
    Pdf,
}

impl DocumentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Txt => "txt",
            DocumentFormat::Pdf => "pdf",
        }
    }
}

/// Submission failures. Transport and rejection are kept apart so callers
/// can decide about retrying; nothing is retried automatically here.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("network error: {0}")]
    Transport(String),

    #[error("upload request timed out")]
    Timeout,

    #[error("backend rejected upload (HTTP {status}): {reason}")]
    Rejected { status: u16, reason: String },

    #[error("unsupported video container: {0}")]
    UnsupportedFormat(String),

    #[error("could not read input: {0}")]
    Input(String),

    #[error("malformed upload response: {0}")]
    Malformed(String),
}

impl SubmissionError {
    pub fn is_transport(&self) -> bool {
        matches!(self, SubmissionError::Transport(_) | SubmissionError::Timeout)
    }
}

/// Poll failures. All of these are transport-class and recoverable; the
/// watch keeps running and retries on its normal cadence.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("network error: {0}")]
    Transport(String),

    #[error("status request timed out")]
    Timeout,

    #[error("status endpoint returned HTTP {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("malformed status payload: {0}")]
    Malformed(String),
}

/// Result fetch failures. Fatal for the job's result set.
#[derive(Debug, Error)]
pub enum HydrationError {
    #[error("network error: {0}")]
    Transport(String),

    #[error("results request timed out")]
    Timeout,

    #[error("results endpoint returned HTTP {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("malformed results payload: {0}")]
    Malformed(String),

    #[error("job {0} has not completed")]
    NotComplete(String),
}

impl HydrationError {
    pub fn is_transport(&self) -> bool {
        matches!(self, HydrationError::Transport(_) | HydrationError::Timeout)
    }
}
