// src/api/mod.rs
// HTTP boundary to the processing backend

mod client;
mod types;

pub use client::ApiClient;
pub use types::{
    DocumentFormat, HydrationError, Job, JobStatus, MeetingSummary, PollError, ProcessingStep,
    ResultsPayload, SlideAppearance, StatusSnapshot, StepStatus, SubmissionError,
    TranscriptSegment, UniqueSlide, UploadResponse,
};

use async_trait::async_trait;

/// Source of status snapshots for a job.
///
/// Implemented by [`ApiClient`]; the watch loop only depends on this seam,
/// so tests can drive it with scripted sources.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self, job_id: &str) -> Result<StatusSnapshot, PollError>;
}

/// Source of the terminal result payload for a job.
#[async_trait]
pub trait ResultSource: Send + Sync {
    async fn fetch_results(&self, job_id: &str) -> Result<ResultsPayload, HydrationError>;
}

/// Full backend surface a job session needs.
pub trait Backend: StatusSource + ResultSource {}

impl<T: StatusSource + ResultSource> Backend for T {}
