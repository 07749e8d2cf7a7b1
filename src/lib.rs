pub mod api;
pub mod config;
pub mod error;
pub mod options;
pub mod session;

pub use api::{
    ApiClient, Backend, DocumentFormat, HydrationError, Job, JobStatus, MeetingSummary, PollError,
    ProcessingStep, ResultSource, ResultsPayload, SlideAppearance, StatusSnapshot, StatusSource,
    StepStatus, SubmissionError, TranscriptSegment, UniqueSlide,
};
pub use config::ClientConfig;
pub use error::{EngineError, ErrorClass, ErrorReport};
pub use options::{ConfigError, DeduplicationMethod, ProcessingOptions};
pub use session::{
    JobReconciler, JobSession, JobWatcher, Observation, ReconcileError, ResultSet, StatusView,
    StepView, WatchEvent, WatchHandle,
};
