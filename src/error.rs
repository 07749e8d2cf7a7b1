use crate::api::{HydrationError, PollError, SubmissionError};
use crate::options::ConfigError;
use crate::session::ReconcileError;
use thiserror::Error;

/// Every failure the engine can report, in one taxonomy.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error(transparent)]
    Poll(#[from] PollError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Hydration(#[from] HydrationError),
}

/// Transport failures are candidates for retry; domain failures go to the
/// user as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Transport,
    Domain,
}

impl EngineError {
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Config(_) => "config",
            EngineError::Submission(_) => "submission",
            EngineError::Poll(_) => "poll",
            EngineError::Reconcile(_) => "reconcile",
            EngineError::Hydration(_) => "hydration",
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            EngineError::Config(_) | EngineError::Reconcile(_) => ErrorClass::Domain,
            // Poll failures are transport by definition; the watch absorbs
            // and retries them on its own cadence.
            EngineError::Poll(_) => ErrorClass::Transport,
            EngineError::Submission(e) => {
                if e.is_transport() {
                    ErrorClass::Transport
                } else {
                    ErrorClass::Domain
                }
            }
            EngineError::Hydration(e) => {
                if e.is_transport() {
                    ErrorClass::Transport
                } else {
                    ErrorClass::Domain
                }
            }
        }
    }

    /// Caller-facing projection with job context attached.
    pub fn report(&self, job_id: Option<&str>) -> ErrorReport {
        ErrorReport {
            job_id: job_id.map(|id| id.to_string()),
            kind: self.kind(),
            class: self.class(),
            message: self.to_string(),
        }
    }
}

/// Flattened error for display layers.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub job_id: Option<String>,
    pub kind: &'static str,
    pub class: ErrorClass,
    pub message: String,
}
