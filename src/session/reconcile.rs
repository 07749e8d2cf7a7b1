use crate::api::{JobStatus, ProcessingStep, StatusSnapshot, StepStatus};
use chrono::NaiveDateTime;
use serde::Serialize;
use thiserror::Error;

/// Merged, monotonic view of one job's progress.
///
/// Replaced wholesale on every applied snapshot; callers never observe
/// progress or lifecycle state moving backward through it.
#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
    pub job_id: String,
    pub status: JobStatus,
    pub progress: Option<f32>,
    pub current_step: Option<String>,
    pub steps: Vec<StepView>,
    pub error: Option<String>,
    pub updated_at: Option<NaiveDateTime>,
}

/// Last-known state of one named processing step.
#[derive(Debug, Clone, Serialize)]
pub struct StepView {
    pub name: String,
    pub progress: f32,
    pub status: StepStatus,
    pub details: Option<String>,
}

impl From<&ProcessingStep> for StepView {
    fn from(step: &ProcessingStep) -> Self {
        Self {
            name: step.name.clone(),
            progress: step.progress,
            status: step.status,
            details: step.details.clone(),
        }
    }
}

/// Data-consistency faults detected while reconciling.
///
/// A regression is recovered by holding the last good state; the
/// regressive snapshot never reaches callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error("snapshot for job {got} fed to reconciler for job {expected}")]
    JobMismatch { expected: String, got: String },

    #[error("regressive snapshot held back: {0}")]
    Regression(String),
}

/// Outcome of feeding one snapshot to the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// Snapshot merged into the view. Carries the new coarse state when
    /// it changed.
    Applied { transition: Option<JobStatus> },
    /// Reconciler is already terminal; the snapshot was dropped.
    IgnoredTerminal,
}

/// State machine over status snapshots for a single job.
pub struct JobReconciler {
    view: StatusView,
    terminal: bool,
}

impl JobReconciler {
    pub fn new(job_id: &str) -> Self {
        Self {
            view: StatusView {
                job_id: job_id.to_string(),
                status: JobStatus::Queued,
                progress: None,
                current_step: None,
                steps: Vec::new(),
                error: None,
                updated_at: None,
            },
            terminal: false,
        }
    }

    /// Current merged view.
    pub fn view(&self) -> &StatusView {
        &self.view
    }

    pub fn state(&self) -> JobStatus {
        self.view.status
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Applies one snapshot.
    ///
    /// Terminal reconcilers ignore everything. Regressive snapshots leave
    /// the view untouched and are reported as [`ReconcileError::Regression`].
    pub fn observe(&mut self, snapshot: StatusSnapshot) -> Result<Observation, ReconcileError> {
        if snapshot.job_id != self.view.job_id {
            return Err(ReconcileError::JobMismatch {
                expected: self.view.job_id.clone(),
                got: snapshot.job_id,
            });
        }

        if self.terminal {
            tracing::debug!(
                "Job {}: snapshot after terminal state dropped",
                self.view.job_id
            );
            return Ok(Observation::IgnoredTerminal);
        }

        self.check_regression(&snapshot)?;

        let transition = (snapshot.status != self.view.status).then_some(snapshot.status);

        let mut next = StatusView {
            job_id: self.view.job_id.clone(),
            status: snapshot.status,
            progress: merge_progress(self.view.progress, snapshot.progress),
            current_step: snapshot.current_step,
            steps: merge_steps(&self.view.steps, snapshot.steps.as_deref()),
            error: snapshot.error.or_else(|| self.view.error.clone()),
            updated_at: Some(snapshot.updated_at),
        };

        if snapshot.status.is_terminal() {
            self.terminal = true;
            next.current_step = None;
            tracing::info!(
                "Job {} reached terminal state {:?}",
                self.view.job_id,
                snapshot.status
            );
        } else if let Some(to) = transition {
            tracing::info!("Job {} moved to {:?}", self.view.job_id, to);
        }

        self.view = next;

        Ok(Observation::Applied { transition })
    }

    fn check_regression(&self, snapshot: &StatusSnapshot) -> Result<(), ReconcileError> {
        // A terminal snapshot always wins; the monotonic merge keeps its
        // numbers from moving backward.
        if snapshot.status.is_terminal() {
            return Ok(());
        }

        if snapshot.status.rank() < self.view.status.rank() {
            return Err(ReconcileError::Regression(format!(
                "status {:?} reported after {:?}",
                snapshot.status, self.view.status
            )));
        }

        if let (Some(new), Some(current)) = (snapshot.progress, self.view.progress) {
            if new < current {
                return Err(ReconcileError::Regression(format!(
                    "overall progress {new:.1} after {current:.1}"
                )));
            }
        }

        if let Some(steps) = &snapshot.steps {
            for step in steps {
                let Some(known) = self.view.steps.iter().find(|s| s.name == step.name) else {
                    continue;
                };
                if step.status.rank() < known.status.rank() {
                    return Err(ReconcileError::Regression(format!(
                        "step '{}' moved {:?} -> {:?}",
                        step.name, known.status, step.status
                    )));
                }
                if step.progress < known.progress {
                    return Err(ReconcileError::Regression(format!(
                        "step '{}' progress {:.1} after {:.1}",
                        step.name, step.progress, known.progress
                    )));
                }
            }
        }

        Ok(())
    }
}

fn merge_progress(current: Option<f32>, incoming: Option<f32>) -> Option<f32> {
    match (current, incoming) {
        (Some(current), Some(incoming)) => Some(current.max(incoming)),
        (current, incoming) => incoming.or(current),
    }
}

/// Steps are additive and keyed by name: known steps update in place,
/// unseen names append in snapshot order, steps absent from the snapshot
/// stay at their last-known state.
fn merge_steps(current: &[StepView], incoming: Option<&[ProcessingStep]>) -> Vec<StepView> {
    let mut merged: Vec<StepView> = current.to_vec();

    let Some(incoming) = incoming else {
        return merged;
    };

    for step in incoming {
        match merged.iter_mut().find(|s| s.name == step.name) {
            Some(known) => {
                if step.status.rank() >= known.status.rank() {
                    known.status = step.status;
                }
                if step.progress > known.progress {
                    known.progress = step.progress;
                }
                if step.details.is_some() {
                    known.details = step.details.clone();
                }
            }
            None => merged.push(StepView::from(step)),
        }
    }

    merged
}
