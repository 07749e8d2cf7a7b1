use crate::api::{ApiClient, Backend, HydrationError, Job, JobStatus};
use crate::config::ClientConfig;
use crate::error::EngineError;
use crate::options::ProcessingOptions;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub mod hydrate;
pub mod reconcile;
pub mod watch;

pub use hydrate::ResultSet;
pub use reconcile::{JobReconciler, Observation, ReconcileError, StatusView, StepView};
pub use watch::{JobWatcher, WatchEvent, WatchHandle};

/// One job's observation lifecycle, from submission to hydrated results.
///
/// Caller-owned; each watched job gets its own session and nothing is
/// shared between jobs.
pub struct JobSession {
    backend: Arc<dyn Backend>,
    job: Job,
    options: ProcessingOptions,
    handle: WatchHandle,
    events: mpsc::UnboundedReceiver<WatchEvent>,
    view: tokio::sync::watch::Receiver<StatusView>,
}

impl JobSession {
    /// Normalizes the options, uploads the video, and starts watching the
    /// returned job.
    pub async fn submit(
        client: Arc<ApiClient>,
        video: &Path,
        options: ProcessingOptions,
        config: &ClientConfig,
    ) -> Result<Self, EngineError> {
        let options = options.normalize()?;
        let job = client.submit_file(video, &options).await?;
        Ok(Self::attach(client, job, options, config.poll_interval))
    }

    /// Attaches a session to an already submitted job and starts the watch.
    ///
    /// Options are expected to be the normalized set the job was submitted
    /// with; they drive result filtering at hydration time.
    pub fn attach(
        backend: Arc<dyn Backend>,
        job: Job,
        options: ProcessingOptions,
        poll_interval: Duration,
    ) -> Self {
        let (handle, events, view) = JobWatcher::spawn(backend.clone(), &job.id, poll_interval);

        Self {
            backend,
            job,
            options,
            handle,
            events,
            view,
        }
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn options(&self) -> &ProcessingOptions {
        &self.options
    }

    /// Current merged status view.
    pub fn status(&self) -> StatusView {
        self.view.borrow().clone()
    }

    pub fn state(&self) -> JobStatus {
        self.view.borrow().status
    }

    /// Next watch event, or `None` once the watch has stopped and the
    /// queue is drained.
    pub async fn recv(&mut self) -> Option<WatchEvent> {
        self.events.recv().await
    }

    /// Waits until the job reaches a terminal state, returning it.
    ///
    /// If the watch was cancelled first, returns the last observed state,
    /// which will not be terminal.
    pub async fn wait_terminal(&mut self) -> JobStatus {
        loop {
            let status = self.view.borrow().status;
            if status.is_terminal() {
                return status;
            }
            if self.view.changed().await.is_err() {
                return self.view.borrow().status;
            }
        }
    }

    /// Stops polling now. An in-flight poll response is discarded.
    pub fn cancel(&self) {
        self.handle.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.handle.is_cancelled()
    }

    /// Fetches and assembles the result set. Callable once the job has
    /// completed; the payload is fetched a single time, not per poll.
    pub async fn hydrate(&self) -> Result<ResultSet, HydrationError> {
        let state = self.view.borrow().status;
        if state != JobStatus::Complete {
            return Err(HydrationError::NotComplete(self.job.id.clone()));
        }

        hydrate::hydrate(self.backend.as_ref(), &self.job.id, &self.options).await
    }
}
