use crate::api::{JobStatus, PollError, StatusSource};
use crate::session::reconcile::{JobReconciler, Observation, ReconcileError, StatusView};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Events emitted by a running watch.
#[derive(Debug)]
pub enum WatchEvent {
    /// A snapshot was merged; the carried view is current.
    Updated(StatusView),
    /// Coarse lifecycle state changed.
    Transition { from: JobStatus, to: JobStatus },
    /// One poll failed. The watch continues on its normal cadence.
    PollFailed { error: PollError, consecutive: u32 },
    /// A regressive snapshot was held back; the view is unchanged.
    Inconsistent(ReconcileError),
    /// Terminal state reached. No further polls are issued.
    Terminal(JobStatus),
}

/// Control handle for a spawned watch task.
pub struct WatchHandle {
    cancelled: Arc<AtomicBool>,
    wake: Arc<Notify>,
    task: JoinHandle<()>,
}

impl WatchHandle {
    /// Stops the watch now. A poll already in flight is discarded when it
    /// lands; it never mutates the view.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
        self.wake.notify_one();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Waits for the watch task to finish.
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

pub struct JobWatcher;

impl JobWatcher {
    /// Spawns the polling loop for one job.
    ///
    /// One request is in flight at a time; when a poll overruns the
    /// interval, elapsed ticks are skipped rather than queued. The loop
    /// ends on the first terminal snapshot or on [`WatchHandle::cancel`].
    ///
    /// Returns the control handle, the event stream, and a receiver
    /// tracking the live merged view.
    pub fn spawn<S>(
        source: Arc<S>,
        job_id: &str,
        interval: Duration,
    ) -> (
        WatchHandle,
        mpsc::UnboundedReceiver<WatchEvent>,
        watch::Receiver<StatusView>,
    )
    where
        S: StatusSource + ?Sized + 'static,
    {
        let reconciler = JobReconciler::new(job_id);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(reconciler.view().clone());
        let cancelled = Arc::new(AtomicBool::new(false));
        let wake = Arc::new(Notify::new());

        let task = tokio::spawn(run_watch(
            source,
            reconciler,
            interval,
            event_tx,
            view_tx,
            cancelled.clone(),
            wake.clone(),
        ));

        (
            WatchHandle {
                cancelled,
                wake,
                task,
            },
            event_rx,
            view_rx,
        )
    }
}

async fn run_watch<S>(
    source: Arc<S>,
    mut reconciler: JobReconciler,
    interval: Duration,
    events: mpsc::UnboundedSender<WatchEvent>,
    view_tx: watch::Sender<StatusView>,
    cancelled: Arc<AtomicBool>,
    wake: Arc<Notify>,
) where
    S: StatusSource + ?Sized,
{
    let job_id = reconciler.view().job_id.clone();
    tracing::info!("Watching job {} every {:?}", job_id, interval);

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut consecutive_failures = 0u32;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = wake.notified() => {}
        }
        if cancelled.load(Ordering::Relaxed) {
            tracing::info!("Watch for job {} cancelled", job_id);
            break;
        }

        let polled = source.fetch_status(&job_id).await;

        // A response landing after cancellation is dropped unseen.
        if cancelled.load(Ordering::Relaxed) {
            tracing::info!("Watch for job {} cancelled; in-flight poll discarded", job_id);
            break;
        }

        match polled {
            Ok(snapshot) => {
                consecutive_failures = 0;
                let before = reconciler.state();

                match reconciler.observe(snapshot) {
                    Ok(Observation::Applied { transition }) => {
                        let view = reconciler.view().clone();
                        let _ = view_tx.send(view.clone());

                        if let Some(to) = transition {
                            let _ = events.send(WatchEvent::Transition { from: before, to });
                        }
                        let _ = events.send(WatchEvent::Updated(view));

                        if reconciler.is_terminal() {
                            let _ = events.send(WatchEvent::Terminal(reconciler.state()));
                            break;
                        }
                    }
                    Ok(Observation::IgnoredTerminal) => break,
                    Err(e) => {
                        tracing::warn!("Job {}: {}", job_id, e);
                        let _ = events.send(WatchEvent::Inconsistent(e));
                    }
                }
            }
            Err(e) => {
                consecutive_failures += 1;
                tracing::warn!(
                    "Job {}: poll failed ({} consecutive): {}",
                    job_id,
                    consecutive_failures,
                    e
                );
                let _ = events.send(WatchEvent::PollFailed {
                    error: e,
                    consecutive: consecutive_failures,
                });
            }
        }
    }

    tracing::info!("Watch for job {} stopped", job_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{StatusSnapshot, StepStatus};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicU32;
    use std::sync::Mutex;

    fn snapshot(status: JobStatus, progress: Option<f32>) -> StatusSnapshot {
        StatusSnapshot {
            job_id: "job-1".to_string(),
            status,
            progress,
            current_step: None,
            steps: None,
            error: None,
            created_at: Utc::now().naive_utc(),
            updated_at: Utc::now().naive_utc(),
        }
    }

    /// Replays a fixed script of poll outcomes, repeating the last entry.
    struct ScriptedSource {
        script: Mutex<VecDeque<Result<StatusSnapshot, PollError>>>,
        last: Mutex<Option<StatusSnapshot>>,
        calls: AtomicU32,
        in_flight: AtomicU32,
        max_in_flight: AtomicU32,
        delay: Duration,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<StatusSnapshot, PollError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                last: Mutex::new(None),
                calls: AtomicU32::new(0),
                in_flight: AtomicU32::new(0),
                max_in_flight: AtomicU32::new(0),
                delay: Duration::ZERO,
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl StatusSource for ScriptedSource {
        async fn fetch_status(&self, _job_id: &str) -> Result<StatusSnapshot, PollError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            let next = self.script.lock().unwrap().pop_front();
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match next {
                Some(Ok(snapshot)) => {
                    *self.last.lock().unwrap() = Some(snapshot.clone());
                    Ok(snapshot)
                }
                Some(Err(e)) => Err(e),
                None => {
                    let last = self.last.lock().unwrap().clone();
                    last.ok_or_else(|| PollError::Transport("script exhausted".to_string()))
                }
            }
        }
    }

    async fn drain(mut events: mpsc::UnboundedReceiver<WatchEvent>) -> Vec<WatchEvent> {
        let mut seen = Vec::new();
        while let Some(event) = events.recv().await {
            seen.push(event);
        }
        seen
    }

    #[tokio::test(start_paused = true)]
    async fn watch_stops_at_terminal_state() {
        let source = Arc::new(ScriptedSource::new(vec![
            Ok(snapshot(JobStatus::Queued, None)),
            Ok(snapshot(JobStatus::Processing, Some(40.0))),
            Ok(snapshot(JobStatus::Complete, Some(100.0))),
        ]));

        let (handle, events, view) =
            JobWatcher::spawn(source.clone(), "job-1", Duration::from_secs(3));
        handle.join().await;

        // Exactly three polls: the loop stops with the terminal snapshot.
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        assert_eq!(view.borrow().status, JobStatus::Complete);

        let seen = drain(events).await;
        assert!(seen
            .iter()
            .any(|e| matches!(e, WatchEvent::Terminal(JobStatus::Complete))));
        assert!(seen.iter().any(|e| matches!(
            e,
            WatchEvent::Transition {
                from: JobStatus::Processing,
                to: JobStatus::Complete
            }
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn poll_failures_do_not_end_the_watch() {
        let source = Arc::new(ScriptedSource::new(vec![
            Err(PollError::Transport("connection refused".to_string())),
            Err(PollError::Timeout),
            Ok(snapshot(JobStatus::Processing, Some(10.0))),
            Ok(snapshot(JobStatus::Complete, Some(100.0))),
        ]));

        let (handle, events, view) =
            JobWatcher::spawn(source.clone(), "job-1", Duration::from_secs(3));
        handle.join().await;

        assert_eq!(view.borrow().status, JobStatus::Complete);

        let seen = drain(events).await;
        let failures: Vec<u32> = seen
            .iter()
            .filter_map(|e| match e {
                WatchEvent::PollFailed { consecutive, .. } => Some(*consecutive),
                _ => None,
            })
            .collect();
        assert_eq!(failures, vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn regressive_snapshot_is_held_and_watch_continues() {
        let mut regressed = snapshot(JobStatus::Processing, Some(30.0));
        regressed.steps = Some(vec![crate::api::ProcessingStep {
            name: "Transcription".to_string(),
            progress: 0.0,
            status: StepStatus::Pending,
            details: None,
        }]);

        let source = Arc::new(ScriptedSource::new(vec![
            Ok(snapshot(JobStatus::Processing, Some(40.0))),
            Ok(regressed),
            Ok(snapshot(JobStatus::Complete, Some(100.0))),
        ]));

        let (handle, events, view) =
            JobWatcher::spawn(source.clone(), "job-1", Duration::from_secs(3));
        handle.join().await;

        assert_eq!(view.borrow().status, JobStatus::Complete);
        assert_eq!(view.borrow().progress, Some(100.0));

        let seen = drain(events).await;
        assert!(seen
            .iter()
            .any(|e| matches!(e, WatchEvent::Inconsistent(ReconcileError::Regression(_)))));
    }

    #[tokio::test(start_paused = true)]
    async fn polls_never_overlap() {
        let mut script: Vec<Result<StatusSnapshot, PollError>> = (0..5)
            .map(|i| Ok(snapshot(JobStatus::Processing, Some(i as f32 * 10.0))))
            .collect();
        script.push(Ok(snapshot(JobStatus::Complete, Some(100.0))));

        // Each poll takes well over the interval.
        let source = Arc::new(ScriptedSource::new(script).with_delay(Duration::from_secs(10)));

        let (handle, _events, _view) =
            JobWatcher::spawn(source.clone(), "job-1", Duration::from_secs(3));
        handle.join().await;

        assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_discards_in_flight_response() {
        // The poll would report Complete, but it lands after cancel.
        let source = Arc::new(
            ScriptedSource::new(vec![Ok(snapshot(JobStatus::Complete, Some(100.0)))])
                .with_delay(Duration::from_secs(60)),
        );

        let (handle, _events, view) =
            JobWatcher::spawn(source.clone(), "job-1", Duration::from_secs(3));

        // Let the first poll start, then cancel while it is in flight.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        handle.cancel();
        handle.join().await;

        assert_eq!(view.borrow().status, JobStatus::Queued);
        assert!(!view.borrow().status.is_terminal());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_wakes_a_sleeping_watch() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(snapshot(
            JobStatus::Processing,
            Some(10.0),
        ))]));

        let (handle, _events, _view) =
            JobWatcher::spawn(source.clone(), "job-1", Duration::from_secs(3600));

        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.cancel();
        handle.join().await;

        // Only the immediate first poll ran.
        assert!(source.calls.load(Ordering::SeqCst) <= 1);
    }
}
