//! Spawned driver around [`PollMachine`].

use std::sync::Arc;

use casetrack_core::{AnalysisJob, JobProgress, JobResults, JobState};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::MonitorError;
use crate::clock::{Clock, TokioClock};
use crate::config::MonitorConfig;
use crate::machine::{Action, PollMachine};
use crate::source::JobSource;

type ProgressFn = Box<dyn FnMut(&JobProgress) + Send>;
type CompleteFn = Box<dyn FnOnce(JobResults) + Send>;
type ErrorFn = Box<dyn FnOnce(MonitorError) + Send>;

/// Callbacks for one monitored job.
///
/// `on_progress` may fire many times. Of `on_complete` and `on_error`, at most
/// one fires, and nothing fires after it or after cancellation.
pub struct JobCallbacks {
    on_progress: ProgressFn,
    on_complete: CompleteFn,
    on_error: ErrorFn,
}

impl Default for JobCallbacks {
    fn default() -> Self {
        Self {
            on_progress: Box::new(|_| {}),
            on_complete: Box::new(|_| {}),
            on_error: Box::new(|_| {}),
        }
    }
}

impl JobCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_progress(mut self, f: impl FnMut(&JobProgress) + Send + 'static) -> Self {
        self.on_progress = Box::new(f);
        self
    }

    pub fn on_complete(mut self, f: impl FnOnce(JobResults) + Send + 'static) -> Self {
        self.on_complete = Box::new(f);
        self
    }

    pub fn on_error(mut self, f: impl FnOnce(MonitorError) + Send + 'static) -> Self {
        self.on_error = Box::new(f);
        self
    }
}

/// Starts monitors for analysis jobs against one [`JobSource`].
#[derive(Clone)]
pub struct JobMonitor {
    source: Arc<dyn JobSource>,
    clock: Arc<dyn Clock>,
    config: MonitorConfig,
}

impl JobMonitor {
    pub fn new(source: Arc<dyn JobSource>, config: MonitorConfig) -> Self {
        Self {
            source,
            clock: Arc::new(TokioClock),
            config,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Begin polling `job_id` on a single spawned task.
    ///
    /// Must be called from within a Tokio runtime. Dropping the returned
    /// handle detaches the monitor; it keeps running and its callbacks still fire.
    pub fn start(
        &self,
        case_id: impl Into<String>,
        job_id: impl Into<String>,
        callbacks: JobCallbacks,
    ) -> MonitorHandle {
        let case_id = case_id.into();
        let job_id = job_id.into();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (job_tx, job_rx) = watch::channel(AnalysisJob::submitted(&case_id, &job_id));

        info!(case = %case_id, job = %job_id, "monitoring analysis job");
        let run = PollRun {
            source: self.source.clone(),
            clock: self.clock.clone(),
            machine: PollMachine::new(self.config.clone()),
            case_id,
            job_id,
            job: job_tx,
            cancel: cancel_rx,
        };
        let task = tokio::spawn(run.drive(callbacks));

        MonitorHandle {
            cancel: cancel_tx,
            job: job_rx,
            task,
        }
    }
}

/// Handle to a running monitor.
pub struct MonitorHandle {
    cancel: watch::Sender<bool>,
    job: watch::Receiver<AnalysisJob>,
    task: JoinHandle<JobState>,
}

impl MonitorHandle {
    /// Stop monitoring. No callback fires after this returns, including for
    /// requests already in flight. A no-op once the job has ended.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    /// Latest snapshot of the job.
    pub fn job(&self) -> AnalysisJob {
        self.job.borrow().clone()
    }

    /// Receiver that observes every snapshot update.
    pub fn subscribe(&self) -> watch::Receiver<AnalysisJob> {
        self.job.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the monitor to reach a terminal state.
    pub async fn wait(self) -> JobState {
        match self.task.await {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "monitor task ended abnormally");
                JobState::Failed
            }
        }
    }
}

struct PollRun {
    source: Arc<dyn JobSource>,
    clock: Arc<dyn Clock>,
    machine: PollMachine,
    case_id: String,
    job_id: String,
    job: watch::Sender<AnalysisJob>,
    cancel: watch::Receiver<bool>,
}

impl PollRun {
    async fn drive(mut self, callbacks: JobCallbacks) -> JobState {
        let JobCallbacks {
            mut on_progress,
            on_complete,
            on_error,
        } = callbacks;

        let mut action = self.machine.begin();
        loop {
            // Cancellation is checked first in every select and again once a
            // response is in hand, so a response that races a cancel is dropped unseen.
            action = match action {
                Action::Wait(delay) => {
                    tokio::select! {
                        biased;
                        _ = cancelled(&mut self.cancel) => return self.cancelled(),
                        _ = self.clock.sleep(delay) => self.machine.on_wake(),
                    }
                }
                Action::FetchStatus => {
                    let result = tokio::select! {
                        biased;
                        _ = cancelled(&mut self.cancel) => return self.cancelled(),
                        r = self.source.status(&self.case_id, &self.job_id) => r,
                    };
                    if *self.cancel.borrow() {
                        return self.cancelled();
                    }
                    let (progress, next) = self.machine.on_status(result);
                    if let Some(progress) = progress {
                        self.publish();
                        on_progress(&progress);
                    }
                    next
                }
                Action::FetchResults => {
                    let result = tokio::select! {
                        biased;
                        _ = cancelled(&mut self.cancel) => return self.cancelled(),
                        r = self.source.results(&self.case_id, &self.job_id) => r,
                    };
                    if *self.cancel.borrow() {
                        return self.cancelled();
                    }
                    self.machine.on_results(result)
                }
                Action::Complete(results) => {
                    if *self.cancel.borrow() {
                        return self.cancelled();
                    }
                    info!(
                        case = %self.case_id,
                        job = %self.job_id,
                        markers = results.markers_created,
                        attempts = self.machine.attempts(),
                        "analysis completed"
                    );
                    self.job.send_modify(|job| {
                        job.state = JobState::Completed;
                        job.progress = 100;
                        job.result = Some(results.clone());
                    });
                    on_complete(results);
                    return JobState::Completed;
                }
                Action::Fail(error) => {
                    if *self.cancel.borrow() {
                        return self.cancelled();
                    }
                    let state = self.machine.state();
                    warn!(
                        case = %self.case_id,
                        job = %self.job_id,
                        state = state.as_str(),
                        %error,
                        "analysis monitoring ended"
                    );
                    self.job.send_modify(|job| {
                        job.state = state;
                        job.error = Some(error.to_string());
                    });
                    on_error(error);
                    return state;
                }
            };
        }
    }

    fn publish(&self) {
        let state = self.machine.state();
        let progress = self.machine.progress();
        self.job.send_modify(|job| {
            job.state = state;
            job.progress = progress;
        });
    }

    fn cancelled(&mut self) -> JobState {
        self.machine.cancel();
        info!(case = %self.case_id, job = %self.job_id, "monitoring cancelled");
        self.job.send_modify(|job| job.state = JobState::Cancelled);
        JobState::Cancelled
    }
}

/// Resolves once cancellation is requested. Never resolves if the handle is gone.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|c| *c).await.is_err() {
        std::future::pending::<()>().await;
    }
}
