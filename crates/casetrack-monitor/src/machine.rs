//! Pure polling state machine.
//!
//! The machine never performs I/O or waits. It is fed the outcome of each step
//! and answers with the next [`Action`] for the driver to carry out:
//!
//! ```text
//! begin ─► Wait(initial) ─► on_wake ─► FetchStatus ─► on_status ─┬─► Wait(interval) ─► on_wake …
//!                                                                ├─► FetchResults ─► on_results ─┬─► Complete
//!                                                                │                               └─► Wait(interval) …
//!                                                                └─► Fail
//! ```
//!
//! Every status check spends one attempt. Once the budget is spent, the next
//! scheduled wait becomes a timeout instead.

use std::time::Duration;

use casetrack_core::{JobProgress, JobResults, JobState, ResultsReport, StatusReport};
use tracing::{debug, warn};

use crate::config::{MonitorConfig, TransientPolicy};
use crate::{MonitorError, SourceError};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Wait(Duration),
    FetchStatus,
    FetchResults,
    Complete(JobResults),
    Fail(MonitorError),
}

impl Action {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete(_) | Self::Fail(_))
    }
}

#[derive(Debug, Clone)]
pub struct PollMachine {
    config: MonitorConfig,
    state: JobState,
    attempts: u32,
    progress: u8,
}

impl PollMachine {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            state: JobState::Submitted,
            attempts: 0,
            progress: 0,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn begin(&mut self) -> Action {
        Action::Wait(self.config.initial_delay)
    }

    /// A wait elapsed; spend an attempt on a status check.
    pub fn on_wake(&mut self) -> Action {
        if self.state.is_terminal() {
            return self.stopped();
        }
        self.state = JobState::Polling;
        self.attempts += 1;
        debug!(attempt = self.attempts, max = self.config.max_attempts, "status check");
        Action::FetchStatus
    }

    /// Feed a status response. Returns the progress to report, if any, and the next action.
    pub fn on_status(
        &mut self,
        result: Result<StatusReport, SourceError>,
    ) -> (Option<JobProgress>, Action) {
        if self.state.is_terminal() {
            return (None, self.stopped());
        }
        let report = match result {
            Ok(report) => report,
            Err(e) => return (None, self.on_source_error(e)),
        };
        if !report.success {
            let message = report
                .error
                .unwrap_or_else(|| "status check was rejected".to_string());
            return (None, self.fail(MonitorError::Rejected(message)));
        }

        self.progress = report.progress;
        let progress = report.to_progress();
        let next = if report.status.is_failure() {
            self.fail(MonitorError::RemoteFailed {
                status: report.status.to_string(),
                detail: report.error,
            })
        } else if report.is_done() {
            Action::FetchResults
        } else {
            self.continue_or_timeout()
        };
        (Some(progress), next)
    }

    /// Feed a results response.
    pub fn on_results(&mut self, result: Result<ResultsReport, SourceError>) -> Action {
        if self.state.is_terminal() {
            return self.stopped();
        }
        match result {
            Ok(ResultsReport::Ready(results)) => {
                self.state = JobState::Completed;
                self.progress = 100;
                Action::Complete(results)
            }
            Ok(ResultsReport::Incomplete { progress, .. }) => {
                debug!(progress, "results not final yet");
                self.progress = progress;
                self.continue_or_timeout()
            }
            Ok(ResultsReport::Failed { error }) => self.fail(MonitorError::Rejected(error)),
            Err(e) => self.on_source_error(e),
        }
    }

    /// Move to `Cancelled`. Returns `false` if the job had already ended.
    pub fn cancel(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = JobState::Cancelled;
        true
    }

    fn continue_or_timeout(&mut self) -> Action {
        if self.attempts >= self.config.max_attempts {
            return self.fail(MonitorError::Timeout {
                attempts: self.attempts,
            });
        }
        Action::Wait(self.config.poll_interval)
    }

    fn on_source_error(&mut self, e: SourceError) -> Action {
        match (e, self.config.transient) {
            (SourceError::Transport(detail), TransientPolicy::Retry) => {
                warn!(attempt = self.attempts, %detail, "transient poll failure, retrying");
                self.continue_or_timeout()
            }
            (e, _) => self.fail(e.into()),
        }
    }

    fn fail(&mut self, error: MonitorError) -> Action {
        self.state = if error.is_timeout() {
            JobState::TimedOut
        } else {
            JobState::Failed
        };
        Action::Fail(error)
    }

    fn stopped(&self) -> Action {
        Action::Fail(MonitorError::Protocol(format!(
            "job already {}",
            self.state.as_str()
        )))
    }
}
