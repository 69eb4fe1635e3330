use std::time::Duration;

pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 100;

/// What a transport failure during one poll does to the job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransientPolicy {
    /// End the job with a transport error.
    #[default]
    Fatal,
    /// Log it and poll again; the failed attempt still counts against the budget.
    Retry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Wait before the first status check.
    pub initial_delay: Duration,
    /// Wait between subsequent checks.
    pub poll_interval: Duration,
    /// Status checks allowed before the job times out.
    pub max_attempts: u32,
    pub transient: TransientPolicy,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            initial_delay: DEFAULT_INITIAL_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            transient: TransientPolicy::Fatal,
        }
    }
}
