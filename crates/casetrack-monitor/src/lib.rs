//! Job monitoring: poll a remote analysis job until it completes, fails,
//! times out, or is cancelled.

mod error;
pub use error::{MonitorError, SourceError};

pub mod clock;
pub mod config;
pub mod machine;
pub mod monitor;
pub mod source;

pub use clock::{Clock, TokioClock};
pub use config::{MonitorConfig, TransientPolicy};
pub use machine::{Action, PollMachine};
pub use monitor::{JobCallbacks, JobMonitor, MonitorHandle};
pub use source::JobSource;
