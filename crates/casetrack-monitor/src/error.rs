use thiserror::Error;

/// Failure of a single request to the job source.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// Connection failure or 5xx; may succeed if repeated.
    #[error("transport error: {0}")]
    Transport(String),
    /// The service refused the request (4xx).
    #[error("request rejected: {0}")]
    Rejected(String),
    /// The response could not be understood.
    #[error("protocol error: {0}")]
    Protocol(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MonitorError {
    #[error("analysis {status} on the server{}", suffix(.detail))]
    RemoteFailed {
        status: String,
        detail: Option<String>,
    },
    #[error("analysis rejected: {0}")]
    Rejected(String),
    #[error("analysis timed out after {attempts} attempts")]
    Timeout { attempts: u32 },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl MonitorError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<SourceError> for MonitorError {
    fn from(e: SourceError) -> Self {
        match e {
            SourceError::Transport(m) => Self::Transport(m),
            SourceError::Rejected(m) => Self::Rejected(m),
            SourceError::Protocol(m) => Self::Protocol(m),
        }
    }
}

fn suffix(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default()
}
