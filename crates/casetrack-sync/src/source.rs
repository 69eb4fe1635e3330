use async_trait::async_trait;
use casetrack_core::{ResultsReport, StatusReport};
use casetrack_monitor::{JobSource, SourceError};

use crate::http::{CaseClient, SyncError};

impl From<SyncError> for SourceError {
    /// 4xx and refusals are rejections; bodies we cannot read are protocol
    /// errors; everything else may clear up on its own.
    fn from(e: SyncError) -> Self {
        let detail = e.to_string();
        match e {
            SyncError::Server { status, .. } if (400..500).contains(&status) => {
                SourceError::Rejected(detail)
            }
            SyncError::Server { .. } | SyncError::Io(_) => SourceError::Transport(detail),
            SyncError::Rejected(_) => SourceError::Rejected(detail),
            SyncError::Json(_) => SourceError::Protocol(detail),
            SyncError::Http(err) => {
                if err.is_decode() {
                    SourceError::Protocol(detail)
                } else if err.status().is_some_and(|s| s.is_client_error()) {
                    SourceError::Rejected(detail)
                } else {
                    SourceError::Transport(detail)
                }
            }
        }
    }
}

#[async_trait]
impl JobSource for CaseClient {
    async fn status(&self, case_id: &str, job_id: &str) -> Result<StatusReport, SourceError> {
        Ok(self.analysis_status(case_id, job_id).await?)
    }

    async fn results(&self, case_id: &str, job_id: &str) -> Result<ResultsReport, SourceError> {
        Ok(self.analysis_results(case_id, job_id).await?)
    }
}
