use std::sync::Arc;

use async_trait::async_trait;
use casetrack_core::{ResultsReport, StatusReport};

use crate::SourceError;

/// Where the monitor reads job status and results from.
#[async_trait]
pub trait JobSource: Send + Sync {
    async fn status(&self, case_id: &str, job_id: &str) -> Result<StatusReport, SourceError>;

    async fn results(&self, case_id: &str, job_id: &str) -> Result<ResultsReport, SourceError>;
}

#[async_trait]
impl<T: JobSource + ?Sized> JobSource for Arc<T> {
    async fn status(&self, case_id: &str, job_id: &str) -> Result<StatusReport, SourceError> {
        (**self).status(case_id, job_id).await
    }

    async fn results(&self, case_id: &str, job_id: &str) -> Result<ResultsReport, SourceError> {
        (**self).results(case_id, job_id).await
    }
}
