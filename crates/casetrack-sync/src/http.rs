//! HTTP client for the case tracking backend's marker and analysis endpoints.

use casetrack_core::{MarkerRecord, ResultsEnvelope, ResultsReport, StatusReport};
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::request::{AnalysisRequest, MarkerUpdate, NewMarker};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api";

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Client for one backend instance.
pub struct CaseClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

/// Reply to an analysis submission.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnalysisSubmission {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub analysis_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

fn default_true() -> bool {
    true
}

/// The marker list comes back either bare or wrapped in a paginated envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum MarkerList {
    Bare(Vec<MarkerRecord>),
    Paged { results: Vec<MarkerRecord> },
}

impl MarkerList {
    fn into_records(self) -> Vec<MarkerRecord> {
        match self {
            Self::Bare(records) | Self::Paged { results: records } => records,
        }
    }
}

impl CaseClient {
    /// Create a client for the given API root, e.g. `http://127.0.0.1:8000/api`.
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into()).filter(|t: &String| !t.is_empty());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn list_markers(&self, case_id: &str) -> Result<Vec<MarkerRecord>, SyncError> {
        let path = format!("/cases/{case_id}/markers/");

        info!(case = case_id, "fetching markers");
        let resp = check(self.request(Method::GET, &path).send().await?).await?;
        let list: MarkerList = resp.json().await?;
        let records = list.into_records();
        info!(case = case_id, count = records.len(), "fetched markers");
        Ok(records)
    }

    pub async fn create_marker(
        &self,
        case_id: &str,
        marker: NewMarker,
    ) -> Result<MarkerRecord, SyncError> {
        let path = format!("/cases/{case_id}/markers/");

        info!(case = case_id, location = %marker.location_name, "creating marker");
        let form = marker.into_form().await?;
        let resp = check(self.request(Method::POST, &path).multipart(form).send().await?).await?;
        let record: MarkerRecord = resp.json().await?;
        info!(case = case_id, marker = %record.id, "marker created");
        Ok(record)
    }

    pub async fn update_marker(
        &self,
        case_id: &str,
        marker_id: &str,
        update: &MarkerUpdate,
    ) -> Result<MarkerRecord, SyncError> {
        let path = format!("/cases/{case_id}/markers/{marker_id}/");

        info!(case = case_id, marker = marker_id, "updating marker");
        let resp = check(self.request(Method::PUT, &path).json(update).send().await?).await?;
        Ok(resp.json().await?)
    }

    pub async fn delete_marker(&self, case_id: &str, marker_id: &str) -> Result<(), SyncError> {
        let path = format!("/cases/{case_id}/markers/{marker_id}/");

        info!(case = case_id, marker = marker_id, "deleting marker");
        check(self.request(Method::DELETE, &path).send().await?).await?;
        Ok(())
    }

    /// Upload footage and start an analysis job. Returns the job id.
    pub async fn submit_analysis(
        &self,
        case_id: &str,
        request: AnalysisRequest,
    ) -> Result<String, SyncError> {
        let path = format!("/cases/{case_id}/cctv/analyze/");

        info!(
            case = case_id,
            location = %request.location_name,
            video = %request.video.display(),
            "submitting footage for analysis"
        );
        let form = request.into_form().await?;
        let resp = check(self.request(Method::POST, &path).multipart(form).send().await?).await?;
        let submission: AnalysisSubmission = resp.json().await?;
        let job_id = accepted_job(submission)?;
        info!(case = case_id, job = %job_id, "analysis started");
        Ok(job_id)
    }

    pub async fn analysis_status(
        &self,
        case_id: &str,
        job_id: &str,
    ) -> Result<StatusReport, SyncError> {
        let path = format!("/cases/{case_id}/analysis/{job_id}/status/");

        let resp = check(self.request(Method::GET, &path).send().await?).await?;
        let report: StatusReport = resp.json().await?;
        debug!(
            job = job_id,
            status = %report.status,
            progress = report.progress,
            "analysis status"
        );
        Ok(report)
    }

    /// Fetch results. A not-yet-final job comes back as [`ResultsReport::Incomplete`],
    /// whether the backend signals that with a 2xx or an error status.
    pub async fn analysis_results(
        &self,
        case_id: &str,
        job_id: &str,
    ) -> Result<ResultsReport, SyncError> {
        let path = format!("/cases/{case_id}/analysis/{job_id}/results/");

        let resp = self.request(Method::GET, &path).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            if let Some(report) = incomplete_from_error_body(&body) {
                return Ok(report);
            }
            return Err(SyncError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: ResultsEnvelope = serde_json::from_str(&body)?;
        let report = envelope.into_report();
        debug!(job = job_id, ready = matches!(report, ResultsReport::Ready(_)), "analysis results");
        Ok(report)
    }

    /// Raw health document of the backend's AI services.
    pub async fn ai_health(&self) -> Result<serde_json::Value, SyncError> {
        let resp = check(self.request(Method::GET, "/cases/ai/health/").send().await?).await?;
        Ok(resp.json().await?)
    }
}

/// Turn a non-2xx response into [`SyncError::Server`].
async fn check(resp: Response) -> Result<Response, SyncError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(SyncError::Server {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp)
}

fn accepted_job(submission: AnalysisSubmission) -> Result<String, SyncError> {
    if !submission.success {
        return Err(SyncError::Rejected(
            submission
                .error
                .or(submission.message)
                .unwrap_or_else(|| "analysis was not started".to_string()),
        ));
    }
    submission
        .analysis_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| SyncError::Rejected("response carried no analysis_id".to_string()))
}

fn incomplete_from_error_body(body: &str) -> Option<ResultsReport> {
    let envelope: ResultsEnvelope = serde_json::from_str(body).ok()?;
    match envelope.into_report() {
        report @ ResultsReport::Incomplete { .. } => Some(report),
        _ => None,
    }
}
