//! Remote video-analysis job: lifecycle state and the status/results wire shapes.

use serde::{Deserialize, Deserializer, Serialize};

use crate::marker::{Marker, MarkerRecord};

/// Lifecycle of an analysis job as seen by the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Submitted,
    Polling,
    Completed,
    Failed,
    TimedOut,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::TimedOut | Self::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Polling => "polling",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
            Self::Cancelled => "cancelled",
        }
    }
}

/// A submitted analysis job and everything last observed about it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisJob {
    pub id: String,
    pub case_id: String,
    pub state: JobState,
    /// Last reported progress, `0..=100`.
    pub progress: u8,
    pub result: Option<JobResults>,
    pub error: Option<String>,
}

impl AnalysisJob {
    pub fn submitted(case_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            case_id: case_id.into(),
            state: JobState::Submitted,
            progress: 0,
            result: None,
            error: None,
        }
    }
}

/// Stage name reported by the analysis service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RemoteStatus {
    Preparing,
    Processing,
    SmartFrameExtraction,
    BatchPersonExtraction,
    BatchSuspectMatching,
    ResultCompilation,
    Completed,
    Failed,
    Error,
    Unknown(String),
}

impl Default for RemoteStatus {
    fn default() -> Self {
        Self::Unknown("unknown".to_string())
    }
}

impl From<String> for RemoteStatus {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "preparing" => Self::Preparing,
            "processing" => Self::Processing,
            "smart_frame_extraction" => Self::SmartFrameExtraction,
            "batch_person_extraction" => Self::BatchPersonExtraction,
            "batch_suspect_matching" => Self::BatchSuspectMatching,
            "result_compilation" => Self::ResultCompilation,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "error" => Self::Error,
            _ => Self::Unknown(s),
        }
    }
}

impl From<&str> for RemoteStatus {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<RemoteStatus> for String {
    fn from(status: RemoteStatus) -> Self {
        status.as_str().to_string()
    }
}

impl RemoteStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Preparing => "preparing",
            Self::Processing => "processing",
            Self::SmartFrameExtraction => "smart_frame_extraction",
            Self::BatchPersonExtraction => "batch_person_extraction",
            Self::BatchSuspectMatching => "batch_suspect_matching",
            Self::ResultCompilation => "result_compilation",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Error => "error",
            Self::Unknown(s) => s,
        }
    }

    /// The job failed remotely. Fatal; never retried.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Error)
    }

    /// Human-readable progress line for the UI.
    pub fn message(&self, progress: u8) -> String {
        match self {
            Self::Preparing => "Preparing analysis...".to_string(),
            Self::Processing => format!("AI analysis in progress... ({progress}%)"),
            Self::SmartFrameExtraction => "Extracting key frames...".to_string(),
            Self::BatchPersonExtraction => "Extracting suspect candidates...".to_string(),
            Self::BatchSuspectMatching => "Matching suspects...".to_string(),
            Self::ResultCompilation => "Compiling results...".to_string(),
            Self::Completed => "Analysis complete".to_string(),
            Self::Failed => "Analysis failed".to_string(),
            Self::Error => "Analysis error".to_string(),
            Self::Unknown(s) if s == "unknown" => "Checking analysis status...".to_string(),
            Self::Unknown(_) => format!("Analyzing... ({progress}%)"),
        }
    }
}

impl std::fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accept integer, float, or null progress and clamp to `0..=100`.
fn de_progress<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0);
    Ok(clamp_progress(raw))
}

fn clamp_progress(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.clamp(0.0, 100.0).round() as u8
}

/// Response of the job status endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatusReport {
    pub success: bool,
    #[serde(default, deserialize_with = "de_progress")]
    pub progress: u8,
    #[serde(default)]
    pub status: RemoteStatus,
    #[serde(default)]
    pub suspects_found: u32,
    #[serde(default)]
    pub crop_images_available: u32,
    #[serde(default)]
    pub error: Option<String>,
}

impl StatusReport {
    /// The service says the job is done; results should be fetched.
    pub fn is_done(&self) -> bool {
        self.status == RemoteStatus::Completed || self.progress >= 100
    }

    pub fn to_progress(&self) -> JobProgress {
        JobProgress {
            progress: self.progress,
            status: self.status.clone(),
            suspects_found: self.suspects_found,
            crop_images_available: self.crop_images_available,
        }
    }
}

/// Intermediate progress surfaced to the caller on every successful status check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobProgress {
    pub progress: u8,
    pub status: RemoteStatus,
    pub suspects_found: u32,
    pub crop_images_available: u32,
}

impl JobProgress {
    pub fn message(&self) -> String {
        self.status.message(self.progress)
    }
}

/// Finalized output of a completed analysis job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobResults {
    pub analysis_id: Option<String>,
    pub markers_created: u32,
    pub markers: Vec<MarkerRecord>,
    /// Raw detection candidates, passed through untouched.
    pub detection_candidates: serde_json::Value,
    pub investigation_summary: serde_json::Value,
    pub message: Option<String>,
}

impl JobResults {
    /// Markers created by the analysis, as domain markers.
    pub fn markers(&self) -> Vec<Marker> {
        self.markers
            .iter()
            .cloned()
            .map(MarkerRecord::into_marker)
            .collect()
    }
}

/// Raw response of the job results endpoint; interpret with [`ResultsEnvelope::into_report`].
#[derive(Debug, Clone, Deserialize)]
pub struct ResultsEnvelope {
    pub success: bool,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "de_progress")]
    pub progress: u8,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub analysis_id: Option<String>,
    #[serde(default)]
    pub markers_created: Option<u32>,
    #[serde(default)]
    pub markers: Vec<MarkerRecord>,
    #[serde(default, alias = "detection_results")]
    pub detection_candidates: serde_json::Value,
    #[serde(default)]
    pub investigation_summary: serde_json::Value,
}

/// Interpreted results response.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultsReport {
    Ready(JobResults),
    /// Completion was signalled but results are not final yet; keep polling.
    Incomplete { progress: u8, message: Option<String> },
    Failed { error: String },
}

impl ResultsEnvelope {
    pub fn into_report(self) -> ResultsReport {
        if self.success {
            let markers_created = self
                .markers_created
                .unwrap_or(self.markers.len() as u32);
            return ResultsReport::Ready(JobResults {
                analysis_id: self.analysis_id,
                markers_created,
                markers: self.markers,
                detection_candidates: self.detection_candidates,
                investigation_summary: self.investigation_summary,
                message: self.message,
            });
        }
        if self.status.as_deref() == Some("incomplete") {
            return ResultsReport::Incomplete {
                progress: self.progress,
                message: self.message,
            };
        }
        ResultsReport::Failed {
            error: self
                .error
                .or(self.message)
                .unwrap_or_else(|| "failed to fetch analysis results".to_string()),
        }
    }
}
