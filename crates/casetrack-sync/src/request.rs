//! Request bodies sent to the backend.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use serde::Serialize;

use crate::http::SyncError;

/// A manually placed marker.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMarker {
    pub location_name: String,
    pub detected_at: DateTime<Utc>,
    pub police_comment: Option<String>,
    pub confidence_score: f32,
    pub is_confirmed: bool,
    pub is_excluded: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Optional photo of the suspect at this location.
    pub suspect_image: Option<PathBuf>,
}

impl NewMarker {
    /// Manual markers default to full confidence, confirmed.
    pub fn new(location_name: impl Into<String>, detected_at: DateTime<Utc>) -> Self {
        Self {
            location_name: location_name.into(),
            detected_at,
            police_comment: None,
            confidence_score: 1.0,
            is_confirmed: true,
            is_excluded: false,
            latitude: None,
            longitude: None,
            suspect_image: None,
        }
    }

    /// Text fields of the multipart form, in submission order.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("location_name", self.location_name.clone()),
            ("detected_at", self.detected_at.to_rfc3339()),
            (
                "police_comment",
                self.police_comment.clone().unwrap_or_default(),
            ),
            ("confidence_score", self.confidence_score.to_string()),
            ("is_confirmed", self.is_confirmed.to_string()),
            ("is_excluded", self.is_excluded.to_string()),
        ];
        if let (Some(lat), Some(lng)) = (self.latitude, self.longitude) {
            fields.push(("latitude", lat.to_string()));
            fields.push(("longitude", lng.to_string()));
        }
        fields
    }

    pub(crate) async fn into_form(self) -> Result<Form, SyncError> {
        let mut form = Form::new();
        for (name, value) in self.fields() {
            form = form.text(name, value);
        }
        if let Some(path) = &self.suspect_image {
            form = form.part("suspect_image", file_part(path).await?);
        }
        Ok(form)
    }
}

/// Partial marker edit; only `Some` fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MarkerUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub police_comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_confirmed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_excluded: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

/// CCTV footage submitted for suspect analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub location_name: String,
    pub incident_time: DateTime<Utc>,
    pub suspect_description: String,
    pub video: PathBuf,
}

impl AnalysisRequest {
    pub(crate) async fn into_form(self) -> Result<Form, SyncError> {
        let video = file_part(&self.video).await?;
        Ok(Form::new()
            .text("location_name", self.location_name)
            .text("incident_time", self.incident_time.to_rfc3339())
            .text("suspect_description", self.suspect_description)
            .part("cctv_video", video))
    }
}

async fn file_part(path: &Path) -> Result<Part, SyncError> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    let part = Part::bytes(bytes)
        .file_name(file_name)
        .mime_str(mime_for(path))?;
    Ok(part)
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("mp4") => "video/mp4",
        Some("avi") => "video/x-msvideo",
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        Some("webm") => "video/webm",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}
