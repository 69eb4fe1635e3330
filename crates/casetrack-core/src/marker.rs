//! Marker types: observations of a suspect attached to a case.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl std::fmt::Display for LatLng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lng)
    }
}

/// A timestamped, located observation of a suspect.
///
/// Markers are treated as immutable for the duration of a rendering pass;
/// any change to the set triggers a full re-sort and re-resolve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: String,
    /// Free-text place description, fed to the geocoder when no position is stored.
    pub location_name: String,
    pub detected_at: DateTime<Utc>,
    /// Stored coordinates; when present, no geocoding happens.
    pub position: Option<LatLng>,
    /// Detection confidence in `[0, 1]`.
    pub confidence_score: f32,
    pub is_confirmed: bool,
    pub is_excluded: bool,
    /// Tie-breaker for markers detected at the same instant.
    pub sequence_order: u32,
    pub police_comment: Option<String>,
    pub ai_generated: bool,
    pub crop_image_url: Option<String>,
}

impl Marker {
    /// Confirmed and not excluded: the marker takes part in the tracking sequence.
    pub fn is_tracked(&self) -> bool {
        self.is_confirmed && !self.is_excluded
    }

    /// Confidence as a whole percentage, e.g. `0.873` → `87`.
    pub fn confidence_percent(&self) -> u32 {
        (self.confidence_score.clamp(0.0, 1.0) * 100.0).round() as u32
    }
}

/// Marker as returned by the case marker endpoints and the analysis results endpoint.
///
/// Field names follow the backend's snake_case JSON. Convert with [`MarkerRecord::into_marker`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerRecord {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub location_name: String,
    #[serde(default)]
    pub detected_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub confidence_score: Option<f32>,
    #[serde(default = "default_true")]
    pub is_confirmed: bool,
    #[serde(default)]
    pub is_excluded: bool,
    #[serde(default)]
    pub police_comment: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub sequence_order: Option<u32>,
    #[serde(default)]
    pub crop_image_url: Option<String>,
    #[serde(default)]
    pub analysis_id: Option<String>,
    #[serde(default)]
    pub ai_generated: Option<bool>,
}

fn default_true() -> bool {
    true
}

/// Backend ids arrive as integers or UUID strings; keep them as text.
fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }
    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

impl MarkerRecord {
    /// Convert the wire record into a domain [`Marker`].
    ///
    /// - A missing `detected_at` becomes the Unix epoch, so undated markers sort first.
    /// - A stored position requires both coordinates present and non-zero.
    /// - Empty comments and image URLs are dropped.
    pub fn into_marker(self) -> Marker {
        let position = match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) if lat != 0.0 && lng != 0.0 => Some(LatLng::new(lat, lng)),
            _ => None,
        };
        let ai_generated = self.ai_generated.unwrap_or_else(|| {
            self.analysis_id
                .as_deref()
                .is_some_and(|id| !id.trim().is_empty())
        });
        Marker {
            id: self.id,
            location_name: self.location_name,
            detected_at: self.detected_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            position,
            confidence_score: self.confidence_score.map_or(0.0, |s| s.clamp(0.0, 1.0)),
            is_confirmed: self.is_confirmed,
            is_excluded: self.is_excluded,
            sequence_order: self.sequence_order.unwrap_or(0),
            police_comment: self.police_comment.filter(|c| !c.trim().is_empty()),
            ai_generated,
            crop_image_url: self.crop_image_url.filter(|u| !u.trim().is_empty()),
        }
    }
}

/// How a [`ResolvedPoint`] obtained its coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionSource {
    /// Coordinates stored on the marker itself.
    Stored,
    /// Looked up from `location_name`.
    Geocoded,
    /// Lookup missed or failed; jittered reference point.
    Fallback,
}

impl PositionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stored => "stored",
            Self::Geocoded => "geocoded",
            Self::Fallback => "fallback",
        }
    }
}

/// A marker paired with concrete coordinates and its index in canonical order.
///
/// Recomputed on every path build; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedPoint {
    pub marker: Marker,
    pub position: LatLng,
    /// 0-based index in canonical order.
    pub index: usize,
    pub source: PositionSource,
}

impl ResolvedPoint {
    /// 1-based display position.
    pub fn ordinal(&self) -> usize {
        self.index + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_record_from_list_endpoint() {
        let json = r#"{
            "id": "6f1c",
            "location_name": "Seoul Station",
            "detected_at": "2025-03-01T09:30:00+09:00",
            "confidence_score": 0.87,
            "confidence_percentage": "87.0%",
            "is_confirmed": true,
            "is_excluded": false,
            "police_comment": "",
            "latitude": 37.5547,
            "longitude": 126.9707,
            "sequence_order": 2,
            "crop_image_url": null,
            "analysis_id": "a-17",
            "ai_generated": true
        }"#;
        let record: MarkerRecord = serde_json::from_str(json).unwrap();
        let marker = record.into_marker();
        assert_eq!(marker.location_name, "Seoul Station");
        assert_eq!(marker.detected_at.to_rfc3339(), "2025-03-01T00:30:00+00:00");
        assert_eq!(marker.position, Some(LatLng::new(37.5547, 126.9707)));
        assert_eq!(marker.sequence_order, 2);
        assert!(marker.police_comment.is_none());
        assert!(marker.ai_generated);
        assert_eq!(marker.confidence_percent(), 87);
    }

    #[test]
    fn marker_record_minimal_from_results_endpoint() {
        let json = r#"{"id": "m1", "location_name": "Gangnam", "detected_at": null}"#;
        let marker: Marker = serde_json::from_str::<MarkerRecord>(json)
            .unwrap()
            .into_marker();
        assert_eq!(marker.detected_at, DateTime::<Utc>::UNIX_EPOCH);
        assert!(marker.position.is_none());
        assert!(marker.is_confirmed);
        assert!(!marker.is_excluded);
        assert!(!marker.ai_generated);
        assert_eq!(marker.confidence_score, 0.0);
    }

    #[test]
    fn zero_coordinates_count_as_missing() {
        let json = r#"{"id": "m1", "latitude": 0.0, "longitude": 126.97}"#;
        let marker = serde_json::from_str::<MarkerRecord>(json)
            .unwrap()
            .into_marker();
        assert!(marker.position.is_none());
    }

    #[test]
    fn ai_generated_derived_from_analysis_id() {
        let json = r#"{"id": "m1", "analysis_id": "job-9"}"#;
        let marker = serde_json::from_str::<MarkerRecord>(json)
            .unwrap()
            .into_marker();
        assert!(marker.ai_generated);
    }

    #[test]
    fn tracked_requires_confirmed_and_not_excluded() {
        let mut marker = serde_json::from_str::<MarkerRecord>(r#"{"id": "m1"}"#)
            .unwrap()
            .into_marker();
        assert!(marker.is_tracked());
        marker.is_excluded = true;
        assert!(!marker.is_tracked());
        marker.is_excluded = false;
        marker.is_confirmed = false;
        assert!(!marker.is_tracked());
    }

    #[test]
    fn numeric_id_accepted() {
        let record: MarkerRecord = serde_json::from_str(r#"{"id": 42}"#).unwrap();
        assert_eq!(record.id, "42");
    }

    #[test]
    fn confidence_clamped_to_unit_range() {
        let high = serde_json::from_str::<MarkerRecord>(r#"{"id": "m1", "confidence_score": 1.4}"#)
            .unwrap()
            .into_marker();
        let low = serde_json::from_str::<MarkerRecord>(r#"{"id": "m2", "confidence_score": -0.2}"#)
            .unwrap()
            .into_marker();
        assert_eq!(high.confidence_score, 1.0);
        assert_eq!(low.confidence_score, 0.0);
    }
}
