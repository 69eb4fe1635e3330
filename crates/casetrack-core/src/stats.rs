use serde::Serialize;

use crate::marker::Marker;

/// Summary counts over a case's markers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MarkerStats {
    pub total: usize,
    pub ai_generated: usize,
    pub manual: usize,
    pub confirmed: usize,
    pub excluded: usize,
    /// Mean confidence over markers with a positive score, rounded to 2 decimals.
    pub avg_confidence: f32,
    /// Markers with confidence >= 0.8.
    pub high_confidence: usize,
}

impl MarkerStats {
    pub fn from_markers(markers: &[Marker]) -> Self {
        if markers.is_empty() {
            return Self::default();
        }

        let scored: Vec<f32> = markers
            .iter()
            .map(|m| m.confidence_score)
            .filter(|&s| s > 0.0)
            .collect();
        let avg = if scored.is_empty() {
            0.0
        } else {
            scored.iter().sum::<f32>() / scored.len() as f32
        };

        let ai_generated = markers.iter().filter(|m| m.ai_generated).count();
        Self {
            total: markers.len(),
            ai_generated,
            manual: markers.len() - ai_generated,
            confirmed: markers.iter().filter(|m| m.is_confirmed).count(),
            excluded: markers.iter().filter(|m| m.is_excluded).count(),
            avg_confidence: (avg * 100.0).round() / 100.0,
            high_confidence: markers
                .iter()
                .filter(|m| m.confidence_score >= 0.8)
                .count(),
        }
    }
}
