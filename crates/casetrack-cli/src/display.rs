//! Terminal rendering for markers, paths, and job progress.

use std::collections::HashMap;
use std::fmt::Write as _;

use casetrack_core::{
    JobProgress, JobResults, Marker, MarkerStats, ResolvedPoint, VisualState,
};
use casetrack_geo::PathRender;

const PROGRESS_BAR_WIDTH: usize = 30;
const MAX_LOCATION_CHARS: usize = 32;

// ── Markers ──

/// One row per marker, in canonical order.
pub fn marker_table(markers: &[Marker], states: &[VisualState]) -> String {
    let by_id: HashMap<&str, &Marker> = markers.iter().map(|m| (m.id.as_str(), m)).collect();
    let mut out = String::new();

    let _ = writeln!(
        out,
        "  {:>3}  {:>4}  {:<9} {:<19} {:<32} {:>5}  {}",
        "#", "rank", "class", "detected", "location", "conf", "tone"
    );
    for state in states {
        let Some(marker) = by_id.get(state.marker_id.as_str()) else {
            continue;
        };
        let _ = writeln!(
            out,
            "{} {:>3}  {:>4}  {:<9} {:<19} {:<32} {:>4}%  {}",
            if state.selected { ">" } else { " " },
            state.ordinal,
            state.rank.label(),
            state.class.as_str(),
            marker.detected_at.format("%Y-%m-%d %H:%M:%S"),
            clip(&marker.location_name, MAX_LOCATION_CHARS),
            marker.confidence_percent(),
            state.tone,
        );
        if state.selected
            && let Some(comment) = &marker.police_comment
        {
            let _ = writeln!(out, "        note: {comment}");
        }
    }
    out
}

pub fn stats_line(stats: &MarkerStats) -> String {
    format!(
        "{} markers ({} AI, {} manual) | {} confirmed, {} excluded | avg confidence {:.2}, {} high",
        stats.total,
        stats.ai_generated,
        stats.manual,
        stats.confirmed,
        stats.excluded,
        stats.avg_confidence,
        stats.high_confidence,
    )
}

// ── Path ──

pub fn point_line(point: &ResolvedPoint) -> String {
    format!(
        "  {:>3}. {:<32} {} [{}]",
        point.ordinal(),
        clip(&point.marker.location_name, MAX_LOCATION_CHARS),
        point.position,
        point.source.as_str(),
    )
}

/// Summary card for a finished path build.
pub fn path_card(render: &PathRender) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Path (run {}) ===", render.run);
    if render.points.is_empty() {
        let _ = writeln!(out, "  no markers; map centred on {}", render.center);
        return out;
    }
    for point in &render.points {
        let _ = writeln!(out, "{}", point_line(point));
    }
    let _ = writeln!(out);
    if render.has_path() {
        let _ = writeln!(out, "  {:<10} {} segments", "polyline", render.polyline.len() - 1);
    } else {
        let _ = writeln!(out, "  {:<10} (single point, no line)", "polyline");
    }
    if let Some(bounds) = render.bounds {
        let _ = writeln!(
            out,
            "  {:<10} {} .. {}",
            "bounds", bounds.south_west, bounds.north_east
        );
    }
    let _ = writeln!(out, "  {:<10} {}", "centre", render.center);
    out
}

// ── Jobs ──

pub fn progress_line(progress: &JobProgress) -> String {
    let filled = usize::from(progress.progress) * PROGRESS_BAR_WIDTH / 100;
    format!(
        "[{}{}] {:>3}%  {}  (suspects {}, crops {})",
        "#".repeat(filled),
        "-".repeat(PROGRESS_BAR_WIDTH - filled),
        progress.progress,
        progress.message(),
        progress.suspects_found,
        progress.crop_images_available,
    )
}

pub fn print_progress(progress: &JobProgress) {
    eprint!("\r  {}", progress_line(progress));
}

pub fn results_summary(results: &JobResults) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Analysis results ===");
    if let Some(id) = &results.analysis_id {
        let _ = writeln!(out, "  {:<16} {}", "analysis", id);
    }
    let _ = writeln!(out, "  {:<16} {}", "markers created", results.markers_created);
    if let Some(candidates) = results.detection_candidates.as_array() {
        let _ = writeln!(out, "  {:<16} {}", "candidates", candidates.len());
    }
    if let Some(message) = &results.message {
        let _ = writeln!(out, "  {:<16} {}", "message", message);
    }
    out
}

fn clip(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut clipped: String = s.chars().take(max.saturating_sub(1)).collect();
    clipped.push('…');
    clipped
}

#[cfg(test)]
mod tests {
    use super::*;
    use casetrack_core::{LatLng, PositionSource, RemoteStatus, render};
    use chrono::{TimeZone, Utc};

    fn marker(id: &str, location: &str, hour: u32) -> Marker {
        Marker {
            id: id.into(),
            location_name: location.into(),
            detected_at: Utc.with_ymd_and_hms(2025, 3, 1, hour, 0, 0).unwrap(),
            position: None,
            confidence_score: 0.92,
            is_confirmed: true,
            is_excluded: false,
            sequence_order: 0,
            police_comment: Some("seen on camera 4".into()),
            ai_generated: true,
            crop_image_url: None,
        }
    }

    #[test]
    fn table_marks_selection_and_rank() {
        let mut excluded = marker("b", "Sinchon", 9);
        excluded.is_excluded = true;
        let markers = vec![marker("a", "Hongdae", 10), excluded];
        let states = render(&markers, Some("a"));
        let table = marker_table(&markers, &states);
        let lines: Vec<&str> = table.lines().collect();

        assert!(lines[1].contains("Sinchon"));
        assert!(lines[1].contains("excluded"));
        assert!(lines[1].trim_start().starts_with("1     X"));
        assert!(lines[2].starts_with(">"));
        assert!(lines[2].contains("Hongdae"));
        assert!(lines[3].contains("note: seen on camera 4"));
    }

    #[test]
    fn progress_bar_fills_proportionally() {
        let line = progress_line(&JobProgress {
            progress: 50,
            status: RemoteStatus::Processing,
            suspects_found: 2,
            crop_images_available: 7,
        });
        assert!(line.starts_with(&format!("[{}{}]", "#".repeat(15), "-".repeat(15))));
        assert!(line.contains("AI analysis in progress... (50%)"));
        assert!(line.contains("suspects 2, crops 7"));
    }

    #[test]
    fn empty_path_card_names_centre() {
        let render = PathRender {
            run: 1,
            points: vec![],
            polyline: vec![],
            bounds: None,
            center: LatLng::new(37.5665, 126.978),
        };
        let card = path_card(&render);
        assert!(card.contains("no markers; map centred on (37.566500, 126.978000)"));
    }

    #[test]
    fn single_point_has_no_line() {
        let m = marker("a", "Hongdae", 10);
        let position = LatLng::new(37.55, 126.92);
        let render = PathRender {
            run: 3,
            points: vec![ResolvedPoint {
                marker: m,
                position,
                index: 0,
                source: PositionSource::Geocoded,
            }],
            polyline: vec![],
            bounds: None,
            center: position,
        };
        let card = path_card(&render);
        assert!(card.contains("1. Hongdae"));
        assert!(card.contains("[geocoded]"));
        assert!(card.contains("single point, no line"));
    }

    #[test]
    fn long_locations_clipped() {
        assert_eq!(clip("short", 10), "short");
        assert_eq!(clip("abcdefghijkl", 5), "abcd…");
    }
}
