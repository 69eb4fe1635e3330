//! Single-marker selection and per-marker visual state.
//!
//! Visual state is a pure function of `(markers, selected id)`; [`SelectionSync`]
//! only holds the selected id and the last canonical ordering it rendered.

use serde::Serialize;

use crate::marker::Marker;
use crate::order::canonical_order;

/// Tracking sequence number of a marker on the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Rank {
    /// 1-based position among confirmed, non-excluded markers.
    Tracked(usize),
    /// Neither confirmed nor excluded; shown without a number.
    Pending,
    /// Excluded from the tracking sequence.
    Excluded,
}

impl Rank {
    /// Short label drawn on the marker overlay.
    pub fn label(&self) -> String {
        match self {
            Self::Tracked(n) => n.to_string(),
            Self::Pending => "-".to_string(),
            Self::Excluded => "X".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerClass {
    Confirmed,
    Excluded,
    Pending,
}

impl MarkerClass {
    pub fn of(marker: &Marker) -> Self {
        if marker.is_excluded {
            Self::Excluded
        } else if marker.is_confirmed {
            Self::Confirmed
        } else {
            Self::Pending
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Excluded => "excluded",
            Self::Pending => "pending",
        }
    }
}

/// Rendered emphasis for one marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualState {
    pub marker_id: String,
    /// 1-based position in canonical order, counting every marker.
    pub ordinal: usize,
    pub rank: Rank,
    pub class: MarkerClass,
    pub selected: bool,
    /// Hex colour for the marker pin.
    pub tone: &'static str,
}

impl VisualState {
    /// Overlay class string, e.g. `marker-overlay confirmed selected`.
    pub fn css_class(&self) -> String {
        let mut class = format!("marker-overlay {}", self.class.as_str());
        if self.selected {
            class.push_str(" selected");
        }
        class
    }
}

/// Pin colour by exclusion, confirmation, then confidence band.
pub fn tone(marker: &Marker) -> &'static str {
    if marker.is_excluded {
        return "#ef4444";
    }
    if !marker.is_confirmed {
        return "#f59e0b";
    }
    match marker.confidence_score {
        s if s >= 0.9 => "#10b981",
        s if s >= 0.7 => "#3b82f6",
        s if s >= 0.5 => "#8b5cf6",
        _ => "#6b7280",
    }
}

/// Rank `marker` against the confirmed markers, already in canonical order.
///
/// `ordered_confirmed` must contain only tracked markers (confirmed and not excluded).
pub fn compute_rank(marker: &Marker, ordered_confirmed: &[&Marker]) -> Rank {
    if marker.is_excluded {
        return Rank::Excluded;
    }
    if !marker.is_confirmed {
        return Rank::Pending;
    }
    ordered_confirmed
        .iter()
        .position(|m| m.id == marker.id)
        .map_or(Rank::Pending, |i| Rank::Tracked(i + 1))
}

/// Compute visual state for every marker, returned in canonical order.
pub fn render(markers: &[Marker], selected: Option<&str>) -> Vec<VisualState> {
    let order = canonical_order(markers);
    let confirmed: Vec<&Marker> = order
        .iter()
        .map(|&i| &markers[i])
        .filter(|m| m.is_tracked())
        .collect();

    order
        .iter()
        .enumerate()
        .map(|(pos, &i)| {
            let marker = &markers[i];
            VisualState {
                marker_id: marker.id.clone(),
                ordinal: pos + 1,
                rank: compute_rank(marker, &confirmed),
                class: MarkerClass::of(marker),
                selected: selected == Some(marker.id.as_str()),
                tone: tone(marker),
            }
        })
        .collect()
}

/// Process-local selection state for one case view.
#[derive(Debug, Default, Clone)]
pub struct SelectionSync {
    selected: Option<String>,
    order: Vec<String>,
}

impl SelectionSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Marker ids in the canonical order of the last render.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Toggle selection: re-selecting the current marker clears it.
    pub fn select(&mut self, marker_id: &str) -> Option<&str> {
        if self.selected.as_deref() == Some(marker_id) {
            tracing::debug!(marker = marker_id, "selection cleared");
            self.selected = None;
        } else {
            tracing::debug!(marker = marker_id, "marker selected");
            self.selected = Some(marker_id.to_string());
        }
        self.selected()
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }

    /// A freshly loaded marker set: selection resets to none.
    pub fn reload(&mut self, markers: &[Marker]) -> Vec<VisualState> {
        self.selected = None;
        self.render(markers)
    }

    /// Recompute visual state for `markers` with the current selection.
    ///
    /// A selection pointing at a marker no longer present is dropped.
    pub fn render(&mut self, markers: &[Marker]) -> Vec<VisualState> {
        if let Some(id) = &self.selected
            && !markers.iter().any(|m| &m.id == id)
        {
            self.selected = None;
        }
        let states = render(markers, self.selected());
        self.order = states.iter().map(|s| s.marker_id.clone()).collect();
        states
    }
}
