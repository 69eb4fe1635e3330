//! Canonical marker ordering.
//!
//! Markers form a suspect's path only once they are placed in a single total
//! order. That order is:
//!
//! 1. `detected_at` ascending
//! 2. `sequence_order` ascending, for markers detected at the same instant
//! 3. input position, for markers equal on both fields (the sort is stable)
//!
//! Every consumer (path building, ranking, listing) goes through this module so
//! the numbering shown on the map and in the marker list always agrees.

use std::cmp::Ordering;

use crate::marker::Marker;

/// Compare two markers by `(detected_at, sequence_order)`.
pub fn cmp_canonical(a: &Marker, b: &Marker) -> Ordering {
    a.detected_at
        .cmp(&b.detected_at)
        .then(a.sequence_order.cmp(&b.sequence_order))
}

/// Indices into `markers` in canonical order.
///
/// Useful when the caller needs to keep the original slice untouched.
pub fn canonical_order(markers: &[Marker]) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..markers.len()).collect();
    // `sort_by` is stable, which is what breaks full ties by input position.
    idx.sort_by(|&a, &b| cmp_canonical(&markers[a], &markers[b]));
    idx
}

/// Sort an owned marker set into canonical order.
pub fn sort_canonical(mut markers: Vec<Marker>) -> Vec<Marker> {
    markers.sort_by(cmp_canonical);
    markers
}
