//! Core types shared across casetrack: markers, analysis jobs, canonical ordering, selection.

pub mod job;
pub mod marker;
pub mod order;
pub mod selection;
pub mod stats;

pub use job::{
    AnalysisJob, JobProgress, JobResults, JobState, RemoteStatus, ResultsEnvelope, ResultsReport,
    StatusReport,
};
pub use marker::{LatLng, Marker, MarkerRecord, PositionSource, ResolvedPoint};
pub use order::{canonical_order, sort_canonical};
pub use selection::{MarkerClass, Rank, SelectionSync, VisualState, compute_rank, render};
pub use stats::MarkerStats;
