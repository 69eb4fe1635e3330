//! Sync layer: HTTP access to the case tracking backend.

#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "http")]
pub mod request;
#[cfg(feature = "http")]
mod source;

#[cfg(feature = "http")]
pub use http::{AnalysisSubmission, CaseClient, DEFAULT_BASE_URL, SyncError};
#[cfg(feature = "http")]
pub use request::{AnalysisRequest, MarkerUpdate, NewMarker};
