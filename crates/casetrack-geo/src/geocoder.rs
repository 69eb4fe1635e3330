use std::sync::Arc;

use async_trait::async_trait;
use casetrack_core::LatLng;

use crate::GeocodeError;

/// Address → coordinate lookup capability.
///
/// `Ok(None)` means the provider answered but found no match; `Err` means the
/// lookup itself failed. Callers never see either directly: [`GeocodeResolver`]
/// downgrades both to a fallback position.
///
/// [`GeocodeResolver`]: crate::GeocodeResolver
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, query: &str) -> Result<Option<LatLng>, GeocodeError>;
}

#[async_trait]
impl<T: Geocoder + ?Sized> Geocoder for Arc<T> {
    async fn geocode(&self, query: &str) -> Result<Option<LatLng>, GeocodeError> {
        (**self).geocode(query).await
    }
}

/// Geocoder used when no provider is configured: every lookup is a miss.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineGeocoder;

#[async_trait]
impl Geocoder for OfflineGeocoder {
    async fn geocode(&self, _query: &str) -> Result<Option<LatLng>, GeocodeError> {
        Ok(None)
    }
}
