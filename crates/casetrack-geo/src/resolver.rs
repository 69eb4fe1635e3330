use std::sync::Arc;

use casetrack_core::{LatLng, Marker, PositionSource};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::fallback::FallbackConfig;
use crate::geocoder::Geocoder;

/// Position chosen for one marker and where it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub position: LatLng,
    pub source: PositionSource,
}

/// Wraps a [`Geocoder`] and never fails: misses and errors become fallback positions.
///
/// Lookups through one resolver are serialized by an in-flight guard, so a
/// single path build can never have two lookups outstanding. Independent
/// resolvers may share the same underlying geocoder.
pub struct GeocodeResolver {
    geocoder: Arc<dyn Geocoder>,
    fallback: FallbackConfig,
    in_flight: Mutex<()>,
}

impl GeocodeResolver {
    pub fn new(geocoder: Arc<dyn Geocoder>, fallback: FallbackConfig) -> Self {
        Self {
            geocoder,
            fallback,
            in_flight: Mutex::new(()),
        }
    }

    pub fn fallback(&self) -> &FallbackConfig {
        &self.fallback
    }

    /// Resolve a marker: stored coordinates win, otherwise geocode `location_name`.
    pub async fn resolve(&self, marker: &Marker) -> Resolution {
        if let Some(position) = marker.position {
            return Resolution {
                position,
                source: PositionSource::Stored,
            };
        }
        self.lookup(&marker.location_name).await
    }

    /// Geocode a free-text place name, falling back on miss or failure.
    pub async fn lookup(&self, location_name: &str) -> Resolution {
        let query = location_name.trim();
        if query.is_empty() {
            return self.fall_back(location_name, "empty location name");
        }

        let _guard = self.in_flight.lock().await;
        match self.geocoder.geocode(query).await {
            Ok(Some(position)) => {
                debug!(query, %position, "geocoded");
                Resolution {
                    position,
                    source: PositionSource::Geocoded,
                }
            }
            Ok(None) => self.fall_back(query, "no match"),
            Err(e) => self.fall_back(query, &e.to_string()),
        }
    }

    fn fall_back(&self, location_name: &str, reason: &str) -> Resolution {
        let position = self.fallback.position_for(location_name);
        warn!(location = location_name, reason, %position, "geocode fell back");
        Resolution {
            position,
            source: PositionSource::Fallback,
        }
    }
}
