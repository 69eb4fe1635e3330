//! Geocoding layer: address lookup capability, deterministic fallback, ordered path building.

mod error;
pub use error::GeocodeError;

pub mod fallback;
pub mod geocoder;
pub mod path;
pub mod resolver;

#[cfg(feature = "kakao")]
mod kakao;
#[cfg(feature = "kakao")]
pub use kakao::KakaoGeocoder;

pub use fallback::FallbackConfig;
pub use geocoder::{Geocoder, OfflineGeocoder};
pub use path::{Bounds, PathBuilder, PathError, PathRender, PathSlot};
pub use resolver::{GeocodeResolver, Resolution};
