//! Deterministic fallback positions for markers whose address cannot be resolved.
//!
//! A miss places the marker at a small jitter around a fixed reference point so
//! it stays visible on the map. The jitter is seeded by the location name, so
//! re-rendering the same marker set never moves a fallback marker.

use casetrack_core::LatLng;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seoul City Hall: default map centre and fallback anchor.
pub const DEFAULT_REFERENCE: LatLng = LatLng::new(37.5665, 126.9780);

/// Maximum offset in degrees applied on each axis.
pub const DEFAULT_JITTER_DEG: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FallbackConfig {
    pub reference: LatLng,
    pub jitter_deg: f64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            reference: DEFAULT_REFERENCE,
            jitter_deg: DEFAULT_JITTER_DEG,
        }
    }
}

impl FallbackConfig {
    /// Fallback position for `location_name`.
    pub fn position_for(&self, location_name: &str) -> LatLng {
        let jitter = self.jitter_deg.abs();
        if jitter == 0.0 || !jitter.is_finite() {
            return self.reference;
        }
        let mut rng = StdRng::seed_from_u64(seed(location_name));
        LatLng::new(
            self.reference.lat + rng.gen_range(-jitter..=jitter),
            self.reference.lng + rng.gen_range(-jitter..=jitter),
        )
    }
}

/// FNV-1a over the trimmed name; stable across runs and platforms.
fn seed(location_name: &str) -> u64 {
    location_name
        .trim()
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325_u64, |acc, b| {
            (acc ^ b as u64).wrapping_mul(0x0000_0100_0000_01b3)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_same_position() {
        let cfg = FallbackConfig::default();
        assert_eq!(cfg.position_for("Nowhere 12"), cfg.position_for("Nowhere 12"));
        assert_eq!(
            cfg.position_for("  Nowhere 12 "),
            cfg.position_for("Nowhere 12")
        );
    }

    #[test]
    fn different_names_spread_out() {
        let cfg = FallbackConfig::default();
        assert_ne!(cfg.position_for("alpha"), cfg.position_for("beta"));
    }

    #[test]
    fn stays_within_jitter_box() {
        let cfg = FallbackConfig::default();
        for name in ["", "a", "Gangnam-daero 396", "unknown alley", "서울역"] {
            let p = cfg.position_for(name);
            assert!((p.lat - DEFAULT_REFERENCE.lat).abs() <= DEFAULT_JITTER_DEG);
            assert!((p.lng - DEFAULT_REFERENCE.lng).abs() <= DEFAULT_JITTER_DEG);
        }
    }

    #[test]
    fn zero_jitter_pins_to_reference() {
        let cfg = FallbackConfig {
            jitter_deg: 0.0,
            ..FallbackConfig::default()
        };
        assert_eq!(cfg.position_for("anything"), DEFAULT_REFERENCE);
    }
}
