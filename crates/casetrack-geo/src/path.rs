//! Ordered path building over asynchronously resolved marker positions.
//!
//! A build sorts markers into canonical order, then resolves them one at a
//! time in that order. Each build takes a run token from a monotonically
//! increasing counter; starting a new build invalidates every older one, and
//! an invalidated build stops at its next suspension point without emitting
//! anything further.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use casetrack_core::{LatLng, Marker, ResolvedPoint, sort_canonical};
use thiserror::Error;
use tracing::{debug, info};

use crate::fallback::FallbackConfig;
use crate::geocoder::Geocoder;
use crate::resolver::{GeocodeResolver, Resolution};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("path run {run} superseded by run {current}")]
    Superseded { run: u64, current: u64 },
}

/// Axis-aligned bounding box of a set of points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl Bounds {
    pub fn from_point(p: LatLng) -> Self {
        Self {
            south_west: p,
            north_east: p,
        }
    }

    pub fn extend(&mut self, p: LatLng) {
        self.south_west.lat = self.south_west.lat.min(p.lat);
        self.south_west.lng = self.south_west.lng.min(p.lng);
        self.north_east.lat = self.north_east.lat.max(p.lat);
        self.north_east.lng = self.north_east.lng.max(p.lng);
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south_west.lat + self.north_east.lat) / 2.0,
            (self.south_west.lng + self.north_east.lng) / 2.0,
        )
    }
}

/// Output of one path build.
#[derive(Debug, Clone, PartialEq)]
pub struct PathRender {
    /// Run token of the build that produced this render.
    pub run: u64,
    /// Points in canonical order.
    pub points: Vec<ResolvedPoint>,
    /// Connecting line; empty unless there are at least two points.
    pub polyline: Vec<LatLng>,
    pub bounds: Option<Bounds>,
    /// Map centre: middle of `bounds`, or the fallback reference for an empty set.
    pub center: LatLng,
}

impl PathRender {
    pub fn has_path(&self) -> bool {
        self.polyline.len() >= 2
    }
}

/// Builds canonically ordered, positioned paths from marker sets.
pub struct PathBuilder {
    resolver: GeocodeResolver,
    generation: AtomicU64,
}

impl PathBuilder {
    pub fn new(geocoder: Arc<dyn Geocoder>, fallback: FallbackConfig) -> Self {
        Self::from_resolver(GeocodeResolver::new(geocoder, fallback))
    }

    pub fn from_resolver(resolver: GeocodeResolver) -> Self {
        Self {
            resolver,
            generation: AtomicU64::new(0),
        }
    }

    /// Token of the most recently started run.
    pub fn current_run(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Invalidate any in-flight run without starting a new one.
    pub fn supersede(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub async fn build(&self, markers: Vec<Marker>) -> Result<PathRender, PathError> {
        self.build_with(markers, |_| {}).await
    }

    /// Build a path, handing each point to `sink` as soon as it is resolved.
    ///
    /// `sink` sees points strictly in canonical order and only while this run
    /// is current, so it can drive progressive rendering.
    pub async fn build_with<F>(
        &self,
        markers: Vec<Marker>,
        mut sink: F,
    ) -> Result<PathRender, PathError>
    where
        F: FnMut(&ResolvedPoint),
    {
        let run = self.supersede();
        let ordered = sort_canonical(markers);
        info!(run, markers = ordered.len(), "building path");

        let mut points: Vec<ResolvedPoint> = Vec::with_capacity(ordered.len());
        let mut bounds: Option<Bounds> = None;

        // Invariant: one lookup at a time, in canonical order. Resolving
        // concurrently lets a later marker land before an earlier one.
        for (index, marker) in ordered.into_iter().enumerate() {
            let Resolution { position, source } = self.resolver.resolve(&marker).await;
            self.ensure_current(run)?;

            debug!(
                run,
                index,
                marker = %marker.id,
                source = source.as_str(),
                %position,
                "marker resolved"
            );
            let point = ResolvedPoint {
                marker,
                position,
                index,
                source,
            };
            sink(&point);
            match bounds.as_mut() {
                Some(b) => b.extend(position),
                None => bounds = Some(Bounds::from_point(position)),
            }
            points.push(point);
        }
        self.ensure_current(run)?;

        let polyline = if points.len() >= 2 {
            points.iter().map(|p| p.position).collect()
        } else {
            Vec::new()
        };
        let center = bounds.map_or(self.resolver.fallback().reference, |b| b.center());

        info!(run, points = points.len(), "path built");
        Ok(PathRender {
            run,
            points,
            polyline,
            bounds,
            center,
        })
    }

    fn ensure_current(&self, run: u64) -> Result<(), PathError> {
        let current = self.current_run();
        if current != run {
            debug!(run, current, "path run superseded");
            return Err(PathError::Superseded { run, current });
        }
        Ok(())
    }
}

/// Holds the render currently on screen; refuses anything older.
#[derive(Debug, Default)]
pub struct PathSlot {
    current: Option<PathRender>,
}

impl PathSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `render` unless a newer run is already shown.
    pub fn offer(&mut self, render: PathRender) -> bool {
        if let Some(shown) = &self.current
            && shown.run > render.run
        {
            return false;
        }
        self.current = Some(render);
        true
    }

    pub fn current(&self) -> Option<&PathRender> {
        self.current.as_ref()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GeocodeError;
    use crate::fallback::DEFAULT_REFERENCE;
    use async_trait::async_trait;
    use casetrack_core::PositionSource;
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Geocoder with per-query latency; queries without a position are misses.
    #[derive(Default)]
    struct Scripted {
        entries: HashMap<String, (Duration, Option<LatLng>)>,
        calls: Mutex<Vec<String>>,
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Scripted {
        fn with(mut self, query: &str, delay_ms: u64, position: Option<LatLng>) -> Self {
            self.entries
                .insert(query.into(), (Duration::from_millis(delay_ms), position));
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Geocoder for Scripted {
        async fn geocode(&self, query: &str) -> Result<Option<LatLng>, GeocodeError> {
            self.calls.lock().unwrap().push(query.to_string());
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            let (delay, position) = self
                .entries
                .get(query)
                .copied()
                .unwrap_or((Duration::ZERO, None));
            tokio::time::sleep(delay).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(position)
        }
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, h, m, 0).unwrap()
    }

    fn marker(id: &str, location: &str, detected_at: DateTime<Utc>) -> Marker {
        Marker {
            id: id.into(),
            location_name: location.into(),
            detected_at,
            position: None,
            confidence_score: 0.9,
            is_confirmed: true,
            is_excluded: false,
            sequence_order: 0,
            police_comment: None,
            ai_generated: false,
            crop_image_url: None,
        }
    }

    fn ids(render: &PathRender) -> Vec<&str> {
        render.points.iter().map(|p| p.marker.id.as_str()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn order_independent_of_lookup_latency() {
        // Earliest marker has the slowest lookup; a concurrent resolver would
        // finish these in reverse.
        let geo = Arc::new(
            Scripted::default()
                .with("first", 900, Some(LatLng::new(37.50, 127.00)))
                .with("second", 300, Some(LatLng::new(37.51, 127.01)))
                .with("third", 10, Some(LatLng::new(37.52, 127.02))),
        );
        let builder = PathBuilder::new(geo.clone(), FallbackConfig::default());
        let markers = vec![
            marker("c", "third", at(11, 0)),
            marker("a", "first", at(9, 0)),
            marker("b", "second", at(10, 0)),
        ];

        let render = builder.build(markers).await.unwrap();
        assert_eq!(ids(&render), vec!["a", "b", "c"]);
        assert_eq!(
            render.points.iter().map(|p| p.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(geo.calls(), vec!["first", "second", "third"]);
        assert_eq!(geo.peak.load(Ordering::SeqCst), 1);
        assert_eq!(
            render.polyline,
            vec![
                LatLng::new(37.50, 127.00),
                LatLng::new(37.51, 127.01),
                LatLng::new(37.52, 127.02),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn miss_falls_back_and_later_markers_still_resolve() {
        let geo = Arc::new(
            Scripted::default()
                .with("known", 5, Some(LatLng::new(35.0, 129.0)))
                .with("after", 5, Some(LatLng::new(35.1, 129.1))),
        );
        let builder = PathBuilder::new(geo.clone(), FallbackConfig::default());
        let markers = vec![
            marker("a", "known", at(9, 0)),
            marker("b", "nowhere", at(9, 10)),
            marker("c", "after", at(9, 20)),
        ];

        let render = builder.build(markers).await.unwrap();
        assert_eq!(render.points.len(), 3);
        let sources: Vec<PositionSource> = render.points.iter().map(|p| p.source).collect();
        assert_eq!(
            sources,
            vec![
                PositionSource::Geocoded,
                PositionSource::Fallback,
                PositionSource::Geocoded
            ]
        );
        assert_eq!(
            render.points[1].position,
            FallbackConfig::default().position_for("nowhere")
        );
        assert_eq!(render.points[2].position, LatLng::new(35.1, 129.1));
    }

    #[tokio::test]
    async fn stored_coordinates_skip_geocoder() {
        let geo = Arc::new(Scripted::default());
        let builder = PathBuilder::new(geo.clone(), FallbackConfig::default());
        let mut m = marker("a", "somewhere", at(9, 0));
        m.position = Some(LatLng::new(36.0, 128.0));

        let render = builder.build(vec![m]).await.unwrap();
        assert!(geo.calls().is_empty());
        assert_eq!(render.points[0].source, PositionSource::Stored);
        assert!(!render.has_path());
        assert_eq!(render.center, LatLng::new(36.0, 128.0));
    }

    #[tokio::test]
    async fn empty_set_centres_on_reference() {
        let builder = PathBuilder::new(Arc::new(Scripted::default()), FallbackConfig::default());
        let render = builder.build(vec![]).await.unwrap();
        assert!(render.points.is_empty());
        assert!(render.polyline.is_empty());
        assert!(render.bounds.is_none());
        assert_eq!(render.center, DEFAULT_REFERENCE);
    }

    #[tokio::test]
    async fn bounds_cover_all_points() {
        let builder = PathBuilder::new(Arc::new(Scripted::default()), FallbackConfig::default());
        let mut a = marker("a", "x", at(9, 0));
        a.position = Some(LatLng::new(37.0, 127.5));
        let mut b = marker("b", "y", at(9, 5));
        b.position = Some(LatLng::new(37.4, 127.1));

        let render = builder.build(vec![a, b]).await.unwrap();
        let bounds = render.bounds.unwrap();
        assert_eq!(bounds.south_west, LatLng::new(37.0, 127.1));
        assert_eq!(bounds.north_east, LatLng::new(37.4, 127.5));
        assert!((render.center.lat - 37.2).abs() < 1e-9);
        assert!((render.center.lng - 127.3).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn newer_run_supersedes_in_flight_run() {
        let geo = Arc::new(
            Scripted::default()
                .with("slow", 1_000, Some(LatLng::new(37.0, 127.0)))
                .with("fast", 10, Some(LatLng::new(37.1, 127.1))),
        );
        let builder = PathBuilder::new(geo, FallbackConfig::default());

        let stale = builder.build(vec![
            marker("old1", "slow", at(9, 0)),
            marker("old2", "fast", at(9, 5)),
        ]);
        let fresh = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            builder.build(vec![marker("new", "fast", at(10, 0))]).await
        };
        let (stale, fresh) = tokio::join!(stale, fresh);

        assert_eq!(stale, Err(PathError::Superseded { run: 1, current: 2 }));
        let fresh = fresh.unwrap();
        assert_eq!(fresh.run, 2);
        assert_eq!(ids(&fresh), vec!["new"]);
    }

    #[tokio::test(start_paused = true)]
    async fn sink_sees_points_in_order_and_stops_when_superseded() {
        let geo = Arc::new(
            Scripted::default()
                .with("p1", 50, Some(LatLng::new(37.0, 127.0)))
                .with("p2", 50, Some(LatLng::new(37.1, 127.1)))
                .with("p3", 50, Some(LatLng::new(37.2, 127.2))),
        );
        let builder = PathBuilder::new(geo, FallbackConfig::default());
        let mut seen = Vec::new();

        let run = builder.build_with(
            vec![
                marker("c", "p3", at(9, 20)),
                marker("a", "p1", at(9, 0)),
                marker("b", "p2", at(9, 10)),
            ],
            |p| seen.push(p.marker.id.clone()),
        );
        let cancel = async {
            // Lands between the second and third lookups.
            tokio::time::sleep(Duration::from_millis(120)).await;
            builder.supersede();
        };
        let (result, ()) = tokio::join!(run, cancel);

        assert!(matches!(result, Err(PathError::Superseded { .. })));
        assert_eq!(seen, vec!["a", "b"]);
    }

    #[test]
    fn slot_rejects_stale_render() {
        let render = |run| PathRender {
            run,
            points: vec![],
            polyline: vec![],
            bounds: None,
            center: DEFAULT_REFERENCE,
        };
        let mut slot = PathSlot::new();
        assert!(slot.offer(render(2)));
        assert!(!slot.offer(render(1)));
        assert_eq!(slot.current().map(|r| r.run), Some(2));
        assert!(slot.offer(render(3)));
        assert_eq!(slot.current().map(|r| r.run), Some(3));
    }
}
