//! Reconciles fetched fire points against the rendered marker collection.
//!
//! The reconciler owns the only mutable collections in the engine: a
//! bounded FIFO of [`TrackedMarker`]s (paired flame+smoke effect handles)
//! and two rolling buffers of recent coordinates the chat layer reads when
//! composing its hidden context payload. All mutation happens synchronously
//! inside one `reconcile` call; passes never interleave.

use std::collections::VecDeque;

use firewatch_feeds::{FirePoint, PredictedPoint, TerrainInfo, VegetationInfo};

use crate::scene::{EffectHandle, EffectProfile, GeoPosition, MarkerKind, PointHandle, SceneHost};
use crate::settings::EngineSettings;

/// Proximity radius, in degrees, within which a candidate point is treated
/// as a duplicate of an existing marker (~11 m). Absorbs floating-point
/// jitter from repeated terrain sampling.
pub const DEDUP_EPSILON_DEG: f64 = 1e-4;

/// The engine's bookkeeping record for one rendered fire.
///
/// Owns the render handles; handles are released exactly once, on eviction
/// or teardown. A `None` effect handle means that asset failed to load and
/// the marker renders degraded.
#[derive(Debug)]
pub struct TrackedMarker {
    pub(crate) position: GeoPosition,
    pub(crate) kind: MarkerKind,
    pub(crate) flame: Option<EffectHandle>,
    pub(crate) smoke: Option<EffectHandle>,
    pub(crate) point: Option<PointHandle>,
}

impl TrackedMarker {
    /// World position of the marker.
    #[must_use]
    pub fn position(&self) -> GeoPosition {
        self.position
    }

    /// Whether this marker came from the observed or predicted feed.
    #[must_use]
    pub fn kind(&self) -> MarkerKind {
        self.kind
    }
}

/// A compact coordinate snapshot for the chat consumer.
///
/// Latitude/longitude are pre-formatted to four decimals so the chat layer
/// can embed them in text without caring about float formatting.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedCoordinate {
    pub lat: String,
    pub lon: String,
    pub terrain: Option<TerrainInfo>,
    pub vegetation: Option<VegetationInfo>,
}

/// Bounded reconciliation state: markers plus the two chat-context buffers.
#[derive(Debug)]
pub struct Reconciler {
    markers: VecDeque<TrackedMarker>,
    observed_recent: VecDeque<CachedCoordinate>,
    predicted_recent: VecDeque<CachedCoordinate>,
    marker_capacity: usize,
    recent_capacity: usize,
    predicted_per_cycle: usize,
    flame_anchor_offset: f64,
}

impl Reconciler {
    /// Create a reconciler from the engine settings.
    #[must_use]
    pub fn new(settings: &EngineSettings) -> Self {
        Self {
            markers: VecDeque::with_capacity(settings.marker_capacity),
            observed_recent: VecDeque::with_capacity(settings.recent_capacity),
            predicted_recent: VecDeque::with_capacity(settings.recent_capacity),
            marker_capacity: settings.marker_capacity,
            recent_capacity: settings.recent_capacity,
            predicted_per_cycle: settings.predicted_per_cycle,
            flame_anchor_offset: settings.flame_anchor_offset,
        }
    }

    /// Apply one fetched batch to the marker collection.
    ///
    /// Observed points are processed first, then predicted points capped at
    /// the per-cycle limit in received order. Effects are materialized here
    /// so the visibility pass that follows sees the just-added markers.
    pub fn reconcile(
        &mut self,
        scene: &mut dyn SceneHost,
        observed: &[FirePoint],
        predicted: &[PredictedPoint],
    ) {
        let mut added = 0_usize;

        for point in observed {
            if self.insert_point(
                scene,
                point.latitude,
                point.longitude,
                feed_elevation(point.elevation),
                MarkerKind::Observed,
                point.terrain.clone(),
                point.vegetation.clone(),
                true,
            ) {
                added += 1;
            }
        }

        for point in predicted.iter().take(self.predicted_per_cycle) {
            if self.insert_point(
                scene,
                point.latitude,
                point.longitude,
                feed_elevation(point.elevation),
                MarkerKind::Predicted,
                point.terrain.clone(),
                point.vegetation.clone(),
                true,
            ) {
                added += 1;
            }
        }

        tracing::debug!(
            added,
            tracked = self.markers.len(),
            observed = observed.len(),
            predicted = predicted.len(),
            "reconciled batch"
        );
    }

    /// Place a seed marker with no feed context. Used at init, before any
    /// fetch has run.
    ///
    /// Seeds are scenery: they render and participate in dedup, but they
    /// never enter the recent-coordinate buffers. Those hold only fetched
    /// points the chat layer can truthfully call detections.
    pub fn insert_seed(&mut self, scene: &mut dyn SceneHost, position: &GeoPosition) {
        self.insert_point(
            scene,
            position.lat,
            position.lon,
            Some(position.height),
            MarkerKind::Observed,
            None,
            None,
            false,
        );
    }

    /// Release every marker's render handles and empty the collection.
    ///
    /// The recent-coordinate buffers deliberately survive: they are
    /// session-scoped chat context, independent of the viewer lifecycle.
    pub fn clear_markers(&mut self, scene: &mut dyn SceneHost) {
        let alive = scene.is_alive();
        while let Some(marker) = self.markers.pop_front() {
            if alive {
                release_marker(scene, marker);
            }
        }
    }

    /// Number of markers currently tracked.
    #[must_use]
    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub(crate) fn markers_mut(&mut self) -> &mut VecDeque<TrackedMarker> {
        &mut self.markers
    }

    /// Markers in insertion (= eviction) order.
    pub fn markers(&self) -> impl Iterator<Item = &TrackedMarker> {
        self.markers.iter()
    }

    /// Recent observed coordinates, oldest first.
    pub fn recent_observed(&self) -> impl Iterator<Item = &CachedCoordinate> {
        self.observed_recent.iter()
    }

    /// Recent predicted coordinates, oldest first.
    pub fn recent_predicted(&self) -> impl Iterator<Item = &CachedCoordinate> {
        self.predicted_recent.iter()
    }

    #[allow(clippy::too_many_arguments)]
    fn insert_point(
        &mut self,
        scene: &mut dyn SceneHost,
        lat: f64,
        lon: f64,
        feed_elevation: Option<f64>,
        kind: MarkerKind,
        terrain: Option<TerrainInfo>,
        vegetation: Option<VegetationInfo>,
        record_recent: bool,
    ) -> bool {
        if self.is_duplicate(lat, lon) {
            return false;
        }

        // The feed's own elevation wins; a terrain sample backs up points
        // that arrived without one; sea level is the last resort.
        let ground = feed_elevation
            .or_else(|| scene.terrain_height(lat, lon))
            .unwrap_or(0.0);
        let position = GeoPosition::new(lat, lon, ground + self.flame_anchor_offset);

        // Evict before inserting so the collection never exceeds capacity.
        if self.markers.len() >= self.marker_capacity {
            if let Some(oldest) = self.markers.pop_front() {
                release_marker(scene, oldest);
            }
        }

        let flame = scene.spawn_effect(&position, &EffectProfile::flame());
        let smoke = scene.spawn_effect(&position, &EffectProfile::smoke());
        if flame.is_none() || smoke.is_none() {
            tracing::warn!(lat, lon, "effect asset unavailable, marker degraded");
        }

        self.markers.push_back(TrackedMarker {
            position,
            kind,
            flame,
            smoke,
            point: None,
        });

        if record_recent {
            let entry = CachedCoordinate {
                lat: format!("{lat:.4}"),
                lon: format!("{lon:.4}"),
                terrain,
                vegetation,
            };
            let buffer = match kind {
                MarkerKind::Observed => &mut self.observed_recent,
                MarkerKind::Predicted => &mut self.predicted_recent,
            };
            buffer.push_back(entry);
            if buffer.len() > self.recent_capacity {
                buffer.pop_front();
            }
        }

        true
    }

    fn is_duplicate(&self, lat: f64, lon: f64) -> bool {
        self.markers.iter().any(|marker| {
            (marker.position.lat - lat).abs() < DEDUP_EPSILON_DEG
                && (marker.position.lon - lon).abs() < DEDUP_EPSILON_DEG
        })
    }
}

/// Treat the feed's zero elevation as "unknown".
fn feed_elevation(elevation: f64) -> Option<f64> {
    (elevation > 0.0).then_some(elevation)
}

fn release_marker(scene: &mut dyn SceneHost, marker: TrackedMarker) {
    if let Some(handle) = marker.flame {
        scene.remove_effect(handle);
    }
    if let Some(handle) = marker.smoke {
        scene.remove_effect(handle);
    }
    if let Some(handle) = marker.point {
        scene.remove_point(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::MemoryScene;

    fn observed(id: &str, lat: f64, lon: f64) -> FirePoint {
        let json = format!(
            r#"{{
                "id": "{id}",
                "latitude": {lat},
                "longitude": {lon},
                "acq_date": "2025-10-05",
                "satellite": "Terra",
                "confidence": 80,
                "temperature": null,
                "wind_speed": null,
                "precipitation": null
            }}"#
        );
        serde_json::from_str(&json).unwrap()
    }

    fn predicted(lat: f64, lon: f64) -> PredictedPoint {
        let json = format!(
            r#"{{
                "latitude": {lat},
                "longitude": {lon},
                "risk_level": "high"
            }}"#
        );
        serde_json::from_str(&json).unwrap()
    }

    fn small_settings() -> EngineSettings {
        EngineSettings {
            marker_capacity: 3,
            recent_capacity: 2,
            ..EngineSettings::default()
        }
    }

    #[test]
    fn test_capacity_invariant_holds_under_any_sequence() {
        let mut scene = MemoryScene::new();
        let mut reconciler = Reconciler::new(&small_settings());

        for i in 0..10 {
            let lat = f64::from(i) * 0.1;
            reconciler.reconcile(&mut scene, &[observed("f", lat, 0.0)], &[]);
            assert!(reconciler.marker_count() <= 3);
        }
        assert_eq!(reconciler.marker_count(), 3);
        // Evicted markers released their effect pairs.
        assert_eq!(scene.effect_count(), 6);
    }

    #[test]
    fn test_fifo_eviction_removes_earliest_accepted() {
        let mut scene = MemoryScene::new();
        let mut reconciler = Reconciler::new(&small_settings());

        for lat in [0.0, 0.1, 0.2, 0.3] {
            reconciler.reconcile(&mut scene, &[observed("f", lat, 0.0)], &[]);
        }

        let remaining: Vec<f64> = reconciler.markers().map(|m| m.position().lat).collect();
        assert_eq!(remaining, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_dedup_within_epsilon_is_idempotent() {
        let mut scene = MemoryScene::new();
        let mut reconciler = Reconciler::new(&EngineSettings::default());

        reconciler.reconcile(&mut scene, &[observed("a", 0.5, 0.5)], &[]);
        // Same spot twice, then jittered within ~11 m.
        reconciler.reconcile(&mut scene, &[observed("a", 0.5, 0.5)], &[]);
        reconciler.reconcile(&mut scene, &[observed("b", 0.50005, 0.49996)], &[]);

        assert_eq!(reconciler.marker_count(), 1);
        assert_eq!(reconciler.recent_observed().count(), 1);
    }

    #[test]
    fn test_just_outside_epsilon_is_distinct() {
        let mut scene = MemoryScene::new();
        let mut reconciler = Reconciler::new(&EngineSettings::default());

        reconciler.reconcile(&mut scene, &[observed("a", 0.5, 0.5)], &[]);
        reconciler.reconcile(&mut scene, &[observed("b", 0.5002, 0.5)], &[]);

        assert_eq!(reconciler.marker_count(), 2);
    }

    #[test]
    fn test_recent_buffers_are_bounded_fifo() {
        let mut scene = MemoryScene::new();
        let mut reconciler = Reconciler::new(&small_settings());

        for i in 0..5 {
            let lat = f64::from(i) * 0.1;
            reconciler.reconcile(&mut scene, &[observed("f", lat, 0.0)], &[]);
        }

        let recent: Vec<String> = reconciler.recent_observed().map(|c| c.lat.clone()).collect();
        assert_eq!(recent, vec!["0.3000", "0.4000"]);
        assert_eq!(reconciler.recent_predicted().count(), 0);
    }

    #[test]
    fn test_predicted_capped_per_cycle_in_received_order() {
        let mut scene = MemoryScene::new();
        let mut reconciler = Reconciler::new(&EngineSettings::default());

        let grid = vec![
            predicted(1.0, 1.0),
            predicted(2.0, 2.0),
            predicted(3.0, 3.0),
            predicted(4.0, 4.0),
        ];
        reconciler.reconcile(&mut scene, &[], &grid);

        assert_eq!(reconciler.marker_count(), 2);
        let lats: Vec<f64> = reconciler.markers().map(|m| m.position().lat).collect();
        assert_eq!(lats, vec![1.0, 2.0]);
        assert_eq!(reconciler.recent_predicted().count(), 2);
    }

    #[test]
    fn test_observed_buffer_untouched_by_predicted_points() {
        let mut scene = MemoryScene::new();
        let mut reconciler = Reconciler::new(&EngineSettings::default());

        reconciler.reconcile(&mut scene, &[], &[predicted(1.0, 1.0)]);
        assert_eq!(reconciler.recent_observed().count(), 0);
        assert_eq!(reconciler.recent_predicted().count(), 1);
    }

    #[test]
    fn test_cache_entry_fixed_four_decimals() {
        let mut scene = MemoryScene::new();
        let mut reconciler = Reconciler::new(&EngineSettings::default());

        reconciler.reconcile(&mut scene, &[observed("a", 0.5, 0.5)], &[]);
        let entry = reconciler.recent_observed().next().unwrap();
        assert_eq!(entry.lat, "0.5000");
        assert_eq!(entry.lon, "0.5000");
    }

    #[test]
    fn test_failed_effect_asset_degrades_without_abort() {
        let mut scene = MemoryScene::new();
        scene.set_fail_effects(true);
        let mut reconciler = Reconciler::new(&EngineSettings::default());

        reconciler.reconcile(&mut scene, &[observed("a", 0.5, 0.5)], &[]);

        // Marker tracked, cache updated, nothing spawned, no panic.
        assert_eq!(reconciler.marker_count(), 1);
        assert_eq!(scene.effect_count(), 0);
        assert_eq!(reconciler.recent_observed().count(), 1);
    }

    #[test]
    fn test_seed_markers_stay_out_of_chat_buffers() {
        let mut scene = MemoryScene::new();
        let mut reconciler = Reconciler::new(&EngineSettings::default());

        reconciler.insert_seed(&mut scene, &GeoPosition::new(-13.517, -71.967, 3390.0));

        // Rendered and deduped like any marker, but invisible to the chat
        // layer: no fetch has vouched for these coordinates.
        assert_eq!(reconciler.marker_count(), 1);
        assert_eq!(reconciler.recent_observed().count(), 0);
        assert_eq!(reconciler.recent_predicted().count(), 0);
    }

    #[test]
    fn test_clear_markers_preserves_chat_buffers() {
        let mut scene = MemoryScene::new();
        let mut reconciler = Reconciler::new(&EngineSettings::default());

        reconciler.reconcile(&mut scene, &[observed("a", 0.5, 0.5)], &[]);
        reconciler.clear_markers(&mut scene);

        assert_eq!(reconciler.marker_count(), 0);
        assert_eq!(scene.effect_count(), 0);
        assert_eq!(reconciler.recent_observed().count(), 1);
    }

    #[test]
    fn test_terrain_sample_feeds_marker_height() {
        let mut scene = MemoryScene::new();
        scene.set_terrain(Some(3390.0));
        let settings = EngineSettings::default();
        let mut reconciler = Reconciler::new(&settings);

        reconciler.reconcile(&mut scene, &[observed("a", -13.517, -71.967)], &[]);
        let marker = reconciler.markers().next().unwrap();
        assert_eq!(
            marker.position().height,
            3390.0 + settings.flame_anchor_offset
        );
    }

    #[test]
    fn test_terrain_failure_falls_back_to_feed_then_zero() {
        let mut scene = MemoryScene::new();
        scene.set_terrain(None);
        let settings = EngineSettings::default();
        let mut reconciler = Reconciler::new(&settings);

        // No feed elevation either: sea level plus the anchor offset.
        reconciler.reconcile(&mut scene, &[observed("a", 0.5, 0.5)], &[]);
        let marker = reconciler.markers().next().unwrap();
        assert_eq!(marker.position().height, settings.flame_anchor_offset);
    }
}
