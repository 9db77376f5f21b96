//! Engine configuration.

use web_time::Duration;

use firewatch_feeds::DateRange;

use crate::scene::GeoPosition;

/// Tunables for the viewport synchronization engine.
///
/// Every threshold the pipeline consults lives here with a documented
/// default; nothing is a buried literal.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Minimum camera displacement, in ECEF meters, for a settled camera to
    /// trigger a fetch cycle.
    pub motion_threshold: f64,
    /// Quiet window the camera must hold before a cycle runs.
    pub debounce: Duration,
    /// Maximum number of tracked fire markers. Oldest-first eviction keeps
    /// GPU resource usage bounded however long the session roams.
    pub marker_capacity: usize,
    /// Maximum entries in each recent-coordinate buffer read by the chat
    /// layer. Independent of `marker_capacity`.
    pub recent_capacity: usize,
    /// Maximum predicted points materialized per reconciliation cycle, so
    /// one prediction response cannot visually drown the observed
    /// detections.
    pub predicted_per_cycle: usize,
    /// Result-count cap passed to the detection feed.
    pub fetch_limit: u32,
    /// Camera-to-marker distance, meters, beyond which a marker collapses
    /// to a point.
    pub max_effect_distance: f64,
    /// Camera height above terrain, meters, beyond which all markers
    /// collapse to points.
    pub max_camera_height: f64,
    /// Height of the flame anchor above the sampled terrain, meters.
    pub flame_anchor_offset: f64,
    /// Acquisition date range for the detection feed.
    pub date_range: DateRange,
    /// Where the camera flies on init.
    pub seed_camera: GeoPosition,
    /// Markers placed on init, before any fetch has run.
    pub seed_fires: Vec<GeoPosition>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            motion_threshold: 500.0,
            debounce: Duration::from_millis(1500),
            marker_capacity: 22,
            recent_capacity: 20,
            predicted_per_cycle: 2,
            fetch_limit: 100,
            max_effect_distance: 5000.0,
            max_camera_height: 5000.0,
            flame_anchor_offset: 50.0,
            date_range: DateRange::Last24h,
            // Opening view: the Sacred Valley near Cusco, Peru.
            seed_camera: GeoPosition::new(-13.517, -71.967, 5000.0),
            seed_fires: vec![
                GeoPosition::new(-13.517, -71.967, 3390.0),
                GeoPosition::new(-13.516, -71.965, 3441.0),
                GeoPosition::new(-13.518, -71.969, 3389.0),
            ],
        }
    }
}
