//! The renderer capability seam.
//!
//! The engine never talks to a graphics API directly. Everything it needs
//! from the 3D globe viewer (camera pose, corner picking, terrain
//! sampling, spawning and removing visual primitives) goes through the
//! [`SceneHost`] trait. A Cesium- or Bevy-backed host lives outside this
//! crate; [`MemoryScene`] is the in-memory implementation used by tests and
//! the headless binary.

use std::collections::HashMap;

use glam::DVec3;

/// Mean Earth radius in meters, for the spherical ECEF approximation.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A geographic position: degrees plus height above the ellipsoid in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPosition {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Height above the ellipsoid in meters.
    pub height: f64,
}

impl GeoPosition {
    /// Create a position from degrees and height.
    #[must_use]
    pub fn new(lat: f64, lon: f64, height: f64) -> Self {
        Self { lat, lon, height }
    }

    /// Convert to ECEF meters using a spherical Earth approximation.
    #[must_use]
    pub fn to_ecef(&self) -> DVec3 {
        let lat_rad = self.lat.to_radians();
        let lon_rad = self.lon.to_radians();
        let radius = EARTH_RADIUS_M + self.height;
        DVec3::new(
            radius * lat_rad.cos() * lon_rad.cos(),
            radius * lat_rad.cos() * lon_rad.sin(),
            radius * lat_rad.sin(),
        )
    }
}

/// Which screen corner to ray-cast when deriving the view bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenCorner {
    TopLeft,
    BottomRight,
}

/// Origin of a rendered marker, used to color its point substitute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    /// A satellite-observed detection.
    Observed,
    /// A model-predicted risk point.
    Predicted,
}

/// Handle to a spawned particle effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectHandle(pub u64);

/// Handle to a lightweight point marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointHandle(pub u64);

/// RGBA color, components in [0, 1].
pub type Rgba = [f32; 4];

/// Emission parameters for one half of a marker's effect pair.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectProfile {
    /// Texture asset path.
    pub image: &'static str,
    pub minimum_speed: f32,
    pub maximum_speed: f32,
    pub minimum_particle_life: f32,
    pub maximum_particle_life: f32,
    /// Emitter lifetime in seconds; effects loop for the session.
    pub lifetime: f32,
    pub emission_rate: f32,
    /// Square particle sprite size in pixels.
    pub image_size: f32,
    pub start_scale: f32,
    pub end_scale: f32,
    /// Circle emitter radius in meters.
    pub emitter_radius: f32,
    pub start_color: Rgba,
    pub end_color: Rgba,
}

impl EffectProfile {
    /// The flame half of a fire marker.
    #[must_use]
    pub fn flame() -> Self {
        Self {
            image: "fire.png",
            minimum_speed: 1.0,
            maximum_speed: 4.0,
            minimum_particle_life: 0.5,
            maximum_particle_life: 2.5,
            lifetime: 300.0,
            emission_rate: 20.0,
            image_size: 25.0,
            start_scale: 1.0,
            end_scale: 4.0,
            emitter_radius: 3.0,
            start_color: [1.0, 0.0, 0.0, 0.9],
            end_color: [1.0, 0.65, 0.0, 0.3],
        }
    }

    /// The smoke half of a fire marker.
    #[must_use]
    pub fn smoke() -> Self {
        Self {
            image: "smoke.png",
            minimum_speed: 0.5,
            maximum_speed: 2.0,
            minimum_particle_life: 2.0,
            maximum_particle_life: 6.0,
            lifetime: 300.0,
            emission_rate: 10.0,
            image_size: 40.0,
            start_scale: 2.0,
            end_scale: 8.0,
            emitter_radius: 5.0,
            start_color: [0.5, 0.5, 0.5, 0.5],
            end_color: [1.0, 1.0, 1.0, 0.0],
        }
    }
}

/// Per-frame radial drift applied to a simulated particle.
///
/// Pushes the particle along the local up vector (away from the Earth
/// center), which makes smoke rise and flames lick upward regardless of
/// where on the globe the emitter sits. Pure function of the particle
/// state; the host invokes it from whatever per-frame simulation hook its
/// renderer exposes.
#[must_use]
pub fn radial_drift(position: DVec3, velocity: DVec3, dt: f32, strength: f64) -> DVec3 {
    let up = position.normalize_or_zero();
    velocity + up * strength * f64::from(dt)
}

/// The rendering capability the engine drives.
///
/// All mutators must be safe to call on a dead scene (no-ops); the engine
/// additionally checks [`SceneHost::is_alive`] on teardown paths so a
/// viewer destroyed externally never panics the pipeline.
pub trait SceneHost {
    /// Whether the underlying viewer still exists.
    fn is_alive(&self) -> bool;

    /// Current camera position in ECEF meters.
    fn camera_position(&self) -> DVec3;

    /// Camera height above the local terrain, meters.
    fn camera_height_above_terrain(&self) -> f64;

    /// Ray-cast a screen corner onto the terrain surface.
    ///
    /// Returns `None` when the ray misses (camera pointed at sky/horizon);
    /// callers treat that as "skip this cycle", not as an error.
    fn pick_surface(&self, corner: ScreenCorner) -> Option<GeoPosition>;

    /// Sample terrain height at a coordinate, meters.
    ///
    /// `None` means the sample failed; callers fall back to 0.
    fn terrain_height(&self, lat: f64, lon: f64) -> Option<f64>;

    /// Spawn a particle effect at a position.
    ///
    /// Returns `None` if the effect's texture asset failed to load; a
    /// marker missing one of its effects is acceptable, an abort is not.
    fn spawn_effect(&mut self, position: &GeoPosition, profile: &EffectProfile)
    -> Option<EffectHandle>;

    /// Remove a particle effect.
    fn remove_effect(&mut self, handle: EffectHandle);

    /// Show or hide a particle effect without destroying it.
    fn set_effect_visible(&mut self, handle: EffectHandle, visible: bool);

    /// Add a lightweight point marker, colored by origin kind.
    fn add_point(&mut self, position: &GeoPosition, kind: MarkerKind) -> PointHandle;

    /// Remove a point marker.
    fn remove_point(&mut self, handle: PointHandle);

    /// Fly the camera to a destination.
    fn fly_to(&mut self, position: &GeoPosition, heading_deg: f64, pitch_deg: f64, duration: f64);
}

/// Record of a spawned effect inside [`MemoryScene`].
#[derive(Debug, Clone)]
pub struct EffectRecord {
    pub position: GeoPosition,
    pub profile: EffectProfile,
    pub visible: bool,
}

/// Record of a point marker inside [`MemoryScene`].
#[derive(Debug, Clone)]
pub struct PointRecord {
    pub position: GeoPosition,
    pub kind: MarkerKind,
}

/// An in-memory scene host.
///
/// Keeps every spawned primitive in hash maps so tests and the headless
/// binary can assert on what the engine did without a real renderer.
#[derive(Debug)]
pub struct MemoryScene {
    alive: bool,
    camera: DVec3,
    height_above_terrain: f64,
    picks: HashMap<ScreenCorner, GeoPosition>,
    terrain: Option<f64>,
    fail_effects: bool,
    next_handle: u64,
    effects: HashMap<EffectHandle, EffectRecord>,
    points: HashMap<PointHandle, PointRecord>,
}

impl MemoryScene {
    /// Create a live scene with the camera at the ECEF origin.
    #[must_use]
    pub fn new() -> Self {
        Self {
            alive: true,
            camera: DVec3::ZERO,
            height_above_terrain: 0.0,
            picks: HashMap::new(),
            terrain: Some(0.0),
            fail_effects: false,
            next_handle: 0,
            effects: HashMap::new(),
            points: HashMap::new(),
        }
    }

    /// Position the camera over a coordinate at the given height.
    pub fn set_camera(&mut self, position: &GeoPosition) {
        self.camera = position.to_ecef();
        self.height_above_terrain = position.height;
    }

    /// Configure the surface hit for a screen corner; `None` clears it.
    pub fn set_pick(&mut self, corner: ScreenCorner, hit: Option<GeoPosition>) {
        match hit {
            Some(position) => {
                self.picks.insert(corner, position);
            }
            None => {
                self.picks.remove(&corner);
            }
        }
    }

    /// Configure corner picks covering a whole bounding box.
    pub fn set_view(&mut self, north: f64, south: f64, east: f64, west: f64) {
        self.set_pick(ScreenCorner::TopLeft, Some(GeoPosition::new(north, west, 0.0)));
        self.set_pick(
            ScreenCorner::BottomRight,
            Some(GeoPosition::new(south, east, 0.0)),
        );
    }

    /// Configure the terrain sample result.
    pub fn set_terrain(&mut self, height: Option<f64>) {
        self.terrain = height;
    }

    /// Make subsequent effect spawns fail, simulating a missing asset.
    pub fn set_fail_effects(&mut self, fail: bool) {
        self.fail_effects = fail;
    }

    /// Mark the underlying viewer as destroyed.
    pub fn destroy(&mut self) {
        self.alive = false;
    }

    /// Number of live particle effects.
    #[must_use]
    pub fn effect_count(&self) -> usize {
        self.effects.len()
    }

    /// Number of live point markers.
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Look up a live effect record.
    #[must_use]
    pub fn effect(&self, handle: EffectHandle) -> Option<&EffectRecord> {
        self.effects.get(&handle)
    }

    /// Iterate live point records.
    pub fn points(&self) -> impl Iterator<Item = &PointRecord> {
        self.points.values()
    }
}

impl Default for MemoryScene {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneHost for MemoryScene {
    fn is_alive(&self) -> bool {
        self.alive
    }

    fn camera_position(&self) -> DVec3 {
        self.camera
    }

    fn camera_height_above_terrain(&self) -> f64 {
        self.height_above_terrain
    }

    fn pick_surface(&self, corner: ScreenCorner) -> Option<GeoPosition> {
        self.picks.get(&corner).copied()
    }

    fn terrain_height(&self, _lat: f64, _lon: f64) -> Option<f64> {
        self.terrain
    }

    fn spawn_effect(
        &mut self,
        position: &GeoPosition,
        profile: &EffectProfile,
    ) -> Option<EffectHandle> {
        if !self.alive || self.fail_effects {
            return None;
        }
        self.next_handle += 1;
        let handle = EffectHandle(self.next_handle);
        self.effects.insert(
            handle,
            EffectRecord {
                position: *position,
                profile: profile.clone(),
                visible: true,
            },
        );
        Some(handle)
    }

    fn remove_effect(&mut self, handle: EffectHandle) {
        self.effects.remove(&handle);
    }

    fn set_effect_visible(&mut self, handle: EffectHandle, visible: bool) {
        if let Some(record) = self.effects.get_mut(&handle) {
            record.visible = visible;
        }
    }

    fn add_point(&mut self, position: &GeoPosition, kind: MarkerKind) -> PointHandle {
        self.next_handle += 1;
        let handle = PointHandle(self.next_handle);
        self.points.insert(
            handle,
            PointRecord {
                position: *position,
                kind,
            },
        );
        handle
    }

    fn remove_point(&mut self, handle: PointHandle) {
        self.points.remove(&handle);
    }

    fn fly_to(
        &mut self,
        position: &GeoPosition,
        _heading_deg: f64,
        _pitch_deg: f64,
        _duration: f64,
    ) {
        if self.alive {
            self.set_camera(position);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ecef_round_trip_magnitude() {
        let position = GeoPosition::new(-13.517, -71.967, 5000.0);
        let ecef = position.to_ecef();
        assert!((ecef.length() - (EARTH_RADIUS_M + 5000.0)).abs() < 1e-6);
    }

    #[test]
    fn test_ecef_poles_and_equator() {
        let north_pole = GeoPosition::new(90.0, 0.0, 0.0).to_ecef();
        assert!((north_pole.z - EARTH_RADIUS_M).abs() < 1e-6);

        let equator = GeoPosition::new(0.0, 0.0, 0.0).to_ecef();
        assert!((equator.x - EARTH_RADIUS_M).abs() < 1e-6);
        assert!(equator.z.abs() < 1e-6);
    }

    #[test]
    fn test_radial_drift_pushes_outward() {
        let position = DVec3::new(EARTH_RADIUS_M, 0.0, 0.0);
        let velocity = DVec3::new(0.0, 1.0, 0.0);
        let drifted = radial_drift(position, velocity, 0.5, 2.0);
        assert!((drifted.x - 1.0).abs() < 1e-9);
        assert!((drifted.y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_radial_drift_zero_position_is_safe() {
        let drifted = radial_drift(DVec3::ZERO, DVec3::ONE, 1.0, 10.0);
        assert_eq!(drifted, DVec3::ONE);
    }

    #[test]
    fn test_memory_scene_spawn_and_remove() {
        let mut scene = MemoryScene::new();
        let position = GeoPosition::new(0.5, 0.5, 50.0);
        let handle = scene.spawn_effect(&position, &EffectProfile::flame()).unwrap();
        assert_eq!(scene.effect_count(), 1);

        scene.set_effect_visible(handle, false);
        assert!(!scene.effect(handle).unwrap().visible);

        scene.remove_effect(handle);
        assert_eq!(scene.effect_count(), 0);
    }

    #[test]
    fn test_memory_scene_failed_asset_spawns_nothing() {
        let mut scene = MemoryScene::new();
        scene.set_fail_effects(true);
        let spawned = scene.spawn_effect(&GeoPosition::new(0.0, 0.0, 0.0), &EffectProfile::smoke());
        assert!(spawned.is_none());
        assert_eq!(scene.effect_count(), 0);
    }

    #[test]
    fn test_flame_and_smoke_profiles_differ() {
        let flame = EffectProfile::flame();
        let smoke = EffectProfile::smoke();
        assert_ne!(flame.image, smoke.image);
        assert!(smoke.maximum_particle_life > flame.maximum_particle_life);
    }
}
