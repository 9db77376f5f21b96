//! Near/far display policy for tracked markers.
//!
//! Particle effects are expensive and unreadable from altitude. After every
//! camera-settle cycle, each marker is either shown as its full effect pair
//! (camera near) or collapsed to a single colored point (camera far or
//! high). Point substitutes are cleared and regenerated wholesale each
//! pass, which makes the pass idempotent and leak-free by construction.

use std::collections::VecDeque;

use crate::reconcile::TrackedMarker;
use crate::scene::SceneHost;

/// Distance/height limits for showing full particle effects.
#[derive(Debug, Clone, Copy)]
pub struct VisibilityLimits {
    /// Camera-to-marker distance, meters, beyond which the effect hides.
    pub max_distance: f64,
    /// Camera height above terrain, meters, beyond which all effects hide.
    pub max_camera_height: f64,
}

/// Recompute every marker's display mode against the current camera.
///
/// Safe to run any number of times between state changes: a pass that
/// changes nothing visible also allocates nothing new beyond the
/// regenerated point handles.
pub fn apply(
    scene: &mut dyn SceneHost,
    markers: &mut VecDeque<TrackedMarker>,
    limits: VisibilityLimits,
) {
    let camera = scene.camera_position();
    let camera_height = scene.camera_height_above_terrain();
    let too_high = camera_height > limits.max_camera_height;

    let mut collapsed = 0_usize;

    for marker in markers.iter_mut() {
        // Full regeneration: drop the previous pass's substitute first.
        if let Some(handle) = marker.point.take() {
            scene.remove_point(handle);
        }

        let distance = camera.distance(marker.position.to_ecef());
        let show_effects = !(too_high || distance > limits.max_distance);

        if let Some(handle) = marker.flame {
            scene.set_effect_visible(handle, show_effects);
        }
        if let Some(handle) = marker.smoke {
            scene.set_effect_visible(handle, show_effects);
        }

        if !show_effects {
            marker.point = Some(scene.add_point(&marker.position, marker.kind));
            collapsed += 1;
        }
    }

    tracing::trace!(
        camera_height,
        collapsed,
        total = markers.len(),
        "visibility pass"
    );
}
