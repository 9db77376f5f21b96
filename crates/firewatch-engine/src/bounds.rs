//! Derives the geographic bounding box of the current viewport.

use firewatch_feeds::GeoBounds;

use crate::scene::{SceneHost, ScreenCorner};

/// Compute the viewport's ground bounding box.
///
/// Ray-casts the top-left and bottom-right screen corners onto the terrain
/// and converts the hits to a degree rectangle. Returns `None` when either
/// ray misses the surface (extreme tilt, camera at the horizon), which the
/// caller treats as "no fetch this cycle", not as an error.
#[must_use]
pub fn view_bounds(scene: &dyn SceneHost) -> Option<GeoBounds> {
    let top_left = scene.pick_surface(ScreenCorner::TopLeft)?;
    let bottom_right = scene.pick_surface(ScreenCorner::BottomRight)?;

    Some(GeoBounds::new(
        top_left.lat,
        bottom_right.lat,
        bottom_right.lon,
        top_left.lon,
    ))
}
