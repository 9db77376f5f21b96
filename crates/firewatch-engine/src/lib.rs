//! Viewport-driven fire synchronization engine.
//!
//! Keeps a 3D globe scene's fire markers in sync with what the camera is
//! looking at: camera motion is debounced and distance-gated, the settled
//! viewport is turned into a geographic bounding box, observed and
//! predicted fire data is fetched concurrently through
//! [`firewatch_feeds`], and the results are reconciled into a bounded FIFO
//! of particle-effect markers. A visibility pass swaps distant effects for
//! lightweight points, and rolling coordinate buffers plus a shared view
//! snapshot feed the chat layer.
//!
//! The renderer sits behind the [`SceneHost`] trait; this crate never
//! touches a graphics API. [`MemoryScene`] is the in-memory host used by
//! tests and the headless binary.

pub mod bounds;
pub mod context;
pub mod controller;
pub mod motion;
pub mod reconcile;
pub mod scene;
pub mod settings;
pub mod visibility;

pub use bounds::view_bounds;
pub use context::{CurrentLocation, LastPrediction, SharedViewContext, ViewSnapshot};
pub use controller::{EngineState, PendingCycle, ViewportController};
pub use motion::{Debouncer, MotionGate};
pub use reconcile::{CachedCoordinate, Reconciler, TrackedMarker, DEDUP_EPSILON_DEG};
pub use scene::{
    radial_drift, EffectHandle, EffectProfile, GeoPosition, MarkerKind, MemoryScene, PointHandle,
    SceneHost, ScreenCorner, EARTH_RADIUS_M,
};
pub use settings::EngineSettings;
pub use visibility::VisibilityLimits;
