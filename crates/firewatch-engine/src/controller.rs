//! The per-viewer orchestrator.
//!
//! Wires camera events through debounce, motion gating, bounds derivation,
//! the data source, reconciliation, and the visibility pass, and owns the
//! lifecycle of the whole pipeline. One controller per viewer instance; no
//! ambient globals.
//!
//! A cycle is split into [`ViewportController::begin_cycle`] (synchronous
//! gating and bounds work, issues the cancellation token) and
//! [`ViewportController::commit`] (applies a resolved outcome, re-checking
//! the token so stale results are never committed). `run_cycle` composes
//! the two around the async fetch.

use std::sync::Arc;

use chrono::Utc;
use web_time::Instant;

use firewatch_feeds::{CancelToken, FireQuery, FetchOutcome, FireSource};

use crate::bounds::view_bounds;
use crate::context::{CurrentLocation, LastPrediction, SharedViewContext, ViewSnapshot};
use crate::motion::{Debouncer, MotionGate};
use crate::reconcile::{CachedCoordinate, Reconciler};
use crate::scene::SceneHost;
use crate::settings::EngineSettings;
use crate::visibility::{self, VisibilityLimits};

/// Lifecycle state of the pipeline.
///
/// Sampling, bounds derivation, and reconciliation all happen synchronously
/// inside [`ViewportController::begin_cycle`] and
/// [`ViewportController::commit`], so they are never observable as states
/// of their own; the only phases a caller can see are idle, awaiting a
/// fetch, and torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Idle; waiting for the camera to settle somewhere new.
    Ready,
    /// A fetch cycle is in flight.
    Fetching,
    /// Torn down. Terminal.
    Destroyed,
}

/// A gated, tokened cycle waiting on its fetch outcome.
#[derive(Debug)]
pub struct PendingCycle {
    /// The query derived from the settled viewport.
    pub query: FireQuery,
    token: CancelToken,
}

impl PendingCycle {
    /// The cycle's cancellation token.
    #[must_use]
    pub fn token(&self) -> &CancelToken {
        &self.token
    }
}

/// Orchestrates the viewport-driven fire synchronization pipeline.
pub struct ViewportController<S: SceneHost> {
    scene: S,
    source: Arc<dyn FireSource>,
    settings: EngineSettings,
    gate: MotionGate,
    debouncer: Debouncer,
    reconciler: Reconciler,
    context: SharedViewContext,
    state: EngineState,
}

impl<S: SceneHost> ViewportController<S> {
    /// Construct the pipeline around a live scene.
    ///
    /// Flies the camera to the seed location, places the seed markers, and
    /// records the starting camera position so the first real cycle needs
    /// genuine movement.
    pub fn new(
        mut scene: S,
        source: Arc<dyn FireSource>,
        settings: EngineSettings,
        context: SharedViewContext,
    ) -> Self {
        scene.fly_to(&settings.seed_camera, 0.0, -30.0, 5.0);

        let mut reconciler = Reconciler::new(&settings);
        for seed in &settings.seed_fires {
            reconciler.insert_seed(&mut scene, seed);
        }
        visibility::apply(
            &mut scene,
            reconciler.markers_mut(),
            VisibilityLimits {
                max_distance: settings.max_effect_distance,
                max_camera_height: settings.max_camera_height,
            },
        );

        let mut gate = MotionGate::new(settings.motion_threshold);
        gate.accept(scene.camera_position());

        tracing::info!(
            seeds = settings.seed_fires.len(),
            capacity = settings.marker_capacity,
            "viewport controller ready"
        );

        Self {
            scene,
            source,
            debouncer: Debouncer::new(settings.debounce),
            gate,
            reconciler,
            context,
            settings,
            state: EngineState::Ready,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// The scene this controller drives.
    pub fn scene(&self) -> &S {
        &self.scene
    }

    /// Mutable access to the scene, for hosts that need to forward input.
    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    /// Recent observed coordinates for the chat consumer, oldest first.
    pub fn recent_observed(&self) -> impl Iterator<Item = &CachedCoordinate> {
        self.reconciler.recent_observed()
    }

    /// Recent predicted coordinates for the chat consumer, oldest first.
    pub fn recent_predicted(&self) -> impl Iterator<Item = &CachedCoordinate> {
        self.reconciler.recent_predicted()
    }

    /// Number of markers currently rendered.
    #[must_use]
    pub fn marker_count(&self) -> usize {
        self.reconciler.marker_count()
    }

    /// Record a camera-change event. Bursts coalesce; the pipeline only
    /// runs once the camera has been quiet for the debounce window.
    pub fn note_camera_motion(&mut self, now: Instant) {
        if self.state == EngineState::Destroyed {
            return;
        }
        self.debouncer.note_event(now);
    }

    /// Try to start a fetch cycle for a settled camera.
    ///
    /// Returns `None` (with no side effects beyond consuming the debounce
    /// deadline) when the debounce window hasn't elapsed, the movement is
    /// below the motion threshold, the corner rays miss the globe, or the
    /// scene is gone. `Some` means the motion gate has recorded the new
    /// position, any previous in-flight cycle is cancelled, and the caller
    /// owes a matching [`ViewportController::commit`].
    pub fn begin_cycle(&mut self, now: Instant) -> Option<PendingCycle> {
        if self.state == EngineState::Destroyed || !self.scene.is_alive() {
            return None;
        }
        if !self.debouncer.fire_ready(now) {
            return None;
        }

        let camera = self.scene.camera_position();
        if !self.gate.should_sample(camera) {
            tracing::trace!("camera displacement below threshold, skipping cycle");
            return None;
        }
        // Record the position before the fetch starts so events arriving
        // mid-flight compare against the position being fetched.
        self.gate.accept(camera);

        let Some(bounds) = view_bounds(&self.scene) else {
            tracing::debug!("viewport rays missed the globe, skipping cycle");
            return None;
        };

        let token = self.gate.begin_request();
        self.state = EngineState::Fetching;

        tracing::debug!(
            north = bounds.north,
            south = bounds.south,
            east = bounds.east,
            west = bounds.west,
            "fetch cycle started"
        );

        Some(PendingCycle {
            query: FireQuery::new(bounds, self.settings.date_range, self.settings.fetch_limit),
            token,
        })
    }

    /// Apply a cycle's fetch outcome.
    ///
    /// Stale outcomes, where the token was cancelled while the fetch was in
    /// flight, are discarded silently even when they carry data. Failures
    /// skip the cycle without rolling back the motion gate; the next real
    /// movement is the retry mechanism.
    pub fn commit(&mut self, cycle: PendingCycle, outcome: FetchOutcome) {
        if self.state == EngineState::Destroyed {
            return;
        }
        let superseded = cycle.token.is_cancelled();

        match outcome {
            FetchOutcome::Complete(batch) if !superseded => {
                self.reconciler
                    .reconcile(&mut self.scene, &batch.observed, &batch.predicted);
                visibility::apply(
                    &mut self.scene,
                    self.reconciler.markers_mut(),
                    VisibilityLimits {
                        max_distance: self.settings.max_effect_distance,
                        max_camera_height: self.settings.max_camera_height,
                    },
                );
                self.publish_snapshot(&cycle.query, &batch);
                self.state = EngineState::Ready;
            }
            FetchOutcome::Complete(_) | FetchOutcome::Cancelled => {
                // Expected whenever a newer cycle superseded this one.
                tracing::debug!("discarding superseded cycle");
                if !superseded {
                    self.state = EngineState::Ready;
                }
            }
            FetchOutcome::Failed(error) => {
                tracing::warn!(%error, "fetch cycle failed, skipping");
                if !superseded {
                    self.state = EngineState::Ready;
                }
            }
        }
    }

    /// Run one full cycle if the camera has settled somewhere new.
    ///
    /// Returns `true` if a cycle ran to commit (whatever its outcome).
    pub async fn run_cycle(&mut self, now: Instant) -> bool {
        let Some(cycle) = self.begin_cycle(now) else {
            return false;
        };
        let source = Arc::clone(&self.source);
        let outcome = source.fetch(&cycle.query, cycle.token.clone()).await;
        self.commit(cycle, outcome);
        true
    }

    /// Tear the pipeline down.
    ///
    /// Idempotent, and safe after the scene has been destroyed externally:
    /// render handles are only touched while the scene reports itself
    /// alive. The recent-coordinate buffers survive so the chat layer keeps
    /// its context across viewer re-creation.
    pub fn teardown(&mut self) {
        if self.state == EngineState::Destroyed {
            return;
        }
        self.gate.cancel_active();
        self.debouncer.reset();
        self.reconciler.clear_markers(&mut self.scene);
        self.state = EngineState::Destroyed;
        tracing::info!("viewport controller destroyed");
    }

    fn publish_snapshot(&self, query: &FireQuery, batch: &firewatch_feeds::FireBatch) {
        let (lat, lon) = query.bounds.center();
        let last_prediction = batch.predicted.first().map(|point| LastPrediction {
            latitude: point.latitude,
            longitude: point.longitude,
            risk: point.risk_level.clone(),
            timestamp: Utc::now(),
        });

        self.context.publish(ViewSnapshot {
            current_location: Some(CurrentLocation {
                name: "current viewport".to_string(),
                latitude: lat,
                longitude: lon,
                zoom_km: self.scene.camera_height_above_terrain() / 1000.0,
            }),
            visible_fires: batch.observed.clone(),
            bounding_box: Some(query.bounds),
            last_prediction,
        });
    }
}

impl<S: SceneHost> Drop for ViewportController<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}
