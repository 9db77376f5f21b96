//! Camera-motion gating and debounce.
//!
//! Camera-change events arrive continuously during interaction. Two layers
//! keep them from flooding the feeds: a trailing [`Debouncer`] that waits
//! for the camera to settle, and a [`MotionGate`] that rejects samples whose
//! displacement from the last accepted position is below a threshold. The
//! gate also owns the single in-flight cycle's cancellation token.

use glam::DVec3;
use web_time::{Duration, Instant};

use firewatch_feeds::CancelToken;

/// Trailing debounce: fires once after a burst of events has been quiet for
/// the configured window.
///
/// Poll-driven rather than timer-driven so it works identically on native,
/// WASM, and under test with a synthetic clock.
#[derive(Debug)]
pub struct Debouncer {
    quiet: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    /// Create a debouncer with the given quiet window.
    #[must_use]
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadline: None,
        }
    }

    /// Record an event, pushing the deadline out by the quiet window.
    pub fn note_event(&mut self, now: Instant) {
        self.deadline = Some(now + self.quiet);
    }

    /// Whether the quiet window has elapsed. Consumes the pending deadline
    /// when it fires, so each burst triggers at most once.
    pub fn fire_ready(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Whether an event burst is waiting on its quiet window.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Drop any pending deadline.
    pub fn reset(&mut self) {
        self.deadline = None;
    }
}

/// Suppresses redundant fetch cycles for small camera movements and owns
/// the in-flight cycle's cancellation token.
#[derive(Debug)]
pub struct MotionGate {
    threshold: f64,
    last_sampled: Option<DVec3>,
    active: Option<CancelToken>,
}

impl MotionGate {
    /// Create a gate with the given displacement threshold in meters.
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            last_sampled: None,
            active: None,
        }
    }

    /// Whether a camera position is far enough from the last accepted
    /// sample to justify a fetch. The first sample always passes.
    #[must_use]
    pub fn should_sample(&self, position: DVec3) -> bool {
        match self.last_sampled {
            Some(last) => last.distance(position) >= self.threshold,
            None => true,
        }
    }

    /// Accept a sample.
    ///
    /// Must be called *before* the async fetch begins so that camera events
    /// arriving while the fetch is in flight compare against the position
    /// being fetched, not the one before it.
    pub fn accept(&mut self, position: DVec3) {
        self.last_sampled = Some(position);
    }

    /// Begin a new fetch cycle: cancels any previous in-flight cycle and
    /// returns the fresh token.
    pub fn begin_request(&mut self) -> CancelToken {
        self.cancel_active();
        let token = CancelToken::new();
        self.active = Some(token.clone());
        token
    }

    /// Cancel the in-flight cycle, if any.
    pub fn cancel_active(&mut self) {
        if let Some(token) = self.active.take() {
            token.cancel();
        }
    }

    /// Last accepted camera position, if any.
    #[must_use]
    pub fn last_sampled(&self) -> Option<DVec3> {
        self.last_sampled
    }
}
