//! The data-source seam between the engine and the feeds.
//!
//! The engine talks to a [`FireSource`] trait object so tests can substitute
//! an in-memory fake, and so cancellation is an explicit, inspectable
//! outcome rather than a special error shape.

use std::{
    future::Future,
    pin::Pin,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    task::{Context, Poll, Waker},
};

use futures::future::Either;

use crate::error::Error;
use crate::types::{FirePoint, FireQuery, PredictedPoint};

#[derive(Debug, Default)]
struct TokenState {
    cancelled: AtomicBool,
    wakers: Mutex<Vec<Waker>>,
}

/// A cancellation flag shared between a fetch cycle and its superseder.
///
/// Cloning is cheap; all clones observe the same flag. The engine issues one
/// token per cycle and cancels it when a newer cycle begins. Cancellation is
/// wakeable: a fetch parked on [`CancelToken::cancelled`] (directly or via
/// [`run_until_cancelled`]) is woken and dropped mid-flight rather than left
/// running to its timeout. Fetch code must still check the token *before
/// applying results*, not just before issuing the request: a response that
/// arrives after cancellation is stale.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    state: Arc<TokenState>,
}

impl CancelToken {
    /// Create a fresh, uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the cycle this token belongs to, waking any parked waiters.
    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::SeqCst);
        let wakers = std::mem::take(
            &mut *self
                .state
                .wakers
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for waker in wakers {
            waker.wake();
        }
    }

    /// Whether this cycle has been superseded.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// A future that resolves once the token fires.
    ///
    /// Resolves immediately if the token is already cancelled.
    #[must_use]
    pub fn cancelled(&self) -> Cancelled<'_> {
        Cancelled { token: self }
    }
}

/// Future returned by [`CancelToken::cancelled`].
#[derive(Debug)]
pub struct Cancelled<'a> {
    token: &'a CancelToken,
}

impl Future for Cancelled<'_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.token.is_cancelled() {
            return Poll::Ready(());
        }
        self.token
            .state
            .wakers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(cx.waker().clone());
        // Re-check after registering: a cancel that landed between the
        // first check and the push would otherwise be missed.
        if self.token.is_cancelled() {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

/// Run `work` to completion unless the token fires first.
///
/// Returns `None` on cancellation, dropping `work` (and any in-flight
/// requests it owns) on the spot.
pub async fn run_until_cancelled<F: Future>(token: &CancelToken, work: F) -> Option<F::Output> {
    let work = std::pin::pin!(work);
    match futures::future::select(token.cancelled(), work).await {
        Either::Left(((), _)) => None,
        Either::Right((output, _)) => Some(output),
    }
}

/// The joined result of one fetch cycle.
#[derive(Debug, Clone, Default)]
pub struct FireBatch {
    /// Observed fire detections inside the queried bounds.
    pub observed: Vec<FirePoint>,
    /// Model-predicted risk points inside the queried bounds.
    pub predicted: Vec<PredictedPoint>,
}

/// Tagged outcome of a fetch cycle.
///
/// Callers branch on the tag: `Complete` commits, `Cancelled` is discarded
/// silently, `Failed` skips the cycle with a warning. Cancellation beats
/// failure when both apply — a cancelled request's transport error is noise.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Both feeds resolved and the cycle is still current.
    Complete(FireBatch),
    /// The cycle was superseded before its results could be applied.
    Cancelled,
    /// One of the feeds failed; the cycle is skipped.
    Failed(Error),
}

impl FetchOutcome {
    /// Whether the outcome carries applicable results.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, FetchOutcome::Complete(_))
    }

    /// Whether the cycle was superseded.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchOutcome::Cancelled)
    }
}

/// Future type for [`FireSource::fetch`].
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = FetchOutcome> + Send + 'a>>;

/// A source of observed and predicted fire data for a bounding box.
///
/// Implemented by [`crate::FeedClient`] over HTTP and by in-memory fakes in
/// engine tests.
pub trait FireSource: Send + Sync {
    /// Fetch both result sets for the query, honoring the token.
    ///
    /// Implementations must join the two feeds (not race them) and must
    /// resolve to [`FetchOutcome::Cancelled`] if the token fires at any
    /// point, even if both feeds succeeded.
    fn fetch(&self, query: &FireQuery, token: CancelToken) -> FetchFuture<'_>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_starts_uncancelled() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_cancel_is_visible_to_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_cancelled_future_wakes_on_cancel() {
        let waker = futures::task::noop_waker();
        let mut cx = Context::from_waker(&waker);

        let token = CancelToken::new();
        let mut fut = token.cancelled();
        assert!(Pin::new(&mut fut).poll(&mut cx).is_pending());

        token.cancel();
        assert!(Pin::new(&mut fut).poll(&mut cx).is_ready());
    }

    #[test]
    fn test_cancelled_future_resolves_immediately_when_already_fired() {
        let waker = futures::task::noop_waker();
        let mut cx = Context::from_waker(&waker);

        let token = CancelToken::new();
        token.cancel();
        let mut fut = token.cancelled();
        assert!(Pin::new(&mut fut).poll(&mut cx).is_ready());
    }

    #[tokio::test]
    async fn test_run_until_cancelled_completes_work() {
        let token = CancelToken::new();
        let result = run_until_cancelled(&token, async { 42 }).await;
        assert_eq!(result, Some(42));
    }

    #[tokio::test]
    async fn test_run_until_cancelled_drops_pending_work() {
        let token = CancelToken::new();
        let remote = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            remote.cancel();
        });

        // The work never resolves on its own; only the cancel wake can
        // finish this await.
        let result = run_until_cancelled(&token, std::future::pending::<()>()).await;
        assert!(result.is_none());
    }

    #[test]
    fn test_outcome_predicates() {
        assert!(FetchOutcome::Complete(FireBatch::default()).is_complete());
        assert!(FetchOutcome::Cancelled.is_cancelled());
        let failed = FetchOutcome::Failed(Error::InvalidData {
            context: "test",
            detail: "x".to_string(),
        });
        assert!(!failed.is_complete());
        assert!(!failed.is_cancelled());
    }
}
