//! Time source for the poll loop
//!
//! The poller never calls `Instant::now()` or `tokio::time::sleep` directly.
//! Production code uses [`TokioClock`]; tests drive [`ManualClock`], a
//! virtual timeline that only moves when the poll loop pauses between ticks
//! or when the caller advances it.

use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

/// Wall-clock and sleep capability
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> Instant;

    /// Pause for `duration` while nothing else is in flight
    async fn sleep(&self, duration: Duration);

    /// Resolve once `duration` has passed; used to bound an in-flight call
    ///
    /// Unlike [`Clock::sleep`], a virtual clock must not move time forward
    /// on its own here, since the call being bounded may still be working.
    async fn timer(&self, duration: Duration);
}

/// Real time backed by tokio's timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    async fn timer(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Virtual clock for deterministic tests
///
/// Both `sleep` and `timer` register a wake-up point on the timeline and
/// complete once virtual time reaches it. `sleep` then moves time forward
/// to its own wake-up point after yielding once; `timer` waits for someone
/// else to do so, either a `sleep` or [`ManualClock::advance`]. A status
/// query that is waiting on real I/O therefore never loses its race
/// against the per-call bound. Clones share the same timeline.
#[derive(Debug, Clone)]
pub struct ManualClock {
    inner: Arc<Mutex<ManualState>>,
}

#[derive(Debug)]
struct ManualState {
    origin: Instant,
    offset: Duration,
    sleeps: Vec<Duration>,
    waiting: Vec<(Duration, Waker)>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ManualState {
                origin: Instant::now(),
                offset: Duration::ZERO,
                sleeps: Vec::new(),
                waiting: Vec::new(),
            })),
        }
    }

    /// Move virtual time forward without recording a sleep
    ///
    /// Wakes every pending `sleep` or `timer` whose wake-up point has been
    /// reached.
    pub fn advance(&self, duration: Duration) {
        let target = self.lock().offset + duration;
        self.advance_to(target);
    }

    /// Virtual time elapsed since the clock was created
    pub fn elapsed(&self) -> Duration {
        self.lock().offset
    }

    /// Every duration passed to `sleep`, in call order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.lock().sleeps.clone()
    }

    fn advance_to(&self, target: Duration) {
        let due = {
            let mut state = self.lock();
            if target > state.offset {
                state.offset = target;
            }
            let offset = state.offset;
            let (due, pending): (Vec<_>, Vec<_>) = state
                .waiting
                .drain(..)
                .partition(|(wake_at, _)| *wake_at <= offset);
            state.waiting = pending;
            due
        };
        for (_, waker) in due {
            waker.wake();
        }
    }

    fn wake_at(&self, duration: Duration) -> WakeAt {
        WakeAt {
            clock: self.clone(),
            at: self.lock().offset + duration,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        // A poisoned lock only means a test panicked mid-update; the data is
        // still a plain offset.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Completes once the shared timeline reaches `at`
struct WakeAt {
    clock: ManualClock,
    at: Duration,
}

impl Future for WakeAt {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let mut state = self.clock.lock();
        if state.offset >= self.at {
            return Poll::Ready(());
        }
        state.waiting.push((self.at, cx.waker().clone()));
        Poll::Pending
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let state = self.lock();
        state.origin + state.offset
    }

    async fn sleep(&self, duration: Duration) {
        self.lock().sleeps.push(duration);
        let wake = self.wake_at(duration);
        let at = wake.at;
        // Let anything already runnable go first, then jump to our wake-up
        tokio::task::yield_now().await;
        self.advance_to(at);
        wake.await;
    }

    async fn timer(&self, duration: Duration) {
        self.wake_at(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_manual_clock_sleep_advances_time() {
        let clock = ManualClock::new();
        let start = clock.now();

        clock.sleep(Duration::from_secs(30)).await;
        clock.sleep(Duration::from_secs(30)).await;

        assert_eq!(clock.now() - start, Duration::from_secs(60));
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_secs(30), Duration::from_secs(30)]
        );
    }

    #[tokio::test]
    async fn test_manual_clock_clones_share_timeline() {
        let clock = ManualClock::new();
        let other = clock.clone();

        other.advance(Duration::from_secs(5));

        assert_eq!(clock.elapsed(), Duration::from_secs(5));
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_timer_waits_for_time_to_be_advanced() {
        let clock = ManualClock::new();
        let timer = clock.timer(Duration::from_secs(10));
        tokio::pin!(timer);

        // Nothing moves the timeline, so the timer stays pending
        for _ in 0..5 {
            tokio::select! {
                biased;
                _ = &mut timer => panic!("timer fired without time passing"),
                _ = tokio::task::yield_now() => {}
            }
        }
        assert_eq!(clock.elapsed(), Duration::ZERO);

        clock.advance(Duration::from_secs(10));
        timer.await;
        assert_eq!(clock.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_sleep_releases_earlier_timer() {
        let clock = ManualClock::new();

        tokio::join!(
            clock.timer(Duration::from_secs(10)),
            clock.sleep(Duration::from_secs(30))
        );

        assert_eq!(clock.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_concurrent_sleeps_share_one_timeline() {
        let clock = ManualClock::new();

        tokio::join!(
            clock.sleep(Duration::from_secs(30)),
            clock.sleep(Duration::from_secs(30))
        );

        assert_eq!(clock.elapsed(), Duration::from_secs(30));
        assert_eq!(clock.sleeps().len(), 2);
    }
}
