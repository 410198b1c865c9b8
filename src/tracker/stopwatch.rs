use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::utils::clock::Clock;

/// Snapshot of a [Stopwatch].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopwatchState {
    pub elapsed: Duration,
    pub running: bool,
    /// Bumped on every transition. A tick only applies to the generation it was started for.
    generation: u64,
}

impl StopwatchState {
    fn idle(elapsed: Duration) -> Self {
        Self {
            elapsed,
            running: false,
            generation: 0,
        }
    }

    /// Recomputes elapsed time from `origin`. Never goes below zero and never goes backwards,
    /// even if the wall clock does.
    fn advance(&mut self, now: DateTime<Utc>, origin: DateTime<Utc>) -> bool {
        let candidate = (now - origin).max(Duration::zero());
        if candidate > self.elapsed {
            self.elapsed = candidate;
            true
        } else {
            false
        }
    }
}

struct Ticker {
    token: CancellationToken,
    _handle: JoinHandle<()>,
}

/// Idle/running stopwatch recomputing `now - origin` once per tick while running.
///
/// The ticker is a tokio task, so [Stopwatch::start] must be called inside a runtime. It is
/// cancelled by [Stopwatch::stop], [Stopwatch::reset] and when the stopwatch is dropped.
pub struct Stopwatch {
    clock: Arc<dyn Clock>,
    tick: std::time::Duration,
    state: Arc<watch::Sender<StopwatchState>>,
    ticker: Option<Ticker>,
}

impl Stopwatch {
    pub fn new(clock: Arc<dyn Clock>, tick: std::time::Duration) -> Self {
        let (state, _) = watch::channel(StopwatchState::idle(Duration::zero()));
        Self {
            clock,
            tick,
            state: Arc::new(state),
            ticker: None,
        }
    }

    pub fn state(&self) -> StopwatchState {
        *self.state.borrow()
    }

    pub fn elapsed(&self) -> Duration {
        self.state().elapsed
    }

    pub fn is_running(&self) -> bool {
        self.state().running
    }

    /// Receives every state change, including each tick that moved the elapsed time.
    pub fn subscribe(&self) -> watch::Receiver<StopwatchState> {
        self.state.subscribe()
    }

    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        let now = self.clock.time();
        let origin = now - self.elapsed();
        let mut generation = 0;
        self.state.send_modify(|state| {
            state.generation += 1;
            state.running = true;
            state.advance(now, origin);
            generation = state.generation;
        });
        self.ticker = Some(self.spawn_ticker(origin, generation));
    }

    pub fn stop(&mut self) {
        if !self.is_running() {
            return;
        }
        self.cancel_ticker();
        self.state.send_modify(|state| {
            state.generation += 1;
            state.running = false;
        });
    }

    /// Forces the idle state with the given elapsed time, whatever the previous state was.
    pub fn reset(&mut self, value: Duration) {
        self.cancel_ticker();
        self.state.send_modify(|state| {
            state.generation += 1;
            state.running = false;
            state.elapsed = value.max(Duration::zero());
        });
    }

    fn cancel_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.token.cancel();
        }
    }

    fn spawn_ticker(&self, origin: DateTime<Utc>, generation: u64) -> Ticker {
        let token = CancellationToken::new();
        let clock = self.clock.clone();
        let state = self.state.clone();
        let tick = self.tick;
        let cancelled = token.clone();

        let handle = tokio::spawn(async move {
            let mut next_tick = clock.instant();
            loop {
                next_tick += tick;
                tokio::select! {
                    _ = cancelled.cancelled() => return,
                    _ = clock.sleep_until(next_tick) => ()
                }

                let now = clock.time();
                state.send_if_modified(|state| {
                    // A tick racing with stop/reset must not touch the new state.
                    if state.generation != generation || !state.running {
                        return false;
                    }
                    state.advance(now, origin)
                });
                trace!("Stopwatch tick {now}");
            }
        });

        Ticker {
            token,
            _handle: handle,
        }
    }
}

impl Drop for Stopwatch {
    fn drop(&mut self) {
        self.cancel_ticker();
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration as StdDuration};

    use chrono::Duration;
    use tokio::time::sleep;

    use crate::utils::{clock::test_clock::TestClock, logging::TEST_LOGGING};

    use super::Stopwatch;

    const TICK: StdDuration = StdDuration::from_secs(1);

    fn stopwatch() -> (Stopwatch, TestClock) {
        let clock = TestClock::new();
        (Stopwatch::new(Arc::new(clock.clone()), TICK), clock)
    }

    #[tokio::test(start_paused = true)]
    async fn test_running_stopwatch_ticks() {
        *TEST_LOGGING;
        let (mut stopwatch, _) = stopwatch();
        stopwatch.start();
        assert!(stopwatch.is_running());
        assert_eq!(stopwatch.elapsed(), Duration::zero());

        sleep(StdDuration::from_millis(3500)).await;
        assert_eq!(stopwatch.elapsed(), Duration::seconds(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_freezes_elapsed() {
        let (mut stopwatch, _) = stopwatch();
        stopwatch.start();
        let token = stopwatch.ticker.as_ref().unwrap().token.clone();
        sleep(StdDuration::from_millis(2500)).await;

        stopwatch.stop();
        assert!(token.is_cancelled());
        assert!(!stopwatch.is_running());
        sleep(StdDuration::from_secs(10)).await;
        assert_eq!(stopwatch.elapsed(), Duration::seconds(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_preserves_elapsed() {
        let (mut stopwatch, _) = stopwatch();
        stopwatch.start();
        sleep(StdDuration::from_millis(2500)).await;
        stopwatch.stop();
        sleep(StdDuration::from_secs(5)).await;

        stopwatch.start();
        sleep(StdDuration::from_millis(3500)).await;
        assert_eq!(stopwatch.elapsed(), Duration::seconds(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_then_start_reports_value() {
        let (mut stopwatch, _) = stopwatch();
        stopwatch.reset(Duration::milliseconds(65_000));
        stopwatch.start();
        assert!(stopwatch.is_running());
        assert_eq!(stopwatch.elapsed(), Duration::milliseconds(65_000));

        sleep(StdDuration::from_millis(1500)).await;
        assert_eq!(stopwatch.elapsed(), Duration::milliseconds(66_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_when_idle_is_noop() {
        let (mut stopwatch, _) = stopwatch();
        stopwatch.reset(Duration::seconds(7));
        let receiver = stopwatch.subscribe();
        let before = stopwatch.state();

        stopwatch.stop();

        assert!(!receiver.has_changed().unwrap());
        assert_eq!(stopwatch.state(), before);
        assert!(stopwatch.ticker.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_stop_equals_single_stop() {
        let (mut once, _) = stopwatch();
        let (mut twice, _) = stopwatch();
        once.start();
        twice.start();
        sleep(StdDuration::from_millis(1500)).await;

        once.stop();
        twice.stop();
        let after_first = twice.state();
        twice.stop();

        assert_eq!(twice.state(), after_first);
        assert_eq!(once.elapsed(), twice.elapsed());
        assert_eq!(once.is_running(), twice.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_cancels_ticker() {
        let (mut stopwatch, _) = stopwatch();
        stopwatch.start();
        let token = stopwatch.ticker.as_ref().unwrap().token.clone();
        sleep(StdDuration::from_millis(1500)).await;

        stopwatch.reset(Duration::zero());
        assert!(token.is_cancelled());
        assert!(!stopwatch.is_running());

        sleep(StdDuration::from_secs(3)).await;
        assert_eq!(stopwatch.elapsed(), Duration::zero());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_ticker() {
        let (mut stopwatch, _) = stopwatch();
        stopwatch.start();
        let token = stopwatch.ticker.as_ref().unwrap().token.clone();
        let receiver = stopwatch.subscribe();

        drop(stopwatch);
        assert!(token.is_cancelled());

        sleep(StdDuration::from_secs(3)).await;
        assert_eq!(receiver.borrow().elapsed, Duration::zero());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_going_backwards_never_lowers_elapsed() {
        let (mut stopwatch, clock) = stopwatch();
        stopwatch.start();
        sleep(StdDuration::from_millis(3500)).await;
        assert_eq!(stopwatch.elapsed(), Duration::seconds(3));

        clock.shift(Duration::seconds(-10));
        sleep(StdDuration::from_secs(2)).await;
        assert_eq!(stopwatch.elapsed(), Duration::seconds(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_negative_reset_is_clamped() {
        let (mut stopwatch, _) = stopwatch();
        stopwatch.reset(Duration::seconds(-30));
        assert_eq!(stopwatch.elapsed(), Duration::zero());
        stopwatch.start();
        assert_eq!(stopwatch.elapsed(), Duration::zero());
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_monotonic_over_operation_sequence() {
        enum Op {
            Start,
            Stop,
            Reset(i64),
            Wait(u64),
        }
        let script = [
            Op::Start,
            Op::Wait(1700),
            Op::Start,
            Op::Wait(900),
            Op::Stop,
            Op::Wait(2000),
            Op::Stop,
            Op::Start,
            Op::Wait(4300),
            Op::Reset(12_000),
            Op::Wait(800),
            Op::Start,
            Op::Wait(2600),
            Op::Reset(0),
            Op::Start,
            Op::Wait(1100),
        ];

        let (mut stopwatch, _) = stopwatch();
        let mut previous = stopwatch.state();
        for op in script {
            let reset = matches!(op, Op::Reset(_));
            match op {
                Op::Start => stopwatch.start(),
                Op::Stop => stopwatch.stop(),
                Op::Reset(ms) => stopwatch.reset(Duration::milliseconds(ms)),
                Op::Wait(ms) => sleep(StdDuration::from_millis(ms)).await,
            }
            let current = stopwatch.state();
            assert!(current.elapsed >= Duration::zero());
            if previous.running && !reset {
                assert!(current.elapsed >= previous.elapsed);
            }
            if !current.running && !previous.running && !reset {
                assert_eq!(current.elapsed, previous.elapsed);
            }
            previous = current;
        }
    }
}
