//! Periodic trigger driving keepalive writes.
//!
//! The keepalive task only needs "wait for the next tick", "push the next tick
//! out by a full interval", and "stop". Abstracting that behind [`Ticker`]
//! lets tests drive ticks by hand instead of waiting on the clock.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;

/// A resettable periodic trigger.
#[async_trait]
pub trait Ticker: Send + Sync {
    /// Wait for the next tick. Never completes once stopped.
    async fn tick(&self);

    /// Restart the countdown so the next tick fires `period` from now.
    ///
    /// A tick that has already fired is not taken back.
    fn reset(&self, period: Duration);

    /// Stop ticking.
    fn stop(&self);
}

/// Creates a ticker for a given period.
pub type TickerFactory = Arc<dyn Fn(Duration) -> Arc<dyn Ticker> + Send + Sync>;

/// Factory for the production [`IntervalTicker`].
pub fn interval_ticker_factory() -> TickerFactory {
    Arc::new(|period| Arc::new(IntervalTicker::new(period)) as Arc<dyn Ticker>)
}

/// [`Ticker`] backed by `tokio::time`.
///
/// A zero period, or one too large to add to the clock, never fires.
#[derive(Debug)]
pub struct IntervalTicker {
    state: Mutex<TickerState>,
    changed: Notify,
}

#[derive(Debug)]
struct TickerState {
    period: Duration,
    deadline: Option<Instant>,
    /// An elapsed deadline was moved by `reset` before `tick` consumed it.
    pending: bool,
    stopped: bool,
}

enum Next {
    Fire,
    Wait(Instant),
    Idle,
}

fn next_deadline(period: Duration) -> Option<Instant> {
    if period.is_zero() {
        return None;
    }
    Instant::now().checked_add(period)
}

impl IntervalTicker {
    /// Create a ticker whose first tick is one `period` from now.
    pub fn new(period: Duration) -> Self {
        Self {
            state: Mutex::new(TickerState {
                period,
                deadline: next_deadline(period),
                pending: false,
                stopped: false,
            }),
            changed: Notify::new(),
        }
    }

    fn next(&self) -> Next {
        let mut state = self.state.lock();
        if state.stopped {
            return Next::Idle;
        }
        if state.pending {
            state.pending = false;
            return Next::Fire;
        }
        state.deadline.map_or(Next::Idle, Next::Wait)
    }

    /// Consume the tick for `deadline` if nothing moved it meanwhile.
    fn fire(&self, deadline: Instant) -> bool {
        let mut state = self.state.lock();
        if state.stopped || state.deadline != Some(deadline) {
            return false;
        }
        state.deadline = next_deadline(state.period);
        true
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&self) {
        loop {
            let changed = self.changed.notified();
            match self.next() {
                Next::Fire => return,
                Next::Wait(deadline) => {
                    tokio::select! {
                        () = tokio::time::sleep_until(deadline) => {
                            if self.fire(deadline) {
                                return;
                            }
                        }
                        () = changed => {}
                    }
                }
                Next::Idle => changed.await,
            }
        }
    }

    fn reset(&self, period: Duration) {
        {
            let mut state = self.state.lock();
            let now = Instant::now();
            if !state.stopped && state.deadline.is_some_and(|d| d <= now) {
                state.pending = true;
            }
            state.period = period;
            state.deadline = next_deadline(period);
            state.stopped = false;
        }
        self.changed.notify_waiters();
    }

    fn stop(&self) {
        {
            let mut state = self.state.lock();
            state.stopped = true;
            state.pending = false;
        }
        self.changed.notify_waiters();
    }
}
