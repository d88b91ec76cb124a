//! Turn countdown derived from the session deadline and the clock offset.
//!
//! DESIGN
//! ======
//! The countdown is a pure read-side derivation:
//! `remaining = max(0, ceil((end_at - (now + offset)) / 1000))`.
//! [`TurnTimer`] recomputes it on a fixed sub-second period and whenever the
//! session changes, and publishes through a watch channel only when the value
//! differs. It never writes to the store or the clock, so its cadence has no
//! ordering relationship with frame processing.
//!
//! LIFECYCLE
//! =========
//! The polling task is owned by the [`TurnTimer`] handle and aborted when the
//! handle is stopped or dropped. It also ends on its own once the session
//! channel closes.

#[cfg(test)]
#[path = "timer_test.rs"]
mod timer_test;

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::clock::Clock;
use crate::store::GameSession;

const URGENT_SECS: u64 = 5;
const CRITICAL_SECS: u64 = 3;

/// Whole seconds left before `end_at`, or `None` when there is no deadline.
#[must_use]
pub fn remaining_secs(end_at: Option<i64>, local_now: i64, offset_ms: i64) -> Option<u64> {
    let end_at = end_at?;
    let server_now = local_now.saturating_add(offset_ms);
    let diff = end_at.saturating_sub(server_now);
    Some(u64::try_from(diff).map_or(0, |ms| ms.div_ceil(1000)))
}

/// Share of the nominal turn still left, 0..=100.
#[must_use]
pub fn progress_percent(remaining: u64, turn_secs: u64) -> u8 {
    if turn_secs == 0 {
        return 0;
    }
    let pct = remaining.saturating_mul(100) / turn_secs;
    u8::try_from(pct.min(100)).unwrap_or(100)
}

/// How pressing the countdown is, for display.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Urgency {
    Calm,
    Urgent,
    Critical,
}

impl Urgency {
    #[must_use]
    pub fn for_remaining(secs: u64) -> Self {
        if secs <= CRITICAL_SECS {
            Self::Critical
        } else if secs <= URGENT_SECS {
            Self::Urgent
        } else {
            Self::Calm
        }
    }
}

/// Handle to the countdown polling task.
#[derive(Debug)]
pub struct TurnTimer {
    countdown_rx: watch::Receiver<Option<u64>>,
    task: JoinHandle<()>,
}

impl TurnTimer {
    /// Start polling. Must be called from within a Tokio runtime.
    pub fn spawn<C: Clock>(
        sessions: watch::Receiver<Option<GameSession>>,
        offsets: watch::Receiver<i64>,
        clock: C,
        period: Duration,
    ) -> Self {
        let (countdown_tx, countdown_rx) = watch::channel(None);
        let task = tokio::spawn(poll_countdown(sessions, offsets, clock, period, countdown_tx));
        tracing::debug!(?period, "timer: started");
        Self { countdown_rx, task }
    }

    /// Observe countdown changes. `None` means no active deadline.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<u64>> {
        self.countdown_rx.clone()
    }

    #[must_use]
    pub fn current(&self) -> Option<u64> {
        *self.countdown_rx.borrow()
    }

    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for TurnTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn poll_countdown<C: Clock>(
    mut sessions: watch::Receiver<Option<GameSession>>,
    offsets: watch::Receiver<i64>,
    clock: C,
    period: Duration,
    countdown_tx: watch::Sender<Option<u64>>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = sessions.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }

        let end_at = sessions.borrow().as_ref().and_then(|s| s.end_at);
        let offset = *offsets.borrow();
        let remaining = remaining_secs(end_at, clock.now_ms(), offset);
        countdown_tx.send_if_modified(|current| {
            if *current == remaining {
                return false;
            }
            *current = remaining;
            true
        });
    }
    tracing::debug!("timer: session channel closed; stopping");
}
