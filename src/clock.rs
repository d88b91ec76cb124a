//! Server clock calibration.
//!
//! DESIGN
//! ======
//! The offset is `server_time - local_time`, with the local time sampled when
//! the `SYNC_TIME` frame arrived. Each calibration replaces the previous
//! offset outright. There is no smoothing or outlier rejection, so one frame
//! delayed in transit shifts the countdown by that delay until the next
//! calibration.

#[cfg(test)]
#[path = "clock_test.rs"]
mod clock_test;

use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::watch;

/// Current local wall-clock time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(duration) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(duration.as_millis()).unwrap_or(0)
}

/// Source of local time for countdown polling.
pub trait Clock: Send + Sync + 'static {
    fn now_ms(&self) -> i64;
}

/// The process wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        now_ms()
    }
}

/// Holds the latest server/local clock offset and publishes changes.
#[derive(Debug)]
pub struct ClockSync {
    offset_tx: watch::Sender<i64>,
    calibrations: u64,
}

impl ClockSync {
    #[must_use]
    pub fn new() -> Self {
        let (offset_tx, _) = watch::channel(0);
        Self { offset_tx, calibrations: 0 }
    }

    /// Record a calibration sample and return the new offset.
    ///
    /// `local_time` must be the local clock reading taken when the frame
    /// carrying `server_time` was received.
    pub fn calibrate(&mut self, server_time: i64, local_time: i64) -> i64 {
        let offset = server_time.saturating_sub(local_time);
        let previous = self.offset_tx.send_replace(offset);
        self.calibrations = self.calibrations.saturating_add(1);
        tracing::debug!(offset_ms = offset, previous_ms = previous, "clock: calibrated");
        offset
    }

    /// Signed milliseconds to add to local time to get server time.
    #[must_use]
    pub fn offset_ms(&self) -> i64 {
        *self.offset_tx.borrow()
    }

    /// Local time shifted onto the server clock.
    #[must_use]
    pub fn synced_now(&self, local_now: i64) -> i64 {
        local_now.saturating_add(self.offset_ms())
    }

    /// Number of calibrations applied since construction.
    #[must_use]
    pub fn calibrations(&self) -> u64 {
        self.calibrations
    }

    /// Observe offset changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<i64> {
        self.offset_tx.subscribe()
    }
}

impl Default for ClockSync {
    fn default() -> Self {
        Self::new()
    }
}
