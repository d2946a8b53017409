//! Fixed-rate tick scheduling.

use std::time::Duration;

/// Ticks per second used when the configured rate is zero.
const MIN_TICK_RATE_HZ: u32 = 1;

/// Accumulates real elapsed time and yields discrete ticks at a fixed rate.
///
/// Every tick flushes the deferred mutation queue once, so a slow frame
/// produces several back-to-back ticks rather than a longer one.
#[derive(Debug, Clone)]
pub struct TickSchedule {
    accumulator: Duration,
    tick_duration: Duration,
    total_ticks: u64,
}

impl TickSchedule {
    /// Creates a schedule running `hz` ticks per second. A rate of zero is
    /// treated as one.
    pub fn with_tick_rate(hz: u32) -> Self {
        let hz = hz.max(MIN_TICK_RATE_HZ);
        Self {
            accumulator: Duration::ZERO,
            tick_duration: Duration::from_secs(1) / hz,
            total_ticks: 0,
        }
    }

    /// Accumulates elapsed time and returns the number of ticks to process.
    pub fn accumulate(&mut self, elapsed: Duration) -> u32 {
        self.accumulator += elapsed;
        let mut ticks = 0u32;
        while self.accumulator >= self.tick_duration {
            self.accumulator -= self.tick_duration;
            self.total_ticks += 1;
            ticks += 1;
        }
        ticks
    }

    /// Time left until the next tick is due.
    pub fn until_next_tick(&self) -> Duration {
        self.tick_duration.saturating_sub(self.accumulator)
    }

    /// Total ticks produced since creation.
    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }
}

impl Default for TickSchedule {
    fn default() -> Self {
        Self::with_tick_rate(20)
    }
}
