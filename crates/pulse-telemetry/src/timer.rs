// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! RAII timers for recording how long analysis passes take.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Lock-free accumulator of durations.
#[derive(Debug, Default)]
pub struct TimingStats {
    total_nanos: AtomicU64,
    samples: AtomicU64,
    last_nanos: AtomicU64,
}

impl TimingStats {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one measurement.
    pub fn record(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.total_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.last_nanos.store(nanos, Ordering::Relaxed);
        self.samples.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of measurements recorded.
    pub fn count(&self) -> u64 {
        self.samples.load(Ordering::Relaxed)
    }

    /// Mean duration, zero when nothing was recorded.
    pub fn average(&self) -> Duration {
        let samples = self.count();
        if samples == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(self.total_nanos.load(Ordering::Relaxed) / samples)
    }

    /// Most recent measurement.
    pub fn last(&self) -> Duration {
        Duration::from_nanos(self.last_nanos.load(Ordering::Relaxed))
    }

    /// Forgets all measurements.
    pub fn reset(&self) {
        self.total_nanos.store(0, Ordering::Relaxed);
        self.samples.store(0, Ordering::Relaxed);
        self.last_nanos.store(0, Ordering::Relaxed);
    }

    /// Starts a timer that records into this accumulator when dropped.
    pub fn start(&self) -> ScopedTimer<'_> {
        ScopedTimer::new(self)
    }
}

/// Times a scope and records the result in a [`TimingStats`] when dropped.
///
/// The measurement is recorded on every exit path, including early returns.
pub struct ScopedTimer<'a> {
    started: Instant,
    stats: &'a TimingStats,
}

impl<'a> ScopedTimer<'a> {
    /// Creates a timer and starts it immediately.
    pub fn new(stats: &'a TimingStats) -> Self {
        Self {
            started: Instant::now(),
            stats,
        }
    }
}

impl Drop for ScopedTimer<'_> {
    fn drop(&mut self) {
        self.stats.record(self.started.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_of_recorded_durations() {
        let stats = TimingStats::new();
        assert_eq!(stats.average(), Duration::ZERO);

        stats.record(Duration::from_millis(2));
        stats.record(Duration::from_millis(4));
        assert_eq!(stats.count(), 2);
        assert_eq!(stats.average(), Duration::from_millis(3));
        assert_eq!(stats.last(), Duration::from_millis(4));

        stats.reset();
        assert_eq!(stats.count(), 0);
    }

    #[test]
    fn test_scoped_timer_records_on_drop() {
        let stats = TimingStats::new();
        {
            let _timer = stats.start();
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(stats.count(), 1);
        assert!(stats.last() >= Duration::from_millis(5));
    }
}
