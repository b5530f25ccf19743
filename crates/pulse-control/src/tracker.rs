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

//! Per-issue accumulation of samples and occurrence history.
//!
//! One [`IssueTracker`] exists for every [`IssueKind`]. The analysis worker is
//! the only writer; statistics getters may be called concurrently from any
//! thread. All buffers sit behind a single `RwLock`, so a reader never sees a
//! half-written slot and [`IssueTracker::reset`] is atomic for observers.

use crate::metrics::RingBuffer;
use pulse_core::issue::IssueKind;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

/// Capacity of the occurrence and resolution timestamp buffers.
pub const TIMESTAMP_BUFFER_SIZE: usize = 500;
/// How long computed mean/std-dev values are reused.
const STATS_CACHE_TTL: Duration = Duration::from_secs(1);
const MS_PER_MINUTE: f64 = 60_000.0;

#[derive(Debug)]
struct TrackerState {
    values: RingBuffer<f64>,
    occurrences: RingBuffer<u64>,
    resolutions: RingBuffer<u64>,
    first_occurrence: Option<u64>,
    last_occurrence: Option<u64>,
    last_resolution: Option<u64>,
    total_duration_ms: u64,
}

impl TrackerState {
    fn new(value_capacity: usize) -> Self {
        Self {
            values: RingBuffer::with_capacity(value_capacity),
            occurrences: RingBuffer::with_capacity(TIMESTAMP_BUFFER_SIZE),
            resolutions: RingBuffer::with_capacity(TIMESTAMP_BUFFER_SIZE),
            first_occurrence: None,
            last_occurrence: None,
            last_resolution: None,
            total_duration_ms: 0,
        }
    }

    fn is_active(&self) -> bool {
        match (self.last_occurrence, self.last_resolution) {
            (Some(occurrence), Some(resolution)) => occurrence > resolution,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedStats {
    mean: f64,
    std_dev: f64,
    computed_at: Instant,
}

/// Serializable snapshot of a tracker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackerSummary {
    /// Tracked issue.
    pub kind: IssueKind,
    /// Values currently retained.
    pub sample_count: usize,
    /// Mean of retained values.
    pub mean: f64,
    /// Sample standard deviation of retained values.
    pub std_dev: f64,
    /// Frames in which the issue was active.
    pub total_occurrences: u64,
    /// Occurrences per minute.
    pub occurrence_frequency: f64,
    /// Mean length of an active period in milliseconds.
    pub average_duration_ms: f64,
    /// Whether the issue is active right now.
    pub currently_active: bool,
}

/// Accumulator of samples, occurrences and resolutions for one issue kind.
#[derive(Debug)]
pub struct IssueTracker {
    kind: IssueKind,
    state: RwLock<TrackerState>,
    total_occurrences: AtomicU64,
    cache: Mutex<Option<CachedStats>>,
}

impl IssueTracker {
    /// Creates a tracker keeping at most `value_capacity` samples.
    pub fn new(kind: IssueKind, value_capacity: usize) -> Self {
        Self {
            kind,
            state: RwLock::new(TrackerState::new(value_capacity)),
            total_occurrences: AtomicU64::new(0),
            cache: Mutex::new(None),
        }
    }

    /// The issue kind this tracker belongs to.
    pub fn kind(&self) -> IssueKind {
        self.kind
    }

    // A panic cannot happen while a guard is held, so poisoned state is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, TrackerState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, TrackerState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn invalidate_cache(&self) {
        *self.cache.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Appends a sample and invalidates the cached statistics.
    pub fn add_data_point(&self, value: f64) {
        self.write().values.push(value);
        self.invalidate_cache();
    }

    /// Maximum number of samples retained.
    pub fn value_capacity(&self) -> usize {
        self.read().values.capacity()
    }

    /// Changes how many samples are retained, keeping the newest ones.
    pub fn set_value_capacity(&self, capacity: usize) {
        self.write().values.resize(capacity);
        self.invalidate_cache();
    }

    /// Records that the issue was active at `timestamp_ms`.
    pub fn record_occurrence(&self, timestamp_ms: u64) {
        let mut state = self.write();
        state.occurrences.push(timestamp_ms);
        if state.first_occurrence.is_none() {
            state.first_occurrence = Some(timestamp_ms);
        }
        state.last_occurrence = Some(timestamp_ms);
        self.total_occurrences.fetch_add(1, Ordering::Relaxed);
    }

    /// Records that the issue was not active at `timestamp_ms`.
    ///
    /// Ignored until the first occurrence. When this ends an active period,
    /// the time since the last occurrence is added to the total active duration.
    pub fn record_resolution(&self, timestamp_ms: u64) {
        let mut state = self.write();
        let Some(last_occurrence) = state.last_occurrence else {
            return;
        };

        if state.is_active() && timestamp_ms > last_occurrence {
            state.total_duration_ms += timestamp_ms - last_occurrence;
        }
        state.resolutions.push(timestamp_ms);
        state.last_resolution = Some(timestamp_ms);
    }

    fn cached_stats(&self) -> CachedStats {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(stats) = *cache {
            if stats.computed_at.elapsed() < STATS_CACHE_TTL {
                return stats;
            }
        }

        let state = self.read();
        let stats = CachedStats {
            mean: state.values.average(),
            std_dev: state.values.sample_std_dev(state.values.len()),
            computed_at: Instant::now(),
        };
        *cache = Some(stats);
        stats
    }

    /// Mean of all retained samples.
    pub fn mean_value(&self) -> f64 {
        self.cached_stats().mean
    }

    /// Sample standard deviation of all retained samples, `0.0` below two samples.
    pub fn standard_deviation(&self) -> f64 {
        self.cached_stats().std_dev
    }

    /// Mean and sample standard deviation of the last `window` samples.
    pub fn window_statistics(&self, window: usize) -> (f64, f64) {
        let state = self.read();
        (
            state.values.recent_average(window),
            state.values.sample_std_dev(window),
        )
    }

    /// Mean of the last `window` samples.
    pub fn recent_average(&self, window: usize) -> f64 {
        self.read().values.recent_average(window)
    }

    /// Least-squares slope of the last `window` samples.
    pub fn trend(&self, window: usize) -> f64 {
        self.read().values.trend(window)
    }

    /// Most recent sample.
    pub fn latest_value(&self) -> Option<f64> {
        self.read().values.last().copied()
    }

    /// Number of retained samples.
    pub fn sample_count(&self) -> usize {
        self.read().values.len()
    }

    /// Frames in which the issue was active.
    pub fn total_occurrences(&self) -> u64 {
        self.total_occurrences.load(Ordering::Relaxed)
    }

    /// Occurrences per minute between the first and the last occurrence.
    pub fn occurrence_frequency(&self) -> f64 {
        let state = self.read();
        let (Some(first), Some(last)) = (state.first_occurrence, state.last_occurrence) else {
            return 0.0;
        };
        let span_minutes = last.saturating_sub(first) as f64 / MS_PER_MINUTE;
        if span_minutes <= 0.0 {
            return 0.0;
        }
        self.total_occurrences() as f64 / span_minutes
    }

    /// Total time spent active, in milliseconds.
    pub fn total_duration_ms(&self) -> u64 {
        self.read().total_duration_ms
    }

    /// Total active time divided by the number of occurrences.
    pub fn average_duration_ms(&self) -> f64 {
        let occurrences = self.total_occurrences();
        if occurrences == 0 {
            return 0.0;
        }
        self.total_duration_ms() as f64 / occurrences as f64
    }

    /// `true` while the last occurrence is newer than the last resolution.
    pub fn is_currently_active(&self) -> bool {
        self.read().is_active()
    }

    /// Timestamp of the first recorded occurrence.
    pub fn first_occurrence(&self) -> Option<u64> {
        self.read().first_occurrence
    }

    /// Timestamp of the latest occurrence.
    pub fn last_occurrence(&self) -> Option<u64> {
        self.read().last_occurrence
    }

    /// Timestamp of the latest resolution.
    pub fn last_resolution(&self) -> Option<u64> {
        self.read().last_resolution
    }

    /// Milliseconds elapsed between the last occurrence and `now_ms`.
    pub fn time_since_last_occurrence(&self, now_ms: u64) -> Option<u64> {
        self.last_occurrence().map(|ts| now_ms.saturating_sub(ts))
    }

    /// Milliseconds elapsed between the last resolution and `now_ms`.
    pub fn time_since_last_resolution(&self, now_ms: u64) -> Option<u64> {
        self.last_resolution().map(|ts| now_ms.saturating_sub(ts))
    }

    /// Occurrence timestamps still retained, oldest first.
    pub fn occurrence_history(&self) -> Vec<u64> {
        self.read().occurrences.iter().copied().collect()
    }

    /// Resolution timestamps still retained, oldest first.
    pub fn resolution_history(&self) -> Vec<u64> {
        self.read().resolutions.iter().copied().collect()
    }

    /// Clears every buffer and counter.
    pub fn reset(&self) {
        let mut state = self.write();
        let capacity = state.values.capacity();
        *state = TrackerState::new(capacity);
        self.total_occurrences.store(0, Ordering::Relaxed);
        drop(state);
        self.invalidate_cache();
    }

    /// Snapshot of the tracker's statistics.
    pub fn summary(&self) -> TrackerSummary {
        TrackerSummary {
            kind: self.kind,
            sample_count: self.sample_count(),
            mean: self.mean_value(),
            std_dev: self.standard_deviation(),
            total_occurrences: self.total_occurrences(),
            occurrence_frequency: self.occurrence_frequency(),
            average_duration_ms: self.average_duration_ms(),
            currently_active: self.is_currently_active(),
        }
    }
}
