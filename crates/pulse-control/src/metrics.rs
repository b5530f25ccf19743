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

//! Efficient storage for rolling telemetry samples.

/// A fixed-capacity circular buffer.
///
/// Storage is allocated once. Once full, each push overwrites the oldest
/// value. Logical index 0 is always the oldest retained value.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    data: Vec<T>,
    capacity: usize,
    // Slot holding the oldest value once the buffer is full.
    head: usize,
}

impl<T> RingBuffer<T> {
    /// Creates an empty buffer holding at most `capacity` values (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
            head: 0,
        }
    }

    /// Pushes a value, overwriting the oldest one if the buffer is full.
    pub fn push(&mut self, value: T) {
        if self.data.len() < self.capacity {
            self.data.push(value);
        } else {
            self.data[self.head] = value;
            self.head = (self.head + 1) % self.capacity;
        }
    }

    /// Returns the value at logical index `index` (0 = oldest).
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.data.len() {
            return None;
        }
        self.data.get((self.head + index) % self.data.len())
    }

    /// Returns the most recently pushed value.
    pub fn last(&self) -> Option<&T> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }

    /// Number of values currently retained.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if nothing has been pushed since creation or the last clear.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` once every slot holds a value.
    pub fn is_full(&self) -> bool {
        self.data.len() == self.capacity
    }

    /// Maximum number of values retained.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Changes the capacity, keeping the newest values that still fit.
    pub fn resize(&mut self, capacity: usize) {
        let capacity = capacity.max(1);
        self.data.rotate_left(self.head);
        self.head = 0;
        if self.data.len() > capacity {
            let excess = self.data.len() - capacity;
            self.data.drain(..excess);
        }
        self.data.shrink_to(capacity);
        self.data.reserve_exact(capacity - self.data.len());
        self.capacity = capacity;
    }

    /// Drops every value, keeping the allocation.
    pub fn clear(&mut self) {
        self.data.clear();
        self.head = 0;
    }

    /// Iterates from the oldest to the newest value.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let (newer, older) = self.data.split_at(self.head);
        older.iter().chain(newer.iter())
    }

    /// Iterates over the last `count` values, oldest first.
    pub fn latest(&self, count: usize) -> impl Iterator<Item = &T> {
        let skip = self.len().saturating_sub(count);
        self.iter().skip(skip)
    }
}

impl RingBuffer<f64> {
    /// Arithmetic mean of all values, `0.0` when empty.
    pub fn average(&self) -> f64 {
        mean(self.iter().copied())
    }

    /// Arithmetic mean of the last `count` values.
    pub fn recent_average(&self, count: usize) -> f64 {
        mean(self.latest(count).copied())
    }

    /// Population variance of all values.
    pub fn variance(&self) -> f64 {
        if self.len() < 2 {
            return 0.0;
        }
        let avg = self.average();
        self.iter().map(|v| (v - avg) * (v - avg)).sum::<f64>() / self.len() as f64
    }

    /// Sample standard deviation (Bessel's correction) of the last `count` values.
    ///
    /// Returns `0.0` with fewer than two values.
    pub fn sample_std_dev(&self, count: usize) -> f64 {
        let n = self.len().min(count);
        if n < 2 {
            return 0.0;
        }
        let avg = self.recent_average(count);
        let sum_sq: f64 = self.latest(count).map(|v| (v - avg) * (v - avg)).sum();
        (sum_sq / (n - 1) as f64).sqrt()
    }

    /// Least-squares slope of the last `count` values against their index.
    ///
    /// Positive when the values are increasing. Returns `0.0` with fewer than
    /// two values.
    pub fn trend(&self, count: usize) -> f64 {
        let n = self.len().min(count);
        if n < 2 {
            return 0.0;
        }

        let (mut sum_x, mut sum_y, mut sum_xy, mut sum_xx) = (0.0, 0.0, 0.0, 0.0);
        for (i, y) in self.latest(count).enumerate() {
            let x = i as f64;
            sum_x += x;
            sum_y += y;
            sum_xy += x * y;
            sum_xx += x * x;
        }

        let n = n as f64;
        let denominator = n * sum_xx - sum_x * sum_x;
        if denominator == 0.0 {
            return 0.0;
        }
        (n * sum_xy - sum_x * sum_y) / denominator
    }

    /// Smallest value, `None` when empty.
    pub fn min(&self) -> Option<f64> {
        self.iter().copied().reduce(f64::min)
    }

    /// Largest value, `None` when empty.
    pub fn max(&self) -> Option<f64> {
        self.iter().copied().reduce(f64::max)
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
