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

//! Error types shared across the Pulse crates.
//!
//! Errors are grouped by the boundary that raises them: frame ingestion,
//! rule evaluation, suggestion feedback and configuration loading. None of
//! them is fatal; callers degrade to reduced detection fidelity.

use crate::issue::IssueKind;
use thiserror::Error;

/// A frame was rejected at the ingestion boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameError {
    /// A reading is NaN, infinite or negative.
    #[error("metric '{field}' has an invalid value: {value}")]
    InvalidMetric {
        /// Name of the offending metric.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// Heap usage is larger than the reported heap capacity.
    #[error("heap usage {used} bytes exceeds heap capacity {max} bytes")]
    HeapOverflow {
        /// Reported heap usage.
        used: u64,
        /// Reported heap capacity.
        max: u64,
    },
    /// The frame is older than the previously accepted one.
    #[error("frame timestamp {timestamp_ms} precedes the previous frame at {previous_ms}")]
    OutOfOrder {
        /// Timestamp of the rejected frame.
        timestamp_ms: u64,
        /// Timestamp of the last accepted frame.
        previous_ms: u64,
    },
}

/// Failure to hand a frame to the analysis service.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmitError {
    /// The frame failed validation.
    #[error(transparent)]
    Invalid(#[from] FrameError),
    /// The bounded frame queue is full; the frame was dropped.
    #[error("frame queue is full, frame dropped")]
    QueueFull,
}

/// A single detection rule could not be evaluated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuleError {
    /// An input metric of the rule is not a finite number.
    #[error("metric '{metric}' is not usable: {value}")]
    InvalidMetric {
        /// Name of the metric.
        metric: &'static str,
        /// The value that was read.
        value: f64,
    },
    /// The statistics tracker backing the rule could not be locked.
    #[error("tracker for {0:?} is unavailable")]
    TrackerUnavailable(IssueKind),
}

/// A user rating was outside the accepted 1 to 5 range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EffectivenessError {
    /// The rating is not within `1..=5`.
    #[error("rating {0} is outside the range 1..=5")]
    InvalidRating(u8),
    /// The effectiveness registry could not be locked.
    #[error("effectiveness registry is unavailable")]
    Unavailable,
}

/// Invalid transition of a suggestion's user-controlled state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SuggestionError {
    /// `mark_applied` was already called.
    #[error("suggestion was already applied")]
    AlreadyApplied,
    /// Feedback was already recorded.
    #[error("suggestion was already rated")]
    AlreadyRated,
    /// The rating is not within `1..=5`.
    #[error("rating {0} is outside the range 1..=5")]
    InvalidRating(u8),
    /// The suggestion has no automatic action.
    #[error("suggestion cannot be applied automatically")]
    NotAutoApplicable,
    /// The host failed to apply the action.
    #[error(transparent)]
    Apply(#[from] ApplyError),
}

/// Error reported by a host [`SettingsApplier`](crate::suggestion::SettingsApplier).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    /// The host does not know how to perform this action.
    #[error("action not supported by host: {0}")]
    Unsupported(String),
    /// The host tried and failed.
    #[error("failed to apply action: {0}")]
    Failed(String),
}

/// Internal failure of the suggestion engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdvisorError {
    /// A shared registry lock was poisoned by a panicking thread.
    #[error("lock poisoned: {0}")]
    LockPoisoned(&'static str),
}

/// Failure to load, store or share a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the configuration file failed.
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The configuration document is not valid JSON for [`ProfilerConfig`](crate::config::ProfilerConfig).
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// The shared configuration lock was poisoned.
    #[error("config lock poisoned")]
    LockPoisoned,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_error_wraps_frame_error() {
        let err: SubmitError = FrameError::OutOfOrder {
            timestamp_ms: 5,
            previous_ms: 10,
        }
        .into();
        assert!(matches!(err, SubmitError::Invalid(FrameError::OutOfOrder { .. })));
        assert_eq!(
            err.to_string(),
            "frame timestamp 5 precedes the previous frame at 10"
        );
    }

    #[test]
    fn test_rating_error_message() {
        assert_eq!(
            EffectivenessError::InvalidRating(6).to_string(),
            "rating 6 is outside the range 1..=5"
        );
    }
}
