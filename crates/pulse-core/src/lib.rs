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

//! # Pulse Core
//!
//! Foundational crate containing the value types and interface contracts of
//! the Pulse telemetry analyzer: metric frames, the issue and suggestion
//! vocabularies, hardware profiles, configuration and error types.

#![warn(missing_docs)]

pub mod config;
pub mod context;
pub mod error;
pub mod frame;
pub mod hardware;
pub mod issue;
pub mod sink;
pub mod suggestion;

pub use config::{ConfigHandle, ConfigListener, ProfilerConfig, ThresholdPair, Thresholds};
pub use context::AnalysisContext;
pub use frame::{FrameSource, MetricFrame};
pub use hardware::{GpuType, HardwareProbe, HardwareProfile, PerformanceTier};
pub use issue::{IssueCategory, IssueKind, IssueSeverity};
pub use sink::{AnalysisSink, PulseEvent};
pub use suggestion::{
    AutoApplyAction, SettingsApplier, Suggestion, SuggestionCategory, SuggestionDraft,
    SuggestionType,
};
