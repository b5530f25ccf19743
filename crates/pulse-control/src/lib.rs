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

//! # Pulse Control
//!
//! The analysis side of Pulse: rolling statistics, issue tracking, the
//! bottleneck analyzer, the optimization advisor and the background service
//! tying them together.

pub mod advisor;
pub mod analysis;
pub mod context;
pub mod metrics;
pub mod pipeline;
pub mod service;
pub mod tracker;

pub use advisor::{
    EffectivenessTrend, OptimizationEngine, OptimizationStatistics, QueueOutcome,
    SuggestionEffectiveness,
};
pub use analysis::{AnalysisStatistics, BottleneckAnalyzer, FrameAnalysis};
pub use context::{classify, ContextScale};
pub use metrics::RingBuffer;
pub use pipeline::{AnalysisPipeline, PipelineOutput};
pub use service::{PulseService, ServiceStatistics};
pub use tracker::{IssueTracker, TrackerSummary};
