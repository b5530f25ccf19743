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

//! Per-frame flow from analysis to queued suggestions.

use crate::advisor::{OptimizationEngine, QueueOutcome};
use crate::analysis::{BottleneckAnalyzer, FrameAnalysis};
use pulse_core::frame::MetricFrame;
use pulse_core::sink::PulseEvent;
use pulse_core::suggestion::Suggestion;
use std::sync::Arc;

/// Outcome of running one frame through the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Result of the analysis.
    pub analysis: FrameAnalysis,
    /// Suggestions that entered the queue because of this frame.
    pub queued: Vec<Suggestion>,
}

/// Runs frames through the analyzer and the advisor.
///
/// For each frame: analyze, report the analysis, forward every escalated
/// issue to the advisor, queue what it suggests and report new suggestions.
#[derive(Clone)]
pub struct AnalysisPipeline {
    analyzer: Arc<BottleneckAnalyzer>,
    engine: Arc<OptimizationEngine>,
}

impl AnalysisPipeline {
    pub fn new(analyzer: Arc<BottleneckAnalyzer>, engine: Arc<OptimizationEngine>) -> Self {
        Self { analyzer, engine }
    }

    pub fn analyzer(&self) -> &Arc<BottleneckAnalyzer> {
        &self.analyzer
    }

    pub fn engine(&self) -> &Arc<OptimizationEngine> {
        &self.engine
    }

    /// Processes one frame, handing every notification to `emit`.
    pub fn process(
        &self,
        frame: Arc<MetricFrame>,
        emit: &mut dyn FnMut(PulseEvent),
    ) -> PipelineOutput {
        let analysis = self.analyzer.analyze_frame(&frame);
        emit(PulseEvent::FrameAnalyzed {
            frame: Arc::clone(&frame),
            active_issues: analysis.active_issues.clone(),
        });

        let mut queued = Vec::new();
        for issue in analysis.escalated_issues() {
            let Some(suggestion) =
                self.engine
                    .generate_suggestion(issue, &frame, analysis.context)
            else {
                continue;
            };
            if self.engine.queue_suggestion(suggestion.clone()) == QueueOutcome::Queued {
                emit(PulseEvent::SuggestionGenerated(suggestion.clone()));
                queued.push(suggestion);
            }
        }

        PipelineOutput { analysis, queued }
    }
}
