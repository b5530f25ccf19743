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

//! Outbound notifications for external persistence.

use crate::frame::MetricFrame;
use crate::issue::IssueKind;
use crate::suggestion::Suggestion;
use std::sync::Arc;

/// Subscriber to analysis results, typically a durable store.
///
/// Notifications are fire-and-forget. They are delivered from a background
/// thread and the analysis pipeline never waits on a sink.
pub trait AnalysisSink: Send + Sync {
    /// A frame finished analysis with the given active issues.
    fn on_frame_analyzed(&self, frame: &MetricFrame, active_issues: &[IssueKind]);

    /// A suggestion was generated and queued.
    fn on_suggestion_generated(&self, suggestion: &Suggestion);
}

/// A notification waiting to be delivered to the sinks.
#[derive(Debug, Clone)]
pub enum PulseEvent {
    /// Result of analysing one frame.
    FrameAnalyzed {
        /// The analyzed frame.
        frame: Arc<MetricFrame>,
        /// Issues active in that frame.
        active_issues: Vec<IssueKind>,
    },
    /// A suggestion entered the queue.
    SuggestionGenerated(Suggestion),
}

impl PulseEvent {
    /// Delivers this event to one sink.
    pub fn dispatch(&self, sink: &dyn AnalysisSink) {
        match self {
            PulseEvent::FrameAnalyzed {
                frame,
                active_issues,
            } => sink.on_frame_analyzed(frame, active_issues),
            PulseEvent::SuggestionGenerated(suggestion) => sink.on_suggestion_generated(suggestion),
        }
    }
}
