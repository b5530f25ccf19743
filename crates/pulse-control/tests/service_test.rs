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

//! Integration tests for the background `PulseService`.
//!
//! Verifies that:
//! - sinks see every analyzed frame in submission order
//! - queued suggestions reach both the sinks and `poll_suggestion`
//! - configuration changes apply to the next analyzed frame
//! - ratings flow back into the advisor

use pulse_control::PulseService;
use pulse_core::{
    AnalysisSink, ConfigHandle, HardwareProfile, IssueKind, MetricFrame, ProfilerConfig,
    Suggestion, SuggestionType,
};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Helper: a sink remembering everything it was told.
#[derive(Default)]
struct RecordingSink {
    frames: Mutex<Vec<(u64, Vec<IssueKind>)>>,
    suggestions: Mutex<Vec<SuggestionType>>,
}

impl RecordingSink {
    fn frame_count(&self) -> usize {
        self.frames.lock().unwrap().len()
    }

    fn issues_at(&self, timestamp_ms: u64) -> Option<Vec<IssueKind>> {
        self.frames
            .lock()
            .unwrap()
            .iter()
            .find(|(ts, _)| *ts == timestamp_ms)
            .map(|(_, issues)| issues.clone())
    }
}

impl AnalysisSink for RecordingSink {
    fn on_frame_analyzed(&self, frame: &MetricFrame, active_issues: &[IssueKind]) {
        self.frames
            .lock()
            .unwrap()
            .push((frame.timestamp_ms, active_issues.to_vec()));
    }

    fn on_suggestion_generated(&self, suggestion: &Suggestion) {
        self.suggestions
            .lock()
            .unwrap()
            .push(suggestion.suggestion_type());
    }
}

/// Helper: a started service with a recording sink attached.
fn started_service(config: ProfilerConfig) -> (PulseService, Arc<RecordingSink>) {
    pulse_telemetry::logging::init_for_tests();
    let mut service = PulseService::new(ConfigHandle::new(config), HardwareProfile::default());
    let sink = Arc::new(RecordingSink::default());
    service.subscribe(sink.clone());
    service.start().expect("threads spawn");
    (service, sink)
}

/// Helper: polls `condition` for up to five seconds.
fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

// ─────────────────────────────────────────────────────────────────────────────
// Notifications
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_sink_sees_frames_in_submission_order() {
    // ARRANGE
    let (mut service, sink) = started_service(ProfilerConfig::default());

    // ACT
    for i in 0..20u64 {
        service
            .submit_frame(MetricFrame::at(i * 50, 60))
            .expect("frame accepted");
    }

    // ASSERT
    assert!(
        wait_until(|| sink.frame_count() == 20),
        "sink should receive all 20 frames"
    );
    let timestamps: Vec<u64> = sink.frames.lock().unwrap().iter().map(|f| f.0).collect();
    let expected: Vec<u64> = (0..20).map(|i| i * 50).collect();
    assert_eq!(timestamps, expected, "frames must be analyzed in order");

    service.stop();
    assert_eq!(service.statistics().processed_frames, 20);
}

#[test]
fn test_critical_frame_reaches_sink_and_poll() {
    // ARRANGE
    let (mut service, sink) = started_service(ProfilerConfig::default());

    // ACT
    service.submit_frame(MetricFrame::at(0, 60)).unwrap();
    service.submit_frame(MetricFrame::at(50, 10)).unwrap();

    // ASSERT
    assert!(wait_until(|| !sink.suggestions.lock().unwrap().is_empty()));
    assert!(wait_until(|| sink.frame_count() == 2));
    assert_eq!(sink.issues_at(0), Some(vec![]));
    assert_eq!(sink.issues_at(50), Some(vec![IssueKind::CriticalFps]));
    assert_eq!(
        *sink.suggestions.lock().unwrap(),
        vec![SuggestionType::OptimizeGraphicsSettings]
    );

    let polled = service.poll_suggestion().expect("suggestion pending");
    assert_eq!(polled.suggestion_type(), SuggestionType::OptimizeGraphicsSettings);
    assert!(service.poll_suggestion().is_none());

    service.stop();
}

#[test]
fn test_every_sink_receives_each_frame() {
    struct CountingSink(Mutex<usize>);
    impl AnalysisSink for CountingSink {
        fn on_frame_analyzed(&self, _: &MetricFrame, _: &[IssueKind]) {
            *self.0.lock().unwrap() += 1;
        }
        fn on_suggestion_generated(&self, _: &Suggestion) {}
    }

    let (mut service, sink) = started_service(ProfilerConfig::default());
    let counter = Arc::new(CountingSink(Mutex::new(0)));
    service.subscribe(counter.clone());

    for i in 0..5u64 {
        service.submit_frame(MetricFrame::at(i, 60)).unwrap();
    }

    assert!(wait_until(|| *counter.0.lock().unwrap() == 5));
    assert!(wait_until(|| sink.frame_count() == 5));
    service.stop();
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_update_config_applies_to_next_frame() {
    // ARRANGE
    let (mut service, sink) = started_service(ProfilerConfig::default());
    service.submit_frame(MetricFrame::at(0, 20)).unwrap();
    assert!(wait_until(|| sink.frame_count() == 1));
    assert_eq!(sink.issues_at(0), Some(vec![IssueKind::LowFps]));

    // ACT
    let mut relaxed = service.config().snapshot();
    relaxed.thresholds.fps.warning = 15.0;
    relaxed.thresholds.fps.critical = 10.0;
    service.update_config(relaxed).expect("valid config");
    service.submit_frame(MetricFrame::at(50, 20)).unwrap();

    // ASSERT
    assert!(wait_until(|| sink.frame_count() == 2));
    assert_eq!(sink.issues_at(50), Some(vec![]));
    service.stop();
}

#[test]
fn test_reload_from_file_updates_running_service() {
    // ARRANGE
    let (mut service, sink) = started_service(ProfilerConfig::default());
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{ "thresholds": {{ "fps": {{ "warning": 15.0, "critical": 10.0 }} }} }}"#
    )
    .unwrap();

    // ACT
    service.config().reload_from_file(file.path()).unwrap();
    service.submit_frame(MetricFrame::at(0, 20)).unwrap();

    // ASSERT
    assert!(wait_until(|| sink.frame_count() == 1));
    assert_eq!(sink.issues_at(0), Some(vec![]));
    assert_eq!(service.config().read(|c| c.thresholds.fps.warning), 15.0);
    service.stop();
}

#[test]
fn test_disabling_suggestions_keeps_analysis_running() {
    let mut config = ProfilerConfig::default();
    config.optimization_suggestions_enabled = false;
    let (mut service, sink) = started_service(config);

    service.submit_frame(MetricFrame::at(0, 10)).unwrap();

    assert!(wait_until(|| sink.frame_count() == 1));
    assert_eq!(sink.issues_at(0), Some(vec![IssueKind::CriticalFps]));
    service.stop();
    assert!(sink.suggestions.lock().unwrap().is_empty());
    assert!(service.poll_suggestion().is_none());
}

// ─────────────────────────────────────────────────────────────────────────────
// Feedback
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_report_effectiveness_feeds_the_advisor() {
    let (mut service, _sink) = started_service(ProfilerConfig::default());

    for _ in 0..3 {
        service
            .report_effectiveness(SuggestionType::ReduceParticles, 5, "great")
            .unwrap();
    }
    assert!(service
        .report_effectiveness(SuggestionType::ReduceParticles, 9, "")
        .is_err());

    let summary = service
        .engine()
        .effectiveness(SuggestionType::ReduceParticles)
        .expect("tracked");
    assert_eq!(summary.rating_count, 3);
    assert!(summary.is_effective);
    service.stop();
}
