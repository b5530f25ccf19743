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

// Pulse Sandbox
// Replays a synthetic play session through the analysis service.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use pulse_control::PulseService;
use pulse_core::{
    AnalysisSink, ConfigHandle, HardwareProbe, IssueKind, MetricFrame, ProfilerConfig, Suggestion,
};
use pulse_telemetry::SysinfoProbe;

const FRAME_INTERVAL_MS: u64 = 50;
const SESSION_FRAMES: u64 = 900;

/// Logs every change in the set of active issues.
#[derive(Default)]
struct ConsoleSink {
    last: std::sync::Mutex<Vec<IssueKind>>,
}

impl AnalysisSink for ConsoleSink {
    fn on_frame_analyzed(&self, frame: &MetricFrame, active_issues: &[IssueKind]) {
        let mut last = self
            .last
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if last.as_slice() != active_issues {
            log::info!(
                "[{:>6}ms] fps={:<3} issues: {:?}",
                frame.timestamp_ms,
                frame.fps,
                active_issues
            );
            *last = active_issues.to_vec();
        }
    }

    fn on_suggestion_generated(&self, suggestion: &Suggestion) {
        log::info!(
            "New suggestion (priority {}): {} for {:?}",
            suggestion.priority(),
            suggestion.title(),
            suggestion.issue()
        );
    }
}

/// One frame of the scripted session.
///
/// The session is steady at first, then hits a render-heavy area, then
/// slowly leaks heap.
fn session_frame(i: u64) -> MetricFrame {
    let mut frame = MetricFrame::at(i * FRAME_INTERVAL_MS, 60);
    frame.memory.heap_max_bytes = 4 * 1024 * 1024 * 1024;
    frame.memory.heap_used_bytes = frame.memory.heap_max_bytes / 2;
    frame.render.render_time_ms = 9.0;
    frame.render.draw_calls = 1_200;
    frame.world.render_distance = 12;
    frame.world.simulation_distance = 10;
    frame.world.loaded_chunks = 400;
    frame.entities.total_entities = 120;
    frame.entities.rendered_entities = 60;

    match i {
        200..=299 => {
            frame.fps = 12;
            frame.render.render_time_ms = 55.0;
            frame.render.draw_calls = 4_500;
        }
        300.. => {
            let growth = (i - 300) * (frame.memory.heap_max_bytes / 2_000);
            frame.memory.heap_used_bytes += growth;
        }
        _ => {}
    }
    frame
}

fn load_config() -> Result<ProfilerConfig> {
    match std::env::args().nth(1) {
        Some(path) => ProfilerConfig::from_file(&path)
            .with_context(|| format!("failed to load configuration from {path}")),
        None => Ok(ProfilerConfig::default()),
    }
}

fn main() -> Result<()> {
    pulse_telemetry::logging::init("info").context("failed to initialise logging")?;

    let probe = SysinfoProbe::new();
    let hardware = probe.profile();
    log::info!(
        "Host: {} cores, {} GiB, tier {:?}",
        hardware.cpu_cores,
        hardware.total_memory_gb,
        hardware.performance_tier()
    );

    let config = ConfigHandle::new(load_config()?);
    let mut service = PulseService::new(config, hardware);
    service.subscribe(Arc::new(ConsoleSink::default()));
    service.start().context("failed to start the Pulse service")?;

    for i in 0..SESSION_FRAMES {
        if let Err(e) = service.submit_frame(session_frame(i)) {
            log::warn!("Frame {} rejected: {}", i, e);
        }
        if i % 100 == 99 {
            thread::sleep(Duration::from_millis(20));
        }
    }

    // Give the worker time to drain before reading the queue.
    while service.statistics().queued_frames > 0 {
        thread::sleep(Duration::from_millis(10));
    }

    while let Some(suggestion) = service.poll_suggestion() {
        log::info!("Applying '{}'", suggestion.title());
        for step in suggestion.steps() {
            log::info!("  - {}", step);
        }
        service.report_effectiveness(suggestion.suggestion_type(), 4, "sandbox replay")?;
    }

    service.stop();
    let stats = serde_json::to_string_pretty(&service.statistics())
        .context("failed to serialise statistics")?;
    println!("{stats}");
    Ok(())
}
