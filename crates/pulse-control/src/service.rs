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

//! Central service running the analysis off the producer's thread.

use crate::advisor::{OptimizationEngine, OptimizationStatistics};
use crate::analysis::{AnalysisStatistics, BottleneckAnalyzer};
use crate::pipeline::AnalysisPipeline;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use pulse_core::config::{ConfigHandle, ProfilerConfig};
use pulse_core::error::{ConfigError, EffectivenessError, FrameError, SubmitError};
use pulse_core::frame::MetricFrame;
use pulse_core::hardware::HardwareProfile;
use pulse_core::sink::{AnalysisSink, PulseEvent};
use pulse_core::suggestion::{Suggestion, SuggestionType};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread;
use std::time::{Duration, Instant};

/// How long an idle worker waits before re-checking the running flag.
const IDLE_POLL: Duration = Duration::from_millis(10);

type SinkList = Arc<RwLock<Vec<Arc<dyn AnalysisSink>>>>;

/// Counters of the service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceStatistics {
    /// Frames accepted by `submit_frame`.
    pub accepted_frames: u64,
    /// Frames analyzed by the worker.
    pub processed_frames: u64,
    /// Frames rejected because the queue was full.
    pub dropped_frames: u64,
    /// Notifications dropped because the notifier lagged behind.
    pub dropped_notifications: u64,
    /// Frames waiting for analysis.
    pub queued_frames: usize,
    /// Analyzer figures.
    pub analysis: AnalysisStatistics,
    /// Advisor figures.
    pub optimization: OptimizationStatistics,
}

struct Worker {
    name: &'static str,
    handle: thread::JoinHandle<()>,
    done: Receiver<()>,
}

/// The Pulse service.
///
/// Producers hand frames over with [`submit_frame`](Self::submit_frame),
/// which never blocks. One worker thread analyzes frames in submission order
/// and a second one delivers notifications to the registered sinks.
pub struct PulseService {
    config: ConfigHandle,
    pipeline: AnalysisPipeline,
    sinks: SinkList,
    running: Arc<AtomicBool>,
    notifying: Arc<AtomicBool>,
    frame_tx: Sender<MetricFrame>,
    frame_rx: Receiver<MetricFrame>,
    event_tx: Sender<PulseEvent>,
    event_rx: Receiver<PulseEvent>,
    last_timestamp: Mutex<Option<u64>>,
    accepted: AtomicU64,
    dropped: AtomicU64,
    processed: Arc<AtomicU64>,
    dropped_events: Arc<AtomicU64>,
    workers: Vec<Worker>,
}

impl PulseService {
    /// Creates a stopped service with fresh analysis state.
    pub fn new(config: ConfigHandle, hardware: HardwareProfile) -> Self {
        let analyzer = Arc::new(BottleneckAnalyzer::new(config.clone()));
        let engine = Arc::new(OptimizationEngine::new(config.clone(), hardware));
        Self::with_components(config, analyzer, engine)
    }

    /// Creates a stopped service around existing components.
    pub fn with_components(
        config: ConfigHandle,
        analyzer: Arc<BottleneckAnalyzer>,
        engine: Arc<OptimizationEngine>,
    ) -> Self {
        let capacity = config.read(|c| c.frame_queue_capacity.max(1));
        let (frame_tx, frame_rx) = crossbeam_channel::bounded(capacity);
        let (event_tx, event_rx) = crossbeam_channel::bounded(capacity);
        Self {
            config,
            pipeline: AnalysisPipeline::new(analyzer, engine),
            sinks: Arc::new(RwLock::new(Vec::new())),
            running: Arc::new(AtomicBool::new(false)),
            notifying: Arc::new(AtomicBool::new(false)),
            frame_tx,
            frame_rx,
            event_tx,
            event_rx,
            last_timestamp: Mutex::new(None),
            accepted: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            processed: Arc::new(AtomicU64::new(0)),
            dropped_events: Arc::new(AtomicU64::new(0)),
            workers: Vec::new(),
        }
    }

    /// Starts the analysis and notification threads.
    pub fn start(&mut self) -> std::io::Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.notifying.store(true, Ordering::SeqCst);

        if let Err(e) = self.spawn_workers() {
            log::error!("Pulse service failed to start: {}", e);
            self.stop();
            return Err(e);
        }
        log::info!("Pulse service started.");
        Ok(())
    }

    fn spawn_workers(&mut self) -> std::io::Result<()> {
        let analysis = self.spawn_analysis_worker()?;
        self.workers.push(analysis);
        let notifier = self.spawn_notifier()?;
        self.workers.push(notifier);
        Ok(())
    }

    fn spawn_analysis_worker(&self) -> std::io::Result<Worker> {
        let running = Arc::clone(&self.running);
        let pipeline = self.pipeline.clone();
        let config = self.config.clone();
        let frame_rx = self.frame_rx.clone();
        let event_tx = self.event_tx.clone();
        let processed = Arc::clone(&self.processed);
        let dropped_events = Arc::clone(&self.dropped_events);
        let (done_tx, done) = crossbeam_channel::bounded(1);

        let handle = thread::Builder::new()
            .name("pulse-analysis".to_string())
            .spawn(move || {
                log::info!("Pulse analysis thread started.");
                let mut emit = |event: PulseEvent| {
                    if let Err(TrySendError::Full(_)) = event_tx.try_send(event) {
                        dropped_events.fetch_add(1, Ordering::Relaxed);
                        log::debug!("Pulse: notifier lagging, event dropped.");
                    }
                };

                while running.load(Ordering::Relaxed) {
                    let first = match frame_rx.recv_timeout(IDLE_POLL) {
                        Ok(frame) => frame,
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => break,
                    };

                    let batch_size = config.read(|c| c.analysis_batch_size.max(1));
                    let mut batch = Vec::with_capacity(batch_size);
                    batch.push(first);
                    batch.extend(frame_rx.try_iter().take(batch_size - 1));

                    for frame in batch {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        pipeline.process(Arc::new(frame), &mut emit);
                        processed.fetch_add(1, Ordering::Relaxed);
                    }
                }

                log::info!("Pulse analysis thread stopped.");
                let _ = done_tx.send(());
            })?;

        Ok(Worker {
            name: "analysis",
            handle,
            done,
        })
    }

    fn spawn_notifier(&self) -> std::io::Result<Worker> {
        let notifying = Arc::clone(&self.notifying);
        let sinks = Arc::clone(&self.sinks);
        let event_rx = self.event_rx.clone();
        let (done_tx, done) = crossbeam_channel::bounded(1);

        let handle = thread::Builder::new()
            .name("pulse-notifier".to_string())
            .spawn(move || {
                log::info!("Pulse notifier thread started.");
                while notifying.load(Ordering::Relaxed) {
                    match event_rx.recv_timeout(IDLE_POLL) {
                        Ok(event) => deliver(&event, &sinks),
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                // Flush what the analysis thread already produced.
                for event in event_rx.try_iter() {
                    deliver(&event, &sinks);
                }
                log::info!("Pulse notifier thread stopped.");
                let _ = done_tx.send(());
            })?;

        Ok(Worker {
            name: "notifier",
            handle,
            done,
        })
    }

    /// Stops the background threads.
    ///
    /// Frames still queued are discarded. Each thread gets until the
    /// configured shutdown timeout to finish; threads that do not are detached.
    pub fn stop(&mut self) {
        let was_running = self.running.swap(false, Ordering::SeqCst);
        let discarded = self.frame_rx.try_iter().count();
        if !was_running && self.workers.is_empty() {
            return;
        }

        let timeout = Duration::from_millis(self.config.read(|c| c.shutdown_timeout_ms));
        let deadline = Instant::now() + timeout;

        // The notifier outlives the analysis thread so its last events are delivered.
        for worker in std::mem::take(&mut self.workers) {
            if worker.name == "notifier" {
                self.notifying.store(false, Ordering::SeqCst);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            match worker.done.recv_timeout(remaining) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    if worker.handle.join().is_err() {
                        log::error!("Pulse {} thread panicked.", worker.name);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    log::warn!(
                        "Pulse {} thread did not stop within {:?}, detaching it.",
                        worker.name,
                        timeout
                    );
                }
            }
        }
        self.notifying.store(false, Ordering::SeqCst);

        log::info!("Pulse service stopped ({} queued frames discarded).", discarded);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Hands a frame to the analysis thread without blocking.
    ///
    /// Frames must not go back in time. A full queue drops the frame.
    pub fn submit_frame(&self, frame: MetricFrame) -> Result<(), SubmitError> {
        frame.validate()?;

        let mut last = self
            .last_timestamp
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(previous_ms) = *last {
            if frame.timestamp_ms < previous_ms {
                return Err(FrameError::OutOfOrder {
                    timestamp_ms: frame.timestamp_ms,
                    previous_ms,
                }
                .into());
            }
        }

        let timestamp_ms = frame.timestamp_ms;
        match self.frame_tx.try_send(frame) {
            Ok(()) => {
                *last = Some(timestamp_ms);
                self.accepted.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                log::warn!(
                    "Pulse: frame queue full, dropping frame at {}ms ({} dropped so far).",
                    timestamp_ms,
                    dropped
                );
                Err(SubmitError::QueueFull)
            }
        }
    }

    /// Registers a sink for analysis notifications.
    pub fn subscribe(&self, sink: Arc<dyn AnalysisSink>) {
        self.sinks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sink);
    }

    /// Takes the oldest pending suggestion.
    pub fn poll_suggestion(&self) -> Option<Suggestion> {
        self.pipeline.engine().next_suggestion()
    }

    /// Reports how well an applied suggestion worked, from 1 to 5.
    pub fn report_effectiveness(
        &self,
        suggestion: SuggestionType,
        rating: u8,
        feedback: impl Into<String>,
    ) -> Result<(), EffectivenessError> {
        self.pipeline
            .engine()
            .record_suggestion_effectiveness(suggestion, rating, feedback)
    }

    /// Installs a new configuration, validated and fixed first.
    pub fn update_config(&self, config: ProfilerConfig) -> Result<(), ConfigError> {
        self.config.replace(config)
    }

    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }

    pub fn analyzer(&self) -> &Arc<BottleneckAnalyzer> {
        self.pipeline.analyzer()
    }

    pub fn engine(&self) -> &Arc<OptimizationEngine> {
        self.pipeline.engine()
    }

    pub fn statistics(&self) -> ServiceStatistics {
        ServiceStatistics {
            accepted_frames: self.accepted.load(Ordering::Relaxed),
            processed_frames: self.processed.load(Ordering::Relaxed),
            dropped_frames: self.dropped.load(Ordering::Relaxed),
            dropped_notifications: self.dropped_events.load(Ordering::Relaxed),
            queued_frames: self.frame_rx.len(),
            analysis: self.analyzer().statistics(),
            optimization: self.engine().statistics(),
        }
    }
}

fn deliver(event: &PulseEvent, sinks: &SinkList) {
    let sinks = sinks.read().unwrap_or_else(PoisonError::into_inner);
    for sink in sinks.iter() {
        event.dispatch(sink.as_ref());
    }
}

impl Drop for PulseService {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_with(f: impl FnOnce(&mut ProfilerConfig)) -> PulseService {
        let mut config = ProfilerConfig::default();
        f(&mut config);
        PulseService::new(ConfigHandle::new(config), HardwareProfile::default())
    }

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

    #[test]
    fn test_pulse_service_lifecycle() {
        let mut service = service_with(|_| {});
        service.start().unwrap();
        assert!(service.is_running());
        // Starting twice is a no-op.
        service.start().unwrap();
        service.stop();
        assert!(!service.is_running());
        service.stop();
    }

    #[test]
    fn test_frames_are_analyzed_in_background() {
        let mut service = service_with(|_| {});
        service.start().unwrap();
        for i in 0..20u64 {
            service.submit_frame(MetricFrame::at(i * 50, 60)).unwrap();
        }
        assert!(wait_until(|| service.statistics().processed_frames == 20));
        assert_eq!(service.analyzer().statistics().last_analysis_ms, Some(19 * 50));
        service.stop();
    }

    #[test]
    fn test_invalid_frames_are_rejected() {
        let service = service_with(|_| {});
        let mut frame = MetricFrame::at(0, 60);
        frame.network.latency_ms = f64::NAN;
        assert!(matches!(
            service.submit_frame(frame),
            Err(SubmitError::Invalid(FrameError::InvalidMetric { .. }))
        ));
        assert_eq!(service.statistics().accepted_frames, 0);
    }

    #[test]
    fn test_out_of_order_frames_are_rejected() {
        let service = service_with(|_| {});
        service.submit_frame(MetricFrame::at(100, 60)).unwrap();
        service.submit_frame(MetricFrame::at(100, 60)).unwrap();
        assert_eq!(
            service.submit_frame(MetricFrame::at(99, 60)),
            Err(SubmitError::Invalid(FrameError::OutOfOrder {
                timestamp_ms: 99,
                previous_ms: 100,
            }))
        );
    }

    #[test]
    fn test_full_queue_drops_without_blocking() {
        let service = service_with(|c| c.frame_queue_capacity = 2);
        service.submit_frame(MetricFrame::at(0, 60)).unwrap();
        service.submit_frame(MetricFrame::at(1, 60)).unwrap();
        assert_eq!(
            service.submit_frame(MetricFrame::at(2, 60)),
            Err(SubmitError::QueueFull)
        );
        let stats = service.statistics();
        assert_eq!(stats.dropped_frames, 1);
        assert_eq!(stats.queued_frames, 2);

        // A dropped frame does not advance the ordering check.
        assert_eq!(
            service.submit_frame(MetricFrame::at(1, 60)),
            Err(SubmitError::QueueFull)
        );
    }

    #[test]
    fn test_stop_discards_queued_frames() {
        let mut service = service_with(|_| {});
        for i in 0..5u64 {
            service.submit_frame(MetricFrame::at(i, 60)).unwrap();
        }
        service.stop();
        assert_eq!(service.statistics().queued_frames, 0);
        assert_eq!(service.statistics().processed_frames, 0);
    }

    #[test]
    fn test_update_config_is_validated() {
        let service = service_with(|_| {});
        let mut config = ProfilerConfig::default();
        config.thresholds.fps.critical = 40.0;
        service.update_config(config).unwrap();
        let critical = service.config().read(|c| c.thresholds.fps.critical);
        assert!(critical < 30.0);
    }
}
