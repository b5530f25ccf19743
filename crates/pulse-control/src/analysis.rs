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

//! Bottleneck detection.
//!
//! The `BottleneckAnalyzer` is the analytical core. For every frame it:
//! 1. classifies the load context,
//! 2. evaluates every detection rule (direct thresholds and tracker
//!    statistics),
//! 3. collects the kinds that fired into the active set,
//! 4. records an occurrence or a resolution on every issue tracker.
//!
//! Each rule is isolated: a rule that cannot be evaluated is logged and
//! treated as "not detected" without affecting the others.

use crate::context::{classify, AnalysisContext, ContextScale};
use crate::tracker::{IssueTracker, TrackerSummary};
use pulse_core::config::{ConfigHandle, ProfilerConfig};
use pulse_core::error::RuleError;
use pulse_core::frame::MetricFrame;
use pulse_core::issue::IssueKind;
use pulse_telemetry::TimingStats;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

/// Garbage collection time per frame above which GC is under pressure.
const GC_TIME_THRESHOLD_MS: f64 = 100.0;
/// Collections per frame above which GC is under pressure.
const GC_COLLECTIONS_THRESHOLD: u32 = 5;
/// Off-heap usage considered excessive.
const OFF_HEAP_THRESHOLD_MIB: f64 = 512.0;
/// Share of the frame time spent rendering that indicates a GPU bound frame.
const GPU_BOUND_RATIO: f64 = 0.8;
/// Shader compile time considered expensive.
const SHADER_COMPILE_THRESHOLD_MS: f64 = 50.0;
/// Overdraw factor considered expensive.
const OVERDRAW_THRESHOLD: f64 = 3.0;
/// Chunk rebuilds per frame indicating a backlog.
const CHUNK_UPDATE_THRESHOLD: f64 = 20.0;
/// Entity tick time considered slow.
const ENTITY_TICK_THRESHOLD_MS: f64 = 10.0;
/// Alive-to-rendered entity ratio indicating many invisible entities.
const HIDDEN_ENTITY_RATIO: u32 = 5;
/// Tile entities considered excessive.
const TILE_ENTITY_COUNT_THRESHOLD: f64 = 1000.0;
/// Tile entity tick time considered slow.
const TILE_ENTITY_TICK_THRESHOLD_MS: f64 = 5.0;
/// Tick time indicating a CPU bound simulation.
const TICK_TIME_THRESHOLD_MS: f64 = 40.0;
/// Chunk load time indicating slow storage.
const CHUNK_LOAD_THRESHOLD_MS: f64 = 100.0;
/// Ratio of tick time to its running average indicating contention.
const CONTENTION_RATIO: f64 = 2.0;

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Result of analysing one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameAnalysis {
    /// Timestamp of the analyzed frame.
    pub timestamp_ms: u64,
    /// Load context the frame was classified in.
    pub context: AnalysisContext,
    /// Active issues, in [`IssueKind`] declaration order.
    pub active_issues: Vec<IssueKind>,
    /// Rules that could not be evaluated for this frame.
    pub failed_rules: Vec<&'static str>,
}

impl FrameAnalysis {
    /// Returns `true` if `kind` is active in this frame.
    pub fn is_active(&self, kind: IssueKind) -> bool {
        self.active_issues.contains(&kind)
    }

    /// Active issues severe enough to warrant a suggestion.
    pub fn escalated_issues(&self) -> impl Iterator<Item = IssueKind> + '_ {
        self.active_issues
            .iter()
            .copied()
            .filter(|kind| kind.is_escalated())
    }
}

/// Aggregate figures about past analyses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisStatistics {
    /// Frames analyzed since startup or the last reset.
    pub total_analyses: u64,
    /// Timestamp of the last analyzed frame.
    pub last_analysis_ms: Option<u64>,
    /// Mean wall-clock time of one analysis.
    pub average_analysis_time: Duration,
    /// Occurrences recorded per issue kind.
    pub occurrence_counts: BTreeMap<IssueKind, u64>,
    /// Kind with the most occurrences (first in declaration order on ties).
    pub most_frequent_issue: Option<IssueKind>,
    /// Issues active in the last analyzed frame.
    pub active_issues: Vec<IssueKind>,
    /// Rule evaluations that failed.
    pub failed_rule_evaluations: u64,
}

impl AnalysisStatistics {
    /// Sum of all occurrence counts.
    pub fn total_issues(&self) -> u64 {
        self.occurrence_counts.values().sum()
    }
}

struct RuleInput<'a> {
    frame: &'a MetricFrame,
    scale: ContextScale,
    config: &'a ProfilerConfig,
}

type RuleResult = Result<Option<IssueKind>, RuleError>;
type Rule = fn(&BottleneckAnalyzer, &RuleInput<'_>) -> RuleResult;

/// Every detection rule, grouped by domain.
const RULES: &[(&str, Rule)] = &[
    // Frame rate
    ("frame_rate", BottleneckAnalyzer::frame_rate),
    ("frame_stability", BottleneckAnalyzer::frame_stability),
    ("frame_spikes", BottleneckAnalyzer::frame_spikes),
    // Memory
    ("memory_pressure", BottleneckAnalyzer::memory_pressure),
    ("memory_leak", BottleneckAnalyzer::memory_leak),
    ("gc_pressure", BottleneckAnalyzer::gc_pressure),
    ("off_heap", BottleneckAnalyzer::off_heap),
    // Rendering
    ("render_lag", BottleneckAnalyzer::render_lag),
    ("gpu_bottleneck", BottleneckAnalyzer::gpu_bottleneck),
    ("shader_performance", BottleneckAnalyzer::shader_performance),
    ("draw_calls", BottleneckAnalyzer::draw_calls),
    // World
    ("chunk_count", BottleneckAnalyzer::chunk_count),
    ("chunk_updates", BottleneckAnalyzer::chunk_updates),
    ("entity_count", BottleneckAnalyzer::entity_count),
    ("entity_lag", BottleneckAnalyzer::entity_lag),
    ("tile_entity_lag", BottleneckAnalyzer::tile_entity_lag),
    // Network
    ("network_latency", BottleneckAnalyzer::network_latency),
    ("packet_loss", BottleneckAnalyzer::packet_loss),
    ("bandwidth", BottleneckAnalyzer::bandwidth),
    // System
    ("cpu_load", BottleneckAnalyzer::cpu_load),
    ("disk_io", BottleneckAnalyzer::disk_io),
    ("thread_contention", BottleneckAnalyzer::thread_contention),
];

fn finite(metric: &'static str, value: f64) -> Result<f64, RuleError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(RuleError::InvalidMetric { metric, value })
    }
}

fn raise_if(condition: bool, kind: IssueKind) -> RuleResult {
    Ok(condition.then_some(kind))
}

/// Evaluates frames against every detection rule and maintains issue trackers.
pub struct BottleneckAnalyzer {
    config: ConfigHandle,
    trackers: HashMap<IssueKind, IssueTracker>,
    total_analyses: AtomicU64,
    failed_evaluations: AtomicU64,
    last_analysis_ms: RwLock<Option<u64>>,
    last_active: RwLock<Vec<IssueKind>>,
    timing: TimingStats,
}

impl BottleneckAnalyzer {
    /// Creates an analyzer with one tracker per issue kind.
    pub fn new(config: ConfigHandle) -> Self {
        let capacity = config.read(|c| c.data_buffer_size);
        let trackers = IssueKind::ALL
            .iter()
            .map(|&kind| (kind, IssueTracker::new(kind, capacity)))
            .collect();

        Self {
            config,
            trackers,
            total_analyses: AtomicU64::new(0),
            failed_evaluations: AtomicU64::new(0),
            last_analysis_ms: RwLock::new(None),
            last_active: RwLock::new(Vec::new()),
            timing: TimingStats::new(),
        }
    }

    /// The shared configuration.
    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }

    /// The tracker of an issue kind.
    pub fn tracker(&self, kind: IssueKind) -> Option<&IssueTracker> {
        self.trackers.get(&kind)
    }

    fn tracker_for(&self, kind: IssueKind) -> Result<&IssueTracker, RuleError> {
        self.trackers
            .get(&kind)
            .ok_or(RuleError::TrackerUnavailable(kind))
    }

    // A reload may grow the windows past the buffers sized at construction.
    fn sync_capacity(&self, capacity: usize) {
        let mut resized = false;
        for tracker in self.trackers.values() {
            if tracker.value_capacity() != capacity.max(1) {
                tracker.set_value_capacity(capacity);
                resized = true;
            }
        }
        if resized {
            log::info!("Analyzer: tracker buffers resized to {} samples.", capacity);
        }
    }

    /// Analyzes one frame.
    ///
    /// Frames must be fed in non-decreasing timestamp order.
    pub fn analyze_frame(&self, frame: &MetricFrame) -> FrameAnalysis {
        let _timer = self.timing.start();
        let config = self.config.snapshot();
        let context = classify(frame);
        self.sync_capacity(config.data_buffer_size);

        if !config.bottleneck_analysis_enabled {
            return FrameAnalysis {
                timestamp_ms: frame.timestamp_ms,
                context,
                active_issues: Vec::new(),
                failed_rules: Vec::new(),
            };
        }

        let input = RuleInput {
            frame,
            scale: ContextScale::for_context(context),
            config: &config,
        };

        let mut active = BTreeSet::new();
        let mut failed_rules = Vec::new();
        for (name, rule) in RULES {
            match rule(self, &input) {
                Ok(Some(kind)) => {
                    log::debug!(
                        "Analyzer: {} raised {:?} at {}ms ({}).",
                        name,
                        kind,
                        frame.timestamp_ms,
                        context.label()
                    );
                    active.insert(kind);
                }
                Ok(None) => {}
                Err(e) => {
                    log::warn!("Analyzer: rule '{}' failed, treated as not detected: {}", name, e);
                    failed_rules.push(*name);
                }
            }
        }

        for (kind, tracker) in &self.trackers {
            if active.contains(kind) {
                tracker.record_occurrence(frame.timestamp_ms);
            } else {
                tracker.record_resolution(frame.timestamp_ms);
            }
        }

        let active_issues: Vec<IssueKind> = active.into_iter().collect();
        self.total_analyses.fetch_add(1, Ordering::Relaxed);
        self.failed_evaluations
            .fetch_add(failed_rules.len() as u64, Ordering::Relaxed);
        *self
            .last_analysis_ms
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(frame.timestamp_ms);
        *self
            .last_active
            .write()
            .unwrap_or_else(PoisonError::into_inner) = active_issues.clone();

        FrameAnalysis {
            timestamp_ms: frame.timestamp_ms,
            context,
            active_issues,
            failed_rules,
        }
    }

    // ── 1. Frame Rate ────────────────────────────────────────────────────

    fn frame_rate(&self, input: &RuleInput<'_>) -> RuleResult {
        let fps = input.frame.fps as f64;
        let thresholds = &input.config.thresholds.fps;
        if fps <= input.scale.floor(thresholds.critical) {
            Ok(Some(IssueKind::CriticalFps))
        } else {
            raise_if(
                fps <= input.scale.floor(thresholds.warning),
                IssueKind::LowFps,
            )
        }
    }

    fn frame_stability(&self, input: &RuleInput<'_>) -> RuleResult {
        let tracker = self.tracker_for(IssueKind::FpsInstability)?;
        tracker.add_data_point(input.frame.fps as f64);

        let window = input.config.windows.short;
        if tracker.sample_count() < window {
            return Ok(None);
        }
        let (mean, std_dev) = tracker.window_statistics(window);
        if mean <= 0.0 {
            return Ok(None);
        }
        let cv = std_dev / mean;
        raise_if(
            cv > input.config.thresholds.fps_instability_cv,
            IssueKind::FpsInstability,
        )
    }

    fn frame_spikes(&self, input: &RuleInput<'_>) -> RuleResult {
        let frame_time = finite("render.frame_time_ms", input.frame.frame_time_ms())?;
        let tracker = self.tracker_for(IssueKind::FrameTimeSpikes)?;
        tracker.add_data_point(frame_time);

        if tracker.sample_count() < input.config.windows.short {
            return Ok(None);
        }
        let recent = tracker.recent_average(input.config.windows.spike_window());
        raise_if(
            recent > 0.0 && frame_time > input.config.thresholds.frame_spike_factor * recent,
            IssueKind::FrameTimeSpikes,
        )
    }

    // ── 2. Memory ────────────────────────────────────────────────────────

    fn memory_pressure(&self, input: &RuleInput<'_>) -> RuleResult {
        if input.frame.memory.heap_max_bytes == 0 {
            return Ok(None);
        }
        let usage = input.frame.memory.heap_usage_percent();
        let thresholds = &input.config.thresholds.memory_percent;
        if usage >= thresholds.critical {
            Ok(Some(IssueKind::CriticalMemoryUsage))
        } else {
            raise_if(usage >= thresholds.warning, IssueKind::HighMemoryUsage)
        }
    }

    fn memory_leak(&self, input: &RuleInput<'_>) -> RuleResult {
        if !input.config.memory_leak_detection_enabled || input.frame.memory.heap_max_bytes == 0 {
            return Ok(None);
        }
        let tracker = self.tracker_for(IssueKind::MemoryLeak)?;
        tracker.add_data_point(input.frame.memory.heap_usage_percent());

        let window = input.config.windows.long;
        if tracker.sample_count() < window {
            return Ok(None);
        }
        let slope = tracker.trend(window);
        if slope > input.config.thresholds.memory_leak_slope {
            log::info!(
                "Analyzer: heap usage rising by {:.3}% per sample over {} samples.",
                slope,
                window
            );
            return Ok(Some(IssueKind::MemoryLeak));
        }
        Ok(None)
    }

    fn gc_pressure(&self, input: &RuleInput<'_>) -> RuleResult {
        let memory = &input.frame.memory;
        let gc_time = finite("memory.gc_time_ms", memory.gc_time_ms)?;
        raise_if(
            gc_time > GC_TIME_THRESHOLD_MS || memory.gc_collections > GC_COLLECTIONS_THRESHOLD,
            IssueKind::GcPressure,
        )
    }

    fn off_heap(&self, input: &RuleInput<'_>) -> RuleResult {
        raise_if(
            input.frame.memory.non_heap_used_mib() > OFF_HEAP_THRESHOLD_MIB,
            IssueKind::OffHeapMemory,
        )
    }

    // ── 3. Rendering ─────────────────────────────────────────────────────

    fn render_lag(&self, input: &RuleInput<'_>) -> RuleResult {
        let render_time = finite("render.render_time_ms", input.frame.render.render_time_ms)?;
        raise_if(
            render_time > input.scale.ceiling(input.config.thresholds.render_time_ms),
            IssueKind::RenderLag,
        )
    }

    fn gpu_bottleneck(&self, input: &RuleInput<'_>) -> RuleResult {
        if !input.config.gpu_bottleneck_detection_enabled {
            return Ok(None);
        }
        let render_time = finite("render.render_time_ms", input.frame.render.render_time_ms)?;
        let frame_time = finite("render.frame_time_ms", input.frame.frame_time_ms())?;
        raise_if(
            render_time > 0.0 && render_time / frame_time > GPU_BOUND_RATIO,
            IssueKind::GpuBottleneck,
        )
    }

    fn shader_performance(&self, input: &RuleInput<'_>) -> RuleResult {
        let render = &input.frame.render;
        let compile = finite("render.shader_compile_time_ms", render.shader_compile_time_ms)?;
        let overdraw = finite("render.overdraw_factor", render.overdraw_factor)?;
        raise_if(
            compile > SHADER_COMPILE_THRESHOLD_MS || overdraw > OVERDRAW_THRESHOLD,
            IssueKind::ShaderPerformance,
        )
    }

    fn draw_calls(&self, input: &RuleInput<'_>) -> RuleResult {
        let limit = input
            .scale
            .ceiling(input.config.thresholds.max_draw_calls as f64);
        raise_if(
            input.frame.render.draw_calls as f64 > limit,
            IssueKind::ExcessiveDrawCalls,
        )
    }

    // ── 4. World ─────────────────────────────────────────────────────────

    fn chunk_count(&self, input: &RuleInput<'_>) -> RuleResult {
        let limit = input
            .scale
            .ceiling(input.config.thresholds.max_loaded_chunks as f64);
        raise_if(
            input.frame.world.loaded_chunks as f64 > limit,
            IssueKind::ExcessiveChunks,
        )
    }

    fn chunk_updates(&self, input: &RuleInput<'_>) -> RuleResult {
        raise_if(
            input.frame.world.chunk_updates as f64 > input.scale.ceiling(CHUNK_UPDATE_THRESHOLD),
            IssueKind::ChunkUpdateLag,
        )
    }

    fn entity_count(&self, input: &RuleInput<'_>) -> RuleResult {
        let limit = input
            .scale
            .ceiling(input.config.thresholds.max_entities as f64);
        raise_if(
            input.frame.entities.total_entities as f64 > limit,
            IssueKind::ExcessiveEntities,
        )
    }

    fn entity_lag(&self, input: &RuleInput<'_>) -> RuleResult {
        let entities = &input.frame.entities;
        let tick = finite("entities.entity_tick_time_ms", entities.entity_tick_time_ms)?;
        let hidden_ratio = entities.total_entities / entities.rendered_entities.max(1);
        raise_if(
            tick > input.scale.ceiling(ENTITY_TICK_THRESHOLD_MS) || hidden_ratio > HIDDEN_ENTITY_RATIO,
            IssueKind::EntityLag,
        )
    }

    fn tile_entity_lag(&self, input: &RuleInput<'_>) -> RuleResult {
        let entities = &input.frame.entities;
        let tick = finite(
            "entities.tile_entity_tick_time_ms",
            entities.tile_entity_tick_time_ms,
        )?;
        raise_if(
            entities.tile_entity_count as f64 > input.scale.ceiling(TILE_ENTITY_COUNT_THRESHOLD)
                || tick > input.scale.ceiling(TILE_ENTITY_TICK_THRESHOLD_MS),
            IssueKind::TileEntityLag,
        )
    }

    // ── 5. Network ───────────────────────────────────────────────────────

    fn network_latency(&self, input: &RuleInput<'_>) -> RuleResult {
        let latency = finite("network.latency_ms", input.frame.network.latency_ms)?;
        raise_if(
            latency > input.config.thresholds.network_latency_ms,
            IssueKind::NetworkLag,
        )
    }

    fn packet_loss(&self, input: &RuleInput<'_>) -> RuleResult {
        let loss = finite(
            "network.packet_loss_percent",
            input.frame.network.packet_loss_percent,
        )?;
        raise_if(
            loss > input.config.thresholds.packet_loss_percent,
            IssueKind::PacketLoss,
        )
    }

    fn bandwidth(&self, input: &RuleInput<'_>) -> RuleResult {
        let limit = input.config.thresholds.bandwidth_mib_per_second * BYTES_PER_MIB;
        raise_if(
            input.frame.network.bytes_per_second as f64 > limit,
            IssueKind::NetworkBandwidth,
        )
    }

    // ── 6. System ────────────────────────────────────────────────────────

    fn cpu_load(&self, input: &RuleInput<'_>) -> RuleResult {
        let tick = finite("system.tick_time_ms", input.frame.system.tick_time_ms)?;
        raise_if(
            tick > input.scale.ceiling(TICK_TIME_THRESHOLD_MS),
            IssueKind::HighCpuUsage,
        )
    }

    fn disk_io(&self, input: &RuleInput<'_>) -> RuleResult {
        let load = finite("world.chunk_load_time_ms", input.frame.world.chunk_load_time_ms)?;
        raise_if(
            load > input.scale.ceiling(CHUNK_LOAD_THRESHOLD_MS),
            IssueKind::DiskIoBottleneck,
        )
    }

    fn thread_contention(&self, input: &RuleInput<'_>) -> RuleResult {
        let system = &input.frame.system;
        let tick = finite("system.tick_time_ms", system.tick_time_ms)?;
        let average = finite("system.average_tick_time_ms", system.average_tick_time_ms)?;
        raise_if(
            average > 0.0 && tick > average * CONTENTION_RATIO,
            IssueKind::ThreadContention,
        )
    }

    // ── Statistics ───────────────────────────────────────────────────────

    /// Aggregate figures about past analyses.
    pub fn statistics(&self) -> AnalysisStatistics {
        let occurrence_counts: BTreeMap<IssueKind, u64> = self
            .trackers
            .iter()
            .map(|(kind, tracker)| (*kind, tracker.total_occurrences()))
            .collect();

        let most_frequent_issue = occurrence_counts
            .iter()
            .filter(|(_, count)| **count > 0)
            .fold(None, |best: Option<(IssueKind, u64)>, (kind, count)| match best {
                Some((_, best_count)) if best_count >= *count => best,
                _ => Some((*kind, *count)),
            })
            .map(|(kind, _)| kind);

        AnalysisStatistics {
            total_analyses: self.total_analyses.load(Ordering::Relaxed),
            last_analysis_ms: *self
                .last_analysis_ms
                .read()
                .unwrap_or_else(PoisonError::into_inner),
            average_analysis_time: self.timing.average(),
            occurrence_counts,
            most_frequent_issue,
            active_issues: self
                .last_active
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
            failed_rule_evaluations: self.failed_evaluations.load(Ordering::Relaxed),
        }
    }

    /// Summaries of every tracker, in [`IssueKind`] declaration order.
    pub fn issue_summaries(&self) -> Vec<TrackerSummary> {
        IssueKind::ALL
            .iter()
            .filter_map(|kind| self.trackers.get(kind))
            .map(IssueTracker::summary)
            .collect()
    }

    /// Clears every tracker and statistic.
    pub fn reset_analysis_data(&self) {
        for tracker in self.trackers.values() {
            tracker.reset();
        }
        self.total_analyses.store(0, Ordering::Relaxed);
        self.failed_evaluations.store(0, Ordering::Relaxed);
        self.timing.reset();
        *self
            .last_analysis_ms
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
        self.last_active
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        log::info!("Analyzer: analysis data reset.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::config::ProfilerConfig;

    fn analyzer() -> BottleneckAnalyzer {
        BottleneckAnalyzer::new(ConfigHandle::default())
    }

    fn analyzer_with(f: impl FnOnce(&mut ProfilerConfig)) -> BottleneckAnalyzer {
        let mut config = ProfilerConfig::default();
        f(&mut config);
        BottleneckAnalyzer::new(ConfigHandle::new(config))
    }

    fn healthy(ts: u64) -> MetricFrame {
        let mut frame = MetricFrame::at(ts, 60);
        frame.memory.heap_used_bytes = 400;
        frame.memory.heap_max_bytes = 1000;
        frame.render.render_time_ms = 5.0;
        frame.entities.total_entities = 50;
        frame.entities.rendered_entities = 40;
        frame
    }

    // ── Direct thresholds ──

    #[test]
    fn test_healthy_frame_has_no_issues() {
        let a = analyzer();
        let result = a.analyze_frame(&healthy(0));
        assert!(result.active_issues.is_empty(), "{:?}", result.active_issues);
        assert!(result.failed_rules.is_empty());
        assert_eq!(result.context, AnalysisContext::Normal);
    }

    #[test]
    fn test_fps_tiers_are_mutually_exclusive() {
        let a = analyzer();
        for fps in [0, 5, 10, 15] {
            let mut frame = healthy(0);
            frame.fps = fps;
            let result = a.analyze_frame(&frame);
            assert!(result.is_active(IssueKind::CriticalFps), "fps {fps}");
            assert!(!result.is_active(IssueKind::LowFps), "fps {fps}");
        }
        for fps in [16, 20, 30] {
            let mut frame = healthy(0);
            frame.fps = fps;
            let result = a.analyze_frame(&frame);
            assert!(result.is_active(IssueKind::LowFps), "fps {fps}");
            assert!(!result.is_active(IssueKind::CriticalFps), "fps {fps}");
        }
        let result = a.analyze_frame(&healthy(0));
        assert!(!result.is_active(IssueKind::LowFps));
    }

    #[test]
    fn test_memory_tiers_are_mutually_exclusive() {
        let a = analyzer();
        let mut frame = healthy(0);
        frame.memory.heap_used_bytes = 850;
        let result = a.analyze_frame(&frame);
        assert!(result.is_active(IssueKind::HighMemoryUsage));
        assert!(!result.is_active(IssueKind::CriticalMemoryUsage));

        frame.memory.heap_used_bytes = 960;
        let result = a.analyze_frame(&frame);
        assert!(result.is_active(IssueKind::CriticalMemoryUsage));
        assert!(!result.is_active(IssueKind::HighMemoryUsage));
    }

    #[test]
    fn test_heavy_world_relaxes_chunk_threshold() {
        let a = analyzer();
        let mut frame = healthy(0);
        frame.world.loaded_chunks = 1200;
        let result = a.analyze_frame(&frame);
        assert_eq!(result.context, AnalysisContext::HeavyWorld);
        // 1200 is below 1000 * 1.5
        assert!(!result.is_active(IssueKind::ExcessiveChunks));

        frame.world.loaded_chunks = 1600;
        assert!(a.analyze_frame(&frame).is_active(IssueKind::ExcessiveChunks));
    }

    #[test]
    fn test_each_domain_rule_fires() {
        let a = analyzer();
        let mut frame = healthy(0);
        frame.memory.gc_time_ms = 150.0;
        frame.memory.non_heap_used_bytes = 600 * 1024 * 1024;
        frame.render.render_time_ms = 60.0;
        frame.render.frame_time_ms = 65.0;
        frame.render.shader_compile_time_ms = 80.0;
        frame.entities.entity_tick_time_ms = 12.0;
        frame.entities.tile_entity_tick_time_ms = 6.0;
        frame.network.latency_ms = 200.0;
        frame.network.packet_loss_percent = 8.0;
        frame.network.bytes_per_second = 20 * 1024 * 1024;
        frame.system.tick_time_ms = 45.0;
        frame.system.average_tick_time_ms = 20.0;
        frame.world.chunk_load_time_ms = 150.0;
        frame.world.chunk_updates = 25;

        let result = a.analyze_frame(&frame);
        for kind in [
            IssueKind::GcPressure,
            IssueKind::OffHeapMemory,
            IssueKind::RenderLag,
            IssueKind::GpuBottleneck,
            IssueKind::ShaderPerformance,
            IssueKind::EntityLag,
            IssueKind::TileEntityLag,
            IssueKind::NetworkLag,
            IssueKind::PacketLoss,
            IssueKind::NetworkBandwidth,
            IssueKind::HighCpuUsage,
            IssueKind::ThreadContention,
            IssueKind::DiskIoBottleneck,
            IssueKind::ChunkUpdateLag,
        ] {
            assert!(result.is_active(kind), "{kind:?} not raised");
        }
    }

    #[test]
    fn test_disabled_analysis_touches_nothing() {
        let a = analyzer_with(|c| c.bottleneck_analysis_enabled = false);
        let mut frame = healthy(0);
        frame.fps = 5;
        let result = a.analyze_frame(&frame);
        assert!(result.active_issues.is_empty());
        assert_eq!(a.statistics().total_analyses, 0);
        let tracker = a.tracker(IssueKind::FpsInstability).unwrap();
        assert_eq!(tracker.sample_count(), 0);
    }

    #[test]
    fn test_gpu_detection_switch() {
        let a = analyzer_with(|c| c.gpu_bottleneck_detection_enabled = false);
        let mut frame = healthy(0);
        frame.render.render_time_ms = 15.0;
        frame.render.frame_time_ms = 16.0;
        assert!(!a.analyze_frame(&frame).is_active(IssueKind::GpuBottleneck));
    }

    // ── Rule isolation ──

    #[test]
    fn test_failed_rule_does_not_stop_others() {
        let a = analyzer();
        let mut frame = healthy(0);
        frame.fps = 10;
        frame.network.latency_ms = f64::NAN;
        let result = a.analyze_frame(&frame);
        assert_eq!(result.failed_rules, vec!["network_latency"]);
        assert!(result.is_active(IssueKind::CriticalFps));
        assert!(!result.is_active(IssueKind::NetworkLag));
        assert_eq!(a.statistics().failed_rule_evaluations, 1);
    }

    // ── Statistical detectors ──

    #[test]
    fn test_instability_requires_minimum_samples() {
        let a = analyzer();
        // Wildly alternating frame rate.
        for i in 0..59u64 {
            let mut frame = healthy(i * 50);
            frame.fps = if i % 2 == 0 { 120 } else { 40 };
            let result = a.analyze_frame(&frame);
            assert!(!result.is_active(IssueKind::FpsInstability), "frame {i}");
        }
        let mut frame = healthy(59 * 50);
        frame.fps = 40;
        assert!(a.analyze_frame(&frame).is_active(IssueKind::FpsInstability));
    }

    #[test]
    fn test_stable_fps_is_not_unstable() {
        let a = analyzer();
        for i in 0..120u64 {
            let mut frame = healthy(i * 50);
            frame.fps = 60 + (i % 3) as u32;
            assert!(!a.analyze_frame(&frame).is_active(IssueKind::FpsInstability));
        }
    }

    #[test]
    fn test_spike_requires_minimum_samples() {
        let a = analyzer();
        // A spike right away is not reported.
        let mut frame = healthy(0);
        frame.fps = 10;
        assert!(!a.analyze_frame(&frame).is_active(IssueKind::FrameTimeSpikes));

        for i in 1..70u64 {
            a.analyze_frame(&healthy(i * 50));
        }
        let mut spike = healthy(70 * 50);
        spike.fps = 10; // 100 ms against ~16.7 ms
        assert!(a.analyze_frame(&spike).is_active(IssueKind::FrameTimeSpikes));
    }

    #[test]
    fn test_leak_requires_full_long_window() {
        let a = analyzer_with(|c| {
            c.windows.long = 100;
        });
        for i in 0..100u64 {
            let mut frame = healthy(i * 50);
            frame.memory.heap_max_bytes = 10_000;
            frame.memory.heap_used_bytes = 4_000 + i * 10; // +0.1% per frame
            let result = a.analyze_frame(&frame);
            assert_eq!(result.is_active(IssueKind::MemoryLeak), i == 99, "frame {i}");
        }
    }

    #[test]
    fn test_leak_detection_switch() {
        let a = analyzer_with(|c| {
            c.windows.long = 100;
            c.memory_leak_detection_enabled = false;
        });
        for i in 0..150u64 {
            let mut frame = healthy(i * 50);
            frame.memory.heap_max_bytes = 10_000;
            frame.memory.heap_used_bytes = 2_000 + i * 20;
            assert!(!a.analyze_frame(&frame).is_active(IssueKind::MemoryLeak));
        }
    }

    // ── Tracker bookkeeping ──

    #[test]
    fn test_buffers_follow_config_changes() {
        let config = ConfigHandle::default();
        let a = BottleneckAnalyzer::new(config.clone());
        for i in 0..10u64 {
            a.analyze_frame(&healthy(i * 50));
        }
        let before = a.tracker(IssueKind::MemoryLeak).unwrap().sample_count();

        config.update(|c| c.data_buffer_size = 2_000).unwrap();
        a.analyze_frame(&healthy(500));

        for kind in IssueKind::ALL {
            assert_eq!(a.tracker(kind).unwrap().value_capacity(), 2_000);
        }
        // Retained samples survive the resize.
        assert_eq!(
            a.tracker(IssueKind::MemoryLeak).unwrap().sample_count(),
            before + 1
        );
    }

    #[test]
    fn test_trackers_follow_active_set() {
        let a = analyzer();
        let mut frame = healthy(1_000);
        frame.fps = 10;
        a.analyze_frame(&frame);
        a.analyze_frame(&healthy(2_000));

        let critical = a.tracker(IssueKind::CriticalFps).unwrap();
        assert_eq!(critical.total_occurrences(), 1);
        assert!(!critical.is_currently_active());
        assert_eq!(critical.total_duration_ms(), 1_000);

        let low = a.tracker(IssueKind::LowFps).unwrap();
        assert_eq!(low.total_occurrences(), 0);
        assert_eq!(low.last_resolution(), None);
    }

    #[test]
    fn test_statistics_and_reset() {
        let a = analyzer();
        for i in 0..3u64 {
            let mut frame = healthy(i * 50);
            frame.fps = 20;
            a.analyze_frame(&frame);
        }
        let mut frame = healthy(200);
        frame.fps = 10;
        a.analyze_frame(&frame);

        let stats = a.statistics();
        assert_eq!(stats.total_analyses, 4);
        assert_eq!(stats.last_analysis_ms, Some(200));
        assert_eq!(stats.most_frequent_issue, Some(IssueKind::LowFps));
        assert_eq!(stats.occurrence_counts[&IssueKind::LowFps], 3);
        assert_eq!(stats.active_issues, vec![IssueKind::CriticalFps]);
        assert_eq!(stats.total_issues(), 4);
        assert_eq!(a.issue_summaries().len(), IssueKind::ALL.len());

        a.reset_analysis_data();
        let stats = a.statistics();
        assert_eq!(stats.total_analyses, 0);
        assert_eq!(stats.most_frequent_issue, None);
        assert_eq!(stats.last_analysis_ms, None);
    }

    #[test]
    fn test_escalated_issues() {
        let a = analyzer();
        let mut frame = healthy(0);
        frame.fps = 10;
        frame.network.latency_ms = 300.0;
        let result = a.analyze_frame(&frame);
        assert!(result.is_active(IssueKind::NetworkLag));
        let escalated: Vec<_> = result.escalated_issues().collect();
        assert_eq!(escalated, vec![IssueKind::CriticalFps]);
    }
}
