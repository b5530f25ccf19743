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

//! Runtime configuration of the analyzer and advisor.
//!
//! [`ProfilerConfig`] is plain serde data, loaded from JSON. A [`ConfigHandle`]
//! shares one validated instance between the service, the analyzer and the
//! advisor, and lets the host swap it at runtime.

use crate::error::ConfigError;
use crate::suggestion::SuggestionType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

/// A warning/critical threshold pair for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPair {
    /// Level at which the warning-tier issue is raised.
    pub warning: f64,
    /// Level at which the critical-tier issue is raised instead.
    pub critical: f64,
}

/// Detection thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Frame rate (lower is worse).
    pub fps: ThresholdPair,
    /// Heap usage percentage.
    pub memory_percent: ThresholdPair,
    /// Render time per frame.
    pub render_time_ms: f64,
    /// Draw calls per frame.
    pub max_draw_calls: u32,
    /// Loaded chunks.
    pub max_loaded_chunks: u32,
    /// Alive entities.
    pub max_entities: u32,
    /// Round-trip latency.
    pub network_latency_ms: f64,
    /// Packet loss percentage.
    pub packet_loss_percent: f64,
    /// Throughput in MiB per second.
    pub bandwidth_mib_per_second: f64,
    /// Coefficient of variation of the frame rate above which it is unstable.
    pub fps_instability_cv: f64,
    /// Ratio to the recent average above which a frame time is a spike.
    pub frame_spike_factor: f64,
    /// Heap percentage growth per sample above which a leak is reported.
    pub memory_leak_slope: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            fps: ThresholdPair {
                warning: 30.0,
                critical: 15.0,
            },
            memory_percent: ThresholdPair {
                warning: 80.0,
                critical: 95.0,
            },
            render_time_ms: 50.0,
            max_draw_calls: 2000,
            max_loaded_chunks: 1000,
            max_entities: 500,
            network_latency_ms: 150.0,
            packet_loss_percent: 5.0,
            bandwidth_mib_per_second: 10.0,
            fps_instability_cv: 0.3,
            frame_spike_factor: 2.0,
            memory_leak_slope: 0.02,
        }
    }
}

/// Sample windows of the statistical detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisWindows {
    /// Samples used for instability and spike detection.
    pub short: usize,
    /// Samples used for leak detection.
    pub long: usize,
}

impl Default for AnalysisWindows {
    fn default() -> Self {
        Self {
            short: 60,
            long: 600,
        }
    }
}

impl AnalysisWindows {
    /// Samples averaged when looking for frame time spikes.
    pub fn spike_window(&self) -> usize {
        (self.short / 4).max(1)
    }
}

/// Complete configuration of a Pulse instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilerConfig {
    /// Master switch of the bottleneck analyzer.
    pub bottleneck_analysis_enabled: bool,
    /// Master switch of suggestion generation.
    pub optimization_suggestions_enabled: bool,
    /// Enables the trend-based leak detector.
    pub memory_leak_detection_enabled: bool,
    /// Enables the render/frame time ratio detector.
    pub gpu_bottleneck_detection_enabled: bool,
    /// Expected frame submissions per second.
    pub collection_frequency_hz: u32,
    /// Detection thresholds.
    pub thresholds: Thresholds,
    /// Statistical windows.
    pub windows: AnalysisWindows,
    /// Capacity of each tracker's value buffer.
    pub data_buffer_size: usize,
    /// Capacity of the inbound frame queue.
    pub frame_queue_capacity: usize,
    /// Capacity of the outbound suggestion queue.
    pub suggestion_queue_capacity: usize,
    /// Frames analyzed per worker wake-up.
    pub analysis_batch_size: usize,
    /// Upper bound on the time `stop` waits for workers.
    pub shutdown_timeout_ms: u64,
    /// Cooldown windows in seconds, replacing the built-in ones.
    pub cooldown_overrides: BTreeMap<SuggestionType, u64>,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            bottleneck_analysis_enabled: true,
            optimization_suggestions_enabled: true,
            memory_leak_detection_enabled: true,
            gpu_bottleneck_detection_enabled: true,
            collection_frequency_hz: 20,
            thresholds: Thresholds::default(),
            windows: AnalysisWindows::default(),
            data_buffer_size: 1000,
            frame_queue_capacity: 1000,
            suggestion_queue_capacity: 64,
            analysis_batch_size: 10,
            shutdown_timeout_ms: 5000,
            cooldown_overrides: BTreeMap::new(),
        }
    }
}

impl ProfilerConfig {
    /// Parses a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Writes the configuration to a JSON file.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Interval between two frames at the configured frequency.
    pub fn sampling_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.collection_frequency_hz.max(1) as f64)
    }

    /// Corrects inconsistent values in place and returns a description of each fix.
    pub fn validate_and_fix(&mut self) -> Vec<String> {
        let mut fixes = Vec::new();
        let t = &mut self.thresholds;

        if t.fps.critical >= t.fps.warning {
            let fixed = (t.fps.warning - 5.0).max(5.0);
            fixes.push(format!(
                "critical fps threshold {} must be below warning {}, using {}",
                t.fps.critical, t.fps.warning, fixed
            ));
            t.fps.critical = fixed;
        }

        if t.memory_percent.critical <= t.memory_percent.warning {
            let fixed = (t.memory_percent.warning + 5.0).min(99.0);
            fixes.push(format!(
                "critical memory threshold {} must be above warning {}, using {}",
                t.memory_percent.critical, t.memory_percent.warning, fixed
            ));
            t.memory_percent.critical = fixed;
        }

        if self.collection_frequency_hz == 0 || self.collection_frequency_hz > 60 {
            let fixed = self.collection_frequency_hz.clamp(1, 60);
            fixes.push(format!(
                "collection frequency {} Hz out of range, using {}",
                self.collection_frequency_hz, fixed
            ));
            self.collection_frequency_hz = fixed;
        }

        if self.data_buffer_size < 100 {
            fixes.push(format!(
                "data buffer size {} too small, using 100",
                self.data_buffer_size
            ));
            self.data_buffer_size = 100;
        }

        if self.windows.short < 2 {
            fixes.push(format!(
                "short window {} too small, using 2",
                self.windows.short
            ));
            self.windows.short = 2;
        }

        if self.windows.long < self.windows.short {
            fixes.push(format!(
                "long window {} shorter than short window, using {}",
                self.windows.long, self.windows.short
            ));
            self.windows.long = self.windows.short;
        }

        if self.data_buffer_size < self.windows.long {
            fixes.push(format!(
                "data buffer size {} cannot hold the long window, using {}",
                self.data_buffer_size, self.windows.long
            ));
            self.data_buffer_size = self.windows.long;
        }

        for (name, value) in [
            ("frame queue capacity", &mut self.frame_queue_capacity),
            ("suggestion queue capacity", &mut self.suggestion_queue_capacity),
            ("analysis batch size", &mut self.analysis_batch_size),
        ] {
            if *value == 0 {
                fixes.push(format!("{name} must be positive, using 1"));
                *value = 1;
            }
        }

        for fix in &fixes {
            log::warn!("Config: {}", fix);
        }
        fixes
    }
}

/// Observer of configuration changes.
pub trait ConfigListener: Send + Sync {
    /// Called after a new configuration has been installed.
    fn on_config_changed(&self, previous: &ProfilerConfig, current: &ProfilerConfig);
}

/// Shared, hot-reloadable access to a validated [`ProfilerConfig`].
#[derive(Clone)]
pub struct ConfigHandle {
    config: Arc<RwLock<ProfilerConfig>>,
    listeners: Arc<RwLock<Vec<Arc<dyn ConfigListener>>>>,
}

impl ConfigHandle {
    /// Validates `config` and wraps it for sharing.
    pub fn new(mut config: ProfilerConfig) -> Self {
        config.validate_and_fix();
        Self {
            config: Arc::new(RwLock::new(config)),
            listeners: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Runs `f` against the current configuration.
    pub fn read<R>(&self, f: impl FnOnce(&ProfilerConfig) -> R) -> R {
        let guard = self.config.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    /// Returns a copy of the current configuration.
    pub fn snapshot(&self) -> ProfilerConfig {
        self.read(ProfilerConfig::clone)
    }

    /// Validates and installs a new configuration, then notifies listeners.
    pub fn replace(&self, mut config: ProfilerConfig) -> Result<(), ConfigError> {
        config.validate_and_fix();
        let previous = {
            let mut guard = self.config.write().map_err(|_| ConfigError::LockPoisoned)?;
            std::mem::replace(&mut *guard, config.clone())
        };

        if previous != config {
            log::info!("Config: new configuration installed.");
            let listeners = self
                .listeners
                .read()
                .map_err(|_| ConfigError::LockPoisoned)?;
            for listener in listeners.iter() {
                listener.on_config_changed(&previous, &config);
            }
        }
        Ok(())
    }

    /// Applies `f` to a copy of the configuration and installs the result.
    pub fn update(&self, f: impl FnOnce(&mut ProfilerConfig)) -> Result<(), ConfigError> {
        let mut config = self.snapshot();
        f(&mut config);
        self.replace(config)
    }

    /// Reloads the configuration from a JSON file.
    pub fn reload_from_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        self.replace(ProfilerConfig::from_file(path)?)
    }

    /// Registers a listener notified on every effective change.
    pub fn subscribe(&self, listener: Arc<dyn ConfigListener>) {
        if let Ok(mut listeners) = self.listeners.write() {
            listeners.push(listener);
        }
    }
}

impl Default for ConfigHandle {
    fn default() -> Self {
        Self::new(ProfilerConfig::default())
    }
}

impl std::fmt::Debug for ConfigHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigHandle")
            .field("config", &self.snapshot())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_default_config_is_valid() {
        let mut config = ProfilerConfig::default();
        assert!(config.validate_and_fix().is_empty());
        assert_eq!(config.sampling_interval(), Duration::from_millis(50));
    }

    #[test]
    fn test_validate_fixes_inverted_fps_pair() {
        let mut config = ProfilerConfig::default();
        config.thresholds.fps.critical = 40.0;
        let fixes = config.validate_and_fix();
        assert_eq!(fixes.len(), 1);
        assert_eq!(config.thresholds.fps.critical, 25.0);
    }

    #[test]
    fn test_validate_fixes_inverted_memory_pair() {
        let mut config = ProfilerConfig::default();
        config.thresholds.memory_percent.warning = 97.0;
        config.validate_and_fix();
        assert_eq!(config.thresholds.memory_percent.critical, 99.0);
    }

    #[test]
    fn test_validate_clamps_sizes() {
        let mut config = ProfilerConfig {
            collection_frequency_hz: 500,
            data_buffer_size: 10,
            suggestion_queue_capacity: 0,
            ..Default::default()
        };
        config.validate_and_fix();
        assert_eq!(config.collection_frequency_hz, 60);
        // Raised to 100, then to the long window.
        assert_eq!(config.data_buffer_size, 600);
        assert_eq!(config.suggestion_queue_capacity, 1);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "optimization_suggestions_enabled": false,
            "thresholds": { "render_time_ms": 33.0 },
            "cooldown_overrides": { "ReduceParticles": 120 }
        }"#;
        let config = ProfilerConfig::from_json(json).unwrap();
        assert!(!config.optimization_suggestions_enabled);
        assert!(config.bottleneck_analysis_enabled);
        assert_eq!(config.thresholds.render_time_ms, 33.0);
        assert_eq!(config.thresholds.fps.warning, 30.0);
        assert_eq!(
            config.cooldown_overrides.get(&SuggestionType::ReduceParticles),
            Some(&120)
        );
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pulse.json");
        let mut config = ProfilerConfig::default();
        config.windows.long = 900;
        config.data_buffer_size = 1200;
        config.to_file(&path).unwrap();

        let loaded = ProfilerConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        assert!(matches!(
            ProfilerConfig::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    struct CountingListener(AtomicUsize);

    impl ConfigListener for CountingListener {
        fn on_config_changed(&self, previous: &ProfilerConfig, current: &ProfilerConfig) {
            assert_ne!(previous, current);
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_handle_hot_reload_notifies_listeners() {
        let handle = ConfigHandle::default();
        let listener = Arc::new(CountingListener(AtomicUsize::new(0)));
        handle.subscribe(listener.clone());

        handle
            .update(|c| c.thresholds.render_time_ms = 25.0)
            .unwrap();
        assert_eq!(handle.read(|c| c.thresholds.render_time_ms), 25.0);
        assert_eq!(listener.0.load(Ordering::SeqCst), 1);

        // Identical configuration: no notification.
        handle.replace(handle.snapshot()).unwrap();
        assert_eq!(listener.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handle_validates_replacement() {
        let handle = ConfigHandle::default();
        let mut config = ProfilerConfig::default();
        config.thresholds.fps.critical = 60.0;
        handle.replace(config).unwrap();
        assert_eq!(handle.read(|c| c.thresholds.fps.critical), 25.0);
    }
}
