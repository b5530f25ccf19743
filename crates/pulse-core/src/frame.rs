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

//! Metric snapshots ("frames") produced by the host application.
//!
//! A [`MetricFrame`] is an immutable, timestamped sample of every metric group
//! the analyzer understands. Frames are built by the external collector and
//! only ever read by the analysis core.

use crate::error::FrameError;
use serde::{Deserialize, Serialize};

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Which side of the host produced the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FrameSource {
    /// The interactive client (rendering, input).
    #[default]
    Client,
    /// A simulation or dedicated server process.
    Server,
}

/// Heap, off-heap and garbage collection readings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    /// Heap bytes in use.
    pub heap_used_bytes: u64,
    /// Maximum heap size in bytes, `0` if unknown.
    pub heap_max_bytes: u64,
    /// Heap bytes committed by the runtime.
    pub heap_committed_bytes: u64,
    /// Bytes used outside the managed heap.
    pub non_heap_used_bytes: u64,
    /// Time spent collecting garbage since the previous frame.
    pub gc_time_ms: f64,
    /// Number of collections since the previous frame.
    pub gc_collections: u32,
}

impl MemoryStats {
    /// Heap usage as a percentage of the maximum heap, `0.0` when the maximum is unknown.
    pub fn heap_usage_percent(&self) -> f64 {
        if self.heap_max_bytes == 0 {
            return 0.0;
        }
        self.heap_used_bytes as f64 * 100.0 / self.heap_max_bytes as f64
    }

    /// Off-heap usage in MiB.
    pub fn non_heap_used_mib(&self) -> f64 {
        self.non_heap_used_bytes as f64 / BYTES_PER_MIB
    }

    /// Maximum heap in MiB.
    pub fn heap_max_mib(&self) -> f64 {
        self.heap_max_bytes as f64 / BYTES_PER_MIB
    }
}

/// Rendering timings and workload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderStats {
    /// Time spent rendering the last frame.
    pub render_time_ms: f64,
    /// Total frame time, `0.0` to derive it from the frame rate.
    pub frame_time_ms: f64,
    /// Draw calls issued for the last frame.
    pub draw_calls: u32,
    /// Time spent compiling shaders.
    pub shader_compile_time_ms: f64,
    /// Average number of times each pixel was shaded.
    pub overdraw_factor: f64,
}

/// Loaded world state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldStats {
    /// Chunks currently loaded.
    pub loaded_chunks: u32,
    /// Configured render distance in chunks.
    pub render_distance: u32,
    /// Configured simulation distance in chunks.
    pub simulation_distance: u32,
    /// Chunk rebuilds performed during the last frame.
    pub chunk_updates: u32,
    /// Time spent loading chunks.
    pub chunk_load_time_ms: f64,
}

/// Entity population and update cost.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityStats {
    /// Entities alive in the world.
    pub total_entities: u32,
    /// Entities drawn during the last frame.
    pub rendered_entities: u32,
    /// Time spent ticking entities.
    pub entity_tick_time_ms: f64,
    /// Block/tile entities alive in the world.
    pub tile_entity_count: u32,
    /// Time spent ticking tile entities.
    pub tile_entity_tick_time_ms: f64,
}

/// Simulation tick timings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemStats {
    /// Duration of the last simulation tick.
    pub tick_time_ms: f64,
    /// Rolling average tick duration reported by the host.
    pub average_tick_time_ms: f64,
}

/// Network link quality.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkStats {
    /// Round-trip latency.
    pub latency_ms: f64,
    /// Lost packets as a percentage of sent packets.
    pub packet_loss_percent: f64,
    /// Combined inbound and outbound throughput.
    pub bytes_per_second: u64,
    /// `true` when connected to a remote session.
    pub remote: bool,
}

/// One timestamped snapshot of every metric group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricFrame {
    /// Monotonic capture time in milliseconds.
    pub timestamp_ms: u64,
    /// Producer of the frame.
    pub source: FrameSource,
    /// Frames per second measured over the sampling interval.
    pub fps: u32,
    /// Memory readings.
    pub memory: MemoryStats,
    /// Rendering readings.
    pub render: RenderStats,
    /// World readings.
    pub world: WorldStats,
    /// Entity readings.
    pub entities: EntityStats,
    /// Simulation tick readings.
    pub system: SystemStats,
    /// Network readings.
    pub network: NetworkStats,
}

impl MetricFrame {
    /// Creates an otherwise empty client frame.
    pub fn at(timestamp_ms: u64, fps: u32) -> Self {
        Self {
            timestamp_ms,
            fps,
            ..Default::default()
        }
    }

    /// Frame time in milliseconds, derived from the frame rate when not reported.
    pub fn frame_time_ms(&self) -> f64 {
        if self.render.frame_time_ms > 0.0 {
            self.render.frame_time_ms
        } else {
            1000.0 / self.fps.max(1) as f64
        }
    }

    /// Checks that every reading is usable by the analyzer.
    pub fn validate(&self) -> Result<(), FrameError> {
        let readings = [
            ("memory.gc_time_ms", self.memory.gc_time_ms),
            ("render.render_time_ms", self.render.render_time_ms),
            ("render.frame_time_ms", self.render.frame_time_ms),
            (
                "render.shader_compile_time_ms",
                self.render.shader_compile_time_ms,
            ),
            ("render.overdraw_factor", self.render.overdraw_factor),
            ("world.chunk_load_time_ms", self.world.chunk_load_time_ms),
            (
                "entities.entity_tick_time_ms",
                self.entities.entity_tick_time_ms,
            ),
            (
                "entities.tile_entity_tick_time_ms",
                self.entities.tile_entity_tick_time_ms,
            ),
            ("system.tick_time_ms", self.system.tick_time_ms),
            (
                "system.average_tick_time_ms",
                self.system.average_tick_time_ms,
            ),
            ("network.latency_ms", self.network.latency_ms),
            (
                "network.packet_loss_percent",
                self.network.packet_loss_percent,
            ),
        ];

        for (field, value) in readings {
            if !value.is_finite() || value < 0.0 {
                return Err(FrameError::InvalidMetric { field, value });
            }
        }

        if self.network.packet_loss_percent > 100.0 {
            return Err(FrameError::InvalidMetric {
                field: "network.packet_loss_percent",
                value: self.network.packet_loss_percent,
            });
        }

        if self.memory.heap_max_bytes > 0 && self.memory.heap_used_bytes > self.memory.heap_max_bytes
        {
            return Err(FrameError::HeapOverflow {
                used: self.memory.heap_used_bytes,
                max: self.memory.heap_max_bytes,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_heap_usage_percent() {
        let memory = MemoryStats {
            heap_used_bytes: 750,
            heap_max_bytes: 1000,
            ..Default::default()
        };
        assert_relative_eq!(memory.heap_usage_percent(), 75.0);
        assert_eq!(MemoryStats::default().heap_usage_percent(), 0.0);
    }

    #[test]
    fn test_frame_time_derived_from_fps() {
        let frame = MetricFrame::at(0, 50);
        assert_relative_eq!(frame.frame_time_ms(), 20.0);

        let zero_fps = MetricFrame::at(0, 0);
        assert_relative_eq!(zero_fps.frame_time_ms(), 1000.0);

        let mut reported = MetricFrame::at(0, 50);
        reported.render.frame_time_ms = 12.5;
        assert_relative_eq!(reported.frame_time_ms(), 12.5);
    }

    #[test]
    fn test_validate_accepts_default_frame() {
        assert!(MetricFrame::at(10, 60).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_nan_and_negative() {
        let mut frame = MetricFrame::at(10, 60);
        frame.render.render_time_ms = f64::NAN;
        assert!(matches!(
            frame.validate(),
            Err(FrameError::InvalidMetric {
                field: "render.render_time_ms",
                ..
            })
        ));

        let mut frame = MetricFrame::at(10, 60);
        frame.network.latency_ms = -1.0;
        assert!(frame.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_heap_overflow() {
        let mut frame = MetricFrame::at(10, 60);
        frame.memory.heap_used_bytes = 2048;
        frame.memory.heap_max_bytes = 1024;
        assert_eq!(
            frame.validate(),
            Err(FrameError::HeapOverflow {
                used: 2048,
                max: 1024
            })
        );
    }
}
