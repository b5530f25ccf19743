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

//! The closed set of performance problems the analyzer can detect.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How harmful an issue is to the user experience.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IssueSeverity {
    /// Barely noticeable.
    Low,
    /// Noticeable degradation.
    Medium,
    /// Significant degradation.
    High,
    /// The application is close to unusable.
    Critical,
}

impl IssueSeverity {
    /// Numeric weight, 1 (low) to 4 (critical).
    pub fn weight(self) -> u32 {
        match self {
            IssueSeverity::Low => 1,
            IssueSeverity::Medium => 2,
            IssueSeverity::High => 3,
            IssueSeverity::Critical => 4,
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            IssueSeverity::Low => "Low",
            IssueSeverity::Medium => "Medium",
            IssueSeverity::High => "High",
            IssueSeverity::Critical => "Critical",
        }
    }
}

/// The subsystem an issue belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IssueCategory {
    /// Frame production and GPU work.
    Rendering,
    /// Heap, off-heap and garbage collection.
    Memory,
    /// Chunks, entities and world simulation.
    World,
    /// Connection quality.
    Network,
    /// CPU, disk and threading.
    System,
}

impl IssueCategory {
    /// Weight used when ranking issues of equal severity.
    pub fn weight(self) -> u32 {
        match self {
            IssueCategory::Rendering => 4,
            IssueCategory::Memory => 3,
            IssueCategory::World => 2,
            IssueCategory::Network => 1,
            IssueCategory::System => 2,
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            IssueCategory::Rendering => "Rendering",
            IssueCategory::Memory => "Memory",
            IssueCategory::World => "World",
            IssueCategory::Network => "Network",
            IssueCategory::System => "System",
        }
    }
}

/// A detectable performance problem.
///
/// Severity and category are fixed per kind. The declaration order is the
/// order in which trackers are created and iterated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IssueKind {
    /// Frame rate below the warning threshold.
    LowFps,
    /// Frame rate below the critical threshold.
    CriticalFps,
    /// Frame rate varies strongly between samples.
    FpsInstability,
    /// Individual frames take far longer than their neighbours.
    FrameTimeSpikes,
    /// Heap usage above the warning threshold.
    HighMemoryUsage,
    /// Heap usage above the critical threshold.
    CriticalMemoryUsage,
    /// Heap usage keeps growing.
    MemoryLeak,
    /// Garbage collection is running too often or too long.
    GcPressure,
    /// Memory outside the managed heap is unusually large.
    OffHeapMemory,
    /// Rendering a frame takes too long.
    RenderLag,
    /// Rendering dominates the frame time.
    GpuBottleneck,
    /// Shader compilation or overdraw is expensive.
    ShaderPerformance,
    /// Too many draw calls per frame.
    ExcessiveDrawCalls,
    /// Too many chunks are loaded.
    ExcessiveChunks,
    /// Chunk rebuilds are backing up.
    ChunkUpdateLag,
    /// Too many entities are alive.
    ExcessiveEntities,
    /// Entity updates are slow.
    EntityLag,
    /// Tile entities are numerous or slow.
    TileEntityLag,
    /// Round-trip latency is high.
    NetworkLag,
    /// Packets are being lost.
    PacketLoss,
    /// Throughput is unusually high.
    NetworkBandwidth,
    /// Simulation ticks are CPU bound.
    HighCpuUsage,
    /// Chunk I/O is slow.
    DiskIoBottleneck,
    /// A tick took far longer than the running average.
    ThreadContention,
}

impl IssueKind {
    /// Every issue kind, in declaration order.
    pub const ALL: [IssueKind; 24] = [
        IssueKind::LowFps,
        IssueKind::CriticalFps,
        IssueKind::FpsInstability,
        IssueKind::FrameTimeSpikes,
        IssueKind::HighMemoryUsage,
        IssueKind::CriticalMemoryUsage,
        IssueKind::MemoryLeak,
        IssueKind::GcPressure,
        IssueKind::OffHeapMemory,
        IssueKind::RenderLag,
        IssueKind::GpuBottleneck,
        IssueKind::ShaderPerformance,
        IssueKind::ExcessiveDrawCalls,
        IssueKind::ExcessiveChunks,
        IssueKind::ChunkUpdateLag,
        IssueKind::ExcessiveEntities,
        IssueKind::EntityLag,
        IssueKind::TileEntityLag,
        IssueKind::NetworkLag,
        IssueKind::PacketLoss,
        IssueKind::NetworkBandwidth,
        IssueKind::HighCpuUsage,
        IssueKind::DiskIoBottleneck,
        IssueKind::ThreadContention,
    ];

    /// Fixed severity of this kind.
    pub fn severity(self) -> IssueSeverity {
        use IssueKind::*;
        match self {
            CriticalFps | CriticalMemoryUsage => IssueSeverity::Critical,
            FrameTimeSpikes | MemoryLeak | GpuBottleneck | ThreadContention => IssueSeverity::High,
            NetworkLag | NetworkBandwidth => IssueSeverity::Low,
            _ => IssueSeverity::Medium,
        }
    }

    /// Fixed category of this kind.
    pub fn category(self) -> IssueCategory {
        use IssueKind::*;
        match self {
            LowFps | CriticalFps | FpsInstability | FrameTimeSpikes | RenderLag | GpuBottleneck
            | ShaderPerformance | ExcessiveDrawCalls => IssueCategory::Rendering,
            HighMemoryUsage | CriticalMemoryUsage | MemoryLeak | GcPressure | OffHeapMemory => {
                IssueCategory::Memory
            }
            ExcessiveChunks | ChunkUpdateLag | ExcessiveEntities | EntityLag | TileEntityLag => {
                IssueCategory::World
            }
            NetworkLag | PacketLoss | NetworkBandwidth => IssueCategory::Network,
            HighCpuUsage | DiskIoBottleneck | ThreadContention => IssueCategory::System,
        }
    }

    /// `true` for High and Critical kinds, which are escalated to the advisor.
    pub fn is_escalated(self) -> bool {
        self.severity() >= IssueSeverity::High
    }

    /// Ranking score: `severity * 10 + category`.
    pub fn priority_score(self) -> u32 {
        self.severity().weight() * 10 + self.category().weight()
    }

    /// Short display name.
    pub fn display_name(self) -> &'static str {
        use IssueKind::*;
        match self {
            LowFps => "Low FPS",
            CriticalFps => "Critical FPS",
            FpsInstability => "FPS Instability",
            FrameTimeSpikes => "Frame Time Spikes",
            HighMemoryUsage => "High Memory Usage",
            CriticalMemoryUsage => "Critical Memory Usage",
            MemoryLeak => "Memory Leak",
            GcPressure => "GC Pressure",
            OffHeapMemory => "Off-Heap Memory",
            RenderLag => "Render Lag",
            GpuBottleneck => "GPU Bottleneck",
            ShaderPerformance => "Shader Performance",
            ExcessiveDrawCalls => "Excessive Draw Calls",
            ExcessiveChunks => "Excessive Chunks",
            ChunkUpdateLag => "Chunk Update Lag",
            ExcessiveEntities => "Excessive Entities",
            EntityLag => "Entity Lag",
            TileEntityLag => "Tile Entity Lag",
            NetworkLag => "Network Lag",
            PacketLoss => "Packet Loss",
            NetworkBandwidth => "Network Bandwidth",
            HighCpuUsage => "High CPU Usage",
            DiskIoBottleneck => "Disk I/O Bottleneck",
            ThreadContention => "Thread Contention",
        }
    }

    /// One-sentence explanation shown to users.
    pub fn description(self) -> &'static str {
        use IssueKind::*;
        match self {
            LowFps => "Frame rate is below the comfortable threshold",
            CriticalFps => "Frame rate is critically low",
            FpsInstability => "Frame rate fluctuates strongly",
            FrameTimeSpikes => "Some frames take much longer than usual",
            HighMemoryUsage => "Heap usage is high",
            CriticalMemoryUsage => "Heap is almost exhausted",
            MemoryLeak => "Heap usage keeps growing over time",
            GcPressure => "Garbage collection is running too often",
            OffHeapMemory => "Native memory usage is unusually large",
            RenderLag => "Rendering a frame takes too long",
            GpuBottleneck => "The GPU is the limiting factor",
            ShaderPerformance => "Shaders are expensive to compile or draw",
            ExcessiveDrawCalls => "Too many draw calls are issued per frame",
            ExcessiveChunks => "Too many chunks are loaded",
            ChunkUpdateLag => "Chunk rebuilds are falling behind",
            ExcessiveEntities => "Too many entities are alive",
            EntityLag => "Entity updates are slow",
            TileEntityLag => "Tile entities are slowing down the world tick",
            NetworkLag => "Network latency is high",
            PacketLoss => "Network packets are being lost",
            NetworkBandwidth => "Network throughput is unusually high",
            HighCpuUsage => "Simulation ticks are CPU bound",
            DiskIoBottleneck => "Loading data from disk is slow",
            ThreadContention => "A tick took far longer than average",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_all_kinds_are_unique() {
        let unique: HashSet<_> = IssueKind::ALL.iter().collect();
        assert_eq!(unique.len(), IssueKind::ALL.len());
    }

    #[test]
    fn test_severity_table() {
        assert_eq!(IssueKind::CriticalFps.severity(), IssueSeverity::Critical);
        assert_eq!(IssueKind::MemoryLeak.severity(), IssueSeverity::High);
        assert_eq!(IssueKind::NetworkLag.severity(), IssueSeverity::Low);
        assert_eq!(IssueKind::LowFps.severity(), IssueSeverity::Medium);
        assert_eq!(IssueKind::ThreadContention.severity(), IssueSeverity::High);
    }

    #[test]
    fn test_escalation_only_for_high_and_critical() {
        let escalated: Vec<_> = IssueKind::ALL
            .iter()
            .copied()
            .filter(|k| k.is_escalated())
            .collect();
        assert_eq!(
            escalated,
            vec![
                IssueKind::CriticalFps,
                IssueKind::FrameTimeSpikes,
                IssueKind::CriticalMemoryUsage,
                IssueKind::MemoryLeak,
                IssueKind::GpuBottleneck,
                IssueKind::ThreadContention,
            ]
        );
    }

    #[test]
    fn test_priority_score() {
        // Critical (4) * 10 + Rendering (4)
        assert_eq!(IssueKind::CriticalFps.priority_score(), 44);
        // Low (1) * 10 + Network (1)
        assert_eq!(IssueKind::NetworkLag.priority_score(), 11);
    }
}
