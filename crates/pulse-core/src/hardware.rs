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

//! Description of the machine the host application runs on.
//!
//! The advisor uses the profile to withhold suggestions the hardware cannot
//! benefit from, and to remember which suggestions worked on similar machines.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Graphics adapter family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GpuType {
    /// Dedicated NVIDIA adapter.
    Nvidia,
    /// Dedicated AMD adapter.
    Amd,
    /// Integrated graphics sharing system memory.
    Integrated,
    /// Present but not identified.
    #[default]
    Unknown,
    /// No graphics adapter.
    None,
}

/// Coarse classification of the machine's capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PerformanceTier {
    /// Barely meets minimum requirements.
    Potato,
    /// Entry level.
    LowEnd,
    /// Mainstream.
    MidRange,
    /// Enthusiast.
    HighEnd,
}

/// Static description of the host machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareProfile {
    /// Logical CPU cores.
    pub cpu_cores: u32,
    /// CPU brand string.
    pub cpu_name: String,
    /// Installed memory in whole GiB.
    pub total_memory_gb: u32,
    /// Graphics adapter family.
    pub gpu_type: GpuType,
    /// Graphics adapter name.
    pub gpu_name: String,
    /// Operating system name.
    pub os_name: String,
    /// CPU architecture (e.g. `x86_64`).
    pub os_arch: String,
}

/// The subset of a [`HardwareProfile`] that identifies "the same kind of machine".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HardwareKey {
    cpu_cores: u32,
    total_memory_gb: u32,
    gpu_type: GpuType,
    os_name: String,
    os_arch: String,
}

impl Default for HardwareProfile {
    /// Fallback used when detection is unavailable: 4 cores, 8 GiB, unknown GPU.
    fn default() -> Self {
        Self {
            cpu_cores: 4,
            cpu_name: "Unknown CPU".to_string(),
            total_memory_gb: 8,
            gpu_type: GpuType::Unknown,
            gpu_name: "Unknown GPU".to_string(),
            os_name: std::env::consts::OS.to_string(),
            os_arch: std::env::consts::ARCH.to_string(),
        }
    }
}

impl HardwareProfile {
    /// Identity used for per-machine preferences.
    pub fn key(&self) -> HardwareKey {
        HardwareKey {
            cpu_cores: self.cpu_cores,
            total_memory_gb: self.total_memory_gb,
            gpu_type: self.gpu_type,
            os_name: self.os_name.clone(),
            os_arch: self.os_arch.clone(),
        }
    }

    /// Capability score from 0 to 100.
    pub fn capability_score(&self) -> u32 {
        let cpu = match self.cpu_cores {
            c if c >= 8 => 30,
            c if c >= 6 => 25,
            c if c >= 4 => 20,
            c if c >= 2 => 10,
            _ => 0,
        };

        let memory = match self.total_memory_gb {
            m if m >= 32 => 25,
            m if m >= 16 => 20,
            m if m >= 8 => 15,
            m if m >= 4 => 10,
            m if m >= 2 => 5,
            _ => 0,
        };

        let gpu = match self.gpu_type {
            GpuType::Nvidia | GpuType::Amd => self.dedicated_gpu_score(),
            GpuType::Integrated => 5,
            GpuType::Unknown => 10,
            GpuType::None => 0,
        };

        let arch = if self.os_arch.contains("64") { 20 } else { 10 };

        cpu + memory + gpu + arch
    }

    fn dedicated_gpu_score(&self) -> u32 {
        let name = self.gpu_name.to_lowercase();
        let (high, mid): (&[&str], &[&str]) = match self.gpu_type {
            GpuType::Nvidia => (
                &["rtx 40", "rtx 30", "gtx 1080", "gtx 1070", "quadro", "titan"],
                &["gtx 1060", "gtx 1050", "rtx 20", "gtx 16"],
            ),
            _ => (
                &["rx 6", "rx 7", "rx 580", "rx 570", "vega"],
                &["rx 5", "rx 4", "rx 560", "rx 550"],
            ),
        };

        if high.iter().any(|model| name.contains(model)) {
            25
        } else if mid.iter().any(|model| name.contains(model)) {
            20
        } else {
            15
        }
    }

    /// Tier derived from [`capability_score`](Self::capability_score).
    pub fn performance_tier(&self) -> PerformanceTier {
        match self.capability_score() {
            s if s >= 75 => PerformanceTier::HighEnd,
            s if s >= 50 => PerformanceTier::MidRange,
            s if s >= 25 => PerformanceTier::LowEnd,
            _ => PerformanceTier::Potato,
        }
    }

    /// Render distance (in chunks) the machine handles comfortably.
    pub fn recommended_render_distance(&self) -> u32 {
        match self.performance_tier() {
            PerformanceTier::HighEnd => 16,
            PerformanceTier::MidRange => 12,
            PerformanceTier::LowEnd => 8,
            PerformanceTier::Potato => 6,
        }
    }

    /// Heap size (GiB) worth allocating to the host application.
    pub fn recommended_memory_allocation_gb(&self) -> u32 {
        let cap = match self.performance_tier() {
            PerformanceTier::HighEnd => 8,
            PerformanceTier::MidRange => 6,
            PerformanceTier::LowEnd => 4,
            PerformanceTier::Potato => 2,
        };
        cap.min(self.total_memory_gb / 2)
    }

    /// `true` when high graphics presets are reasonable.
    pub fn can_handle_high_graphics(&self) -> bool {
        let tier = self.performance_tier();
        tier == PerformanceTier::HighEnd
            || (tier == PerformanceTier::MidRange && self.total_memory_gb >= 16)
    }

    /// `true` if a GPU is available for hardware acceleration.
    pub fn supports_hardware_acceleration(&self) -> bool {
        self.gpu_type != GpuType::None && self.os_arch != "x86"
    }
}

impl fmt::Display for HardwareProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cores, {} GiB, {:?} GPU ({:?})",
            self.cpu_cores,
            self.total_memory_gb,
            self.gpu_type,
            self.performance_tier()
        )
    }
}

/// A source of hardware information.
pub trait HardwareProbe: Send + Sync {
    /// Returns the current hardware profile.
    fn profile(&self) -> HardwareProfile;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(cores: u32, memory: u32, gpu_type: GpuType, gpu_name: &str) -> HardwareProfile {
        HardwareProfile {
            cpu_cores: cores,
            cpu_name: "Test CPU".into(),
            total_memory_gb: memory,
            gpu_type,
            gpu_name: gpu_name.into(),
            os_name: "linux".into(),
            os_arch: "x86_64".into(),
        }
    }

    #[test]
    fn test_high_end_tier() {
        let p = profile(16, 32, GpuType::Nvidia, "GeForce RTX 4080");
        assert_eq!(p.capability_score(), 100);
        assert_eq!(p.performance_tier(), PerformanceTier::HighEnd);
        assert_eq!(p.recommended_render_distance(), 16);
        assert_eq!(p.recommended_memory_allocation_gb(), 8);
    }

    #[test]
    fn test_mid_range_amd() {
        // 20 (4 cores) + 15 (8 GiB) + 20 (mid AMD) + 20 (64-bit)
        let p = profile(4, 8, GpuType::Amd, "Radeon RX 5500");
        assert_eq!(p.capability_score(), 75);
        // "rx 5" matches the mid-range list, "rx 580" would be high end.
        let high = profile(4, 8, GpuType::Amd, "Radeon RX 580");
        assert_eq!(high.capability_score(), 80);
    }

    #[test]
    fn test_potato_tier() {
        let mut p = profile(1, 1, GpuType::None, "");
        p.os_arch = "x86".into();
        assert_eq!(p.performance_tier(), PerformanceTier::Potato);
        assert_eq!(p.recommended_render_distance(), 6);
        assert_eq!(p.recommended_memory_allocation_gb(), 0);
        assert!(!p.supports_hardware_acceleration());
    }

    #[test]
    fn test_default_profile_is_mid_range() {
        let p = HardwareProfile::default();
        assert_eq!(p.cpu_cores, 4);
        assert_eq!(p.total_memory_gb, 8);
        assert_eq!(p.gpu_type, GpuType::Unknown);
    }

    #[test]
    fn test_key_ignores_names() {
        let a = profile(8, 16, GpuType::Nvidia, "RTX 3070");
        let mut b = a.clone();
        b.gpu_name = "Some other name".into();
        b.cpu_name = "Other".into();
        assert_eq!(a.key(), b.key());

        b.total_memory_gb = 32;
        assert_ne!(a.key(), b.key());
    }
}
