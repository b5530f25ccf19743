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

//! sysinfo-based implementation of the [`HardwareProbe`] trait.

use pulse_core::hardware::{GpuType, HardwareProbe, HardwareProfile};
use std::sync::{Arc, Mutex};
use sysinfo::System;

const BYTES_PER_GIB: u64 = 1024 * 1024 * 1024;

/// A hardware probe backed by the `sysinfo` crate.
///
/// `sysinfo` does not report graphics adapters, so the GPU is `Unknown`
/// unless the host supplies it with [`with_gpu`](Self::with_gpu).
pub struct SysinfoProbe {
    system: Arc<Mutex<System>>,
    gpu: (GpuType, String),
}

impl SysinfoProbe {
    /// Creates a probe and takes an initial snapshot of the system.
    pub fn new() -> Self {
        let mut system = System::new_all();
        system.refresh_all();
        Self {
            system: Arc::new(Mutex::new(system)),
            gpu: (GpuType::Unknown, "Unknown GPU".to_string()),
        }
    }

    /// Overrides the graphics adapter reported in profiles.
    pub fn with_gpu(mut self, gpu_type: GpuType, gpu_name: impl Into<String>) -> Self {
        self.gpu = (gpu_type, gpu_name.into());
        self
    }

    /// Refreshes memory and CPU readings.
    pub fn refresh(&self) {
        if let Ok(mut system) = self.system.lock() {
            system.refresh_memory();
            system.refresh_cpu_all();
        }
    }
}

impl HardwareProbe for SysinfoProbe {
    fn profile(&self) -> HardwareProfile {
        let fallback = HardwareProfile::default();
        let Ok(system) = self.system.lock() else {
            log::warn!("Hardware: system snapshot unavailable, using default profile.");
            return fallback;
        };

        let cpu_cores = match system.cpus().len() {
            0 => fallback.cpu_cores,
            n => n as u32,
        };
        let cpu_name = system
            .cpus()
            .first()
            .map(|cpu| cpu.brand().trim().to_string())
            .filter(|brand| !brand.is_empty())
            .unwrap_or(fallback.cpu_name);
        // Round to the nearest GiB: firmware reservations make totals slightly short.
        let total_memory_gb = ((system.total_memory() + BYTES_PER_GIB / 2) / BYTES_PER_GIB) as u32;

        let profile = HardwareProfile {
            cpu_cores,
            cpu_name,
            total_memory_gb,
            gpu_type: self.gpu.0,
            gpu_name: self.gpu.1.clone(),
            os_name: System::name().unwrap_or(fallback.os_name),
            os_arch: fallback.os_arch,
        };

        log::debug!("Hardware: detected {}", profile);
        profile
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}
