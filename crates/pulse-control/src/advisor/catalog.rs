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

//! Static knowledge of the advisor: which remediations apply to which
//! issue, how good they are, and how to present them.

use pulse_core::frame::MetricFrame;
use pulse_core::hardware::HardwareProfile;
use pulse_core::issue::{IssueKind, IssueSeverity};
use pulse_core::suggestion::{AutoApplyAction, SuggestionType};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;

use IssueKind as I;
use SuggestionType as S;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;

/// Render distance at or below which reducing it further is pointless.
pub const MIN_USEFUL_RENDER_DISTANCE: u32 = 8;
/// Rendered entities above which entity rendering is worth optimizing.
pub const ENTITY_RENDERING_MIN: u32 = 100;

const FPS_CANDIDATES: &[SuggestionType] = &[
    S::ReduceRenderDistance,
    S::OptimizeGraphicsSettings,
    S::ReduceParticles,
    S::DisableSmoothLighting,
    S::OptimizeEntityRendering,
];
const MEMORY_CANDIDATES: &[SuggestionType] = &[
    S::AdjustMemoryAllocation,
    S::CleanupWorldData,
    S::ReduceLoadedChunks,
    S::RestartGame,
    S::CloseUnnecessaryApplications,
];
const LEAK_CANDIDATES: &[SuggestionType] = &[
    S::RestartGame,
    S::DisableProblematicMods,
    S::UpdateMods,
    S::ReportBug,
];
const RENDER_CANDIDATES: &[SuggestionType] = &[
    S::OptimizeGraphicsSettings,
    S::UpdateDrivers,
    S::ReduceRenderDistance,
    S::DisableShaders,
    S::OptimizeTexturePack,
];
const CHUNK_CANDIDATES: &[SuggestionType] = &[
    S::ReduceRenderDistance,
    S::ReduceSimulationDistance,
    S::CleanupWorldData,
    S::OptimizeWorldGeneration,
];
const ENTITY_CANDIDATES: &[SuggestionType] = &[
    S::ReduceEntityCount,
    S::OptimizeEntityRendering,
    S::ImplementEntityCulling,
    S::AdjustSpawningSettings,
];
const GC_CANDIDATES: &[SuggestionType] = &[
    S::OptimizeRuntimeFlags,
    S::AdjustMemoryAllocation,
    S::ReduceMemoryUsage,
    S::UpdateRuntime,
];
const NETWORK_CANDIDATES: &[SuggestionType] = &[
    S::OptimizeNetworkSettings,
    S::ReduceNetworkUsage,
    S::CheckInternetConnection,
    S::ChangeServer,
];
const GENERAL_CANDIDATES: &[SuggestionType] = &[S::GeneralPerformanceTips];

/// Remediations applicable to an issue, in preference order.
pub fn candidates(issue: IssueKind) -> &'static [SuggestionType] {
    match issue {
        I::LowFps | I::CriticalFps => FPS_CANDIDATES,
        I::HighMemoryUsage | I::CriticalMemoryUsage => MEMORY_CANDIDATES,
        I::MemoryLeak => LEAK_CANDIDATES,
        I::RenderLag | I::GpuBottleneck => RENDER_CANDIDATES,
        I::ExcessiveChunks => CHUNK_CANDIDATES,
        I::ExcessiveEntities => ENTITY_CANDIDATES,
        I::GcPressure => GC_CANDIDATES,
        I::NetworkLag => NETWORK_CANDIDATES,
        _ => GENERAL_CANDIDATES,
    }
}

/// Intrinsic effectiveness of a remediation for an issue.
pub fn base_score(suggestion: SuggestionType, issue: IssueKind) -> f64 {
    match issue {
        I::LowFps | I::CriticalFps => match suggestion {
            S::ReduceRenderDistance => 9.0,
            S::OptimizeGraphicsSettings => 8.5,
            S::DisableShaders => 9.5,
            S::ReduceParticles => 7.0,
            S::OptimizeEntityRendering => 7.5,
            _ => 5.0,
        },
        I::HighMemoryUsage | I::CriticalMemoryUsage => match suggestion {
            S::AdjustMemoryAllocation => 9.0,
            S::CleanupWorldData => 8.0,
            S::RestartGame => 8.5,
            S::ReduceLoadedChunks => 7.5,
            _ => 4.0,
        },
        I::RenderLag | I::GpuBottleneck => match suggestion {
            S::OptimizeGraphicsSettings => 9.0,
            S::UpdateDrivers => 8.5,
            S::DisableShaders => 9.0,
            S::ReduceRenderDistance => 7.5,
            _ => 5.0,
        },
        _ => 5.0,
    }
}

/// Built-in minimum delay between two suggestions of the same type.
pub fn default_cooldown(suggestion: SuggestionType) -> Option<Duration> {
    let secs = match suggestion {
        S::ReduceRenderDistance => 5 * MINUTE,
        S::OptimizeGraphicsSettings => 3 * MINUTE,
        S::AdjustMemoryAllocation => 10 * MINUTE,
        S::CleanupWorldData => 15 * MINUTE,
        S::RestartGame | S::DisableProblematicMods => 30 * MINUTE,
        S::OptimizeRuntimeFlags => HOUR,
        S::UpdateDrivers => 24 * HOUR,
        _ => return None,
    };
    Some(Duration::from_secs(secs))
}

/// Effort on a 1 to 5 scale.
pub fn difficulty(suggestion: SuggestionType) -> u8 {
    match suggestion {
        S::ReduceRenderDistance
        | S::OptimizeGraphicsSettings
        | S::RestartGame
        | S::ReduceParticles
        | S::DisableSmoothLighting => 1,
        S::AdjustMemoryAllocation | S::DisableProblematicMods | S::UpdateMods => 2,
        S::OptimizeRuntimeFlags | S::CleanupWorldData | S::UpdateDrivers => 3,
        S::ImplementEntityCulling | S::OptimizeWorldGeneration | S::OptimizeNetworkSettings => 4,
        S::UpdateRuntime | S::EnableHardwareAcceleration | S::OptimizeCpuSettings => 5,
        _ => 3,
    }
}

/// Expected benefit on a 1 to 5 scale. Critical issues gain one point.
pub fn impact(suggestion: SuggestionType, issue: IssueKind) -> u8 {
    let base: u8 = match suggestion {
        S::ReduceRenderDistance | S::DisableShaders => 5,
        S::OptimizeGraphicsSettings | S::AdjustMemoryAllocation => 4,
        S::OptimizeRuntimeFlags
        | S::UpdateDrivers
        | S::RestartGame
        | S::CloseUnnecessaryApplications => 3,
        _ => 2,
    };
    if issue.severity() == IssueSeverity::Critical {
        (base + 1).min(5)
    } else {
        base
    }
}

/// Expected time to apply, in minutes.
pub fn estimated_minutes(suggestion: SuggestionType) -> u32 {
    match suggestion {
        S::ReduceRenderDistance
        | S::OptimizeGraphicsSettings
        | S::ReduceParticles
        | S::DisableSmoothLighting => 1,
        S::RestartGame | S::DisableProblematicMods => 2,
        S::AdjustMemoryAllocation | S::OptimizeRuntimeFlags => 5,
        S::UpdateDrivers | S::UpdateMods => 15,
        S::CleanupWorldData => 30,
        S::UpdateRuntime | S::EnableHardwareAcceleration => 45,
        _ => 10,
    }
}

/// Headline of a suggestion.
pub fn title(suggestion: SuggestionType) -> &'static str {
    match suggestion {
        S::ReduceRenderDistance => "Reduce Render Distance",
        S::OptimizeGraphicsSettings => "Optimize Graphics Settings",
        S::DisableShaders => "Disable Shaders",
        S::ReduceParticles => "Reduce Particle Effects",
        S::DisableSmoothLighting => "Disable Smooth Lighting",
        S::OptimizeTexturePack => "Optimize Texture Pack",
        S::OptimizeEntityRendering => "Optimize Entity Rendering",
        S::AdjustMemoryAllocation => "Adjust Memory Allocation",
        S::ReduceMemoryUsage => "Reduce Memory Usage",
        S::CleanupWorldData => "Clean Up World Data",
        S::RestartGame => "Restart the Game",
        S::CloseUnnecessaryApplications => "Close Unnecessary Applications",
        S::ReduceLoadedChunks => "Reduce Loaded Chunks",
        S::ReduceSimulationDistance => "Reduce Simulation Distance",
        S::OptimizeWorldGeneration => "Optimize World Generation",
        S::ReduceEntityCount => "Reduce Entity Count",
        S::ImplementEntityCulling => "Enable Entity Culling",
        S::AdjustSpawningSettings => "Adjust Spawning",
        S::OptimizeRuntimeFlags => "Optimize Runtime Launch Flags",
        S::UpdateRuntime => "Update Runtime Version",
        S::UpdateDrivers => "Update Graphics Drivers",
        S::EnableHardwareAcceleration => "Enable Hardware Acceleration",
        S::OptimizeCpuSettings => "Optimize CPU Settings",
        S::DisableProblematicMods => "Disable Problematic Mods",
        S::UpdateMods => "Update Mods",
        S::OptimizeNetworkSettings => "Optimize Network Settings",
        S::ReduceNetworkUsage => "Reduce Network Usage",
        S::CheckInternetConnection => "Check Internet Connection",
        S::ChangeServer => "Consider Changing Server",
        S::ReportBug => "Report Performance Bug",
        S::GeneralPerformanceTips => "General Performance Tips",
    }
}

/// Explanation of a suggestion, quoting the live values of `frame`.
pub fn description(
    suggestion: SuggestionType,
    frame: &MetricFrame,
    hardware: &HardwareProfile,
) -> String {
    match suggestion {
        S::ReduceRenderDistance => format!(
            "Your current render distance is {} chunks. Reducing it to 8-12 chunks can \
             significantly improve FPS while keeping good visibility.",
            frame.world.render_distance
        ),
        S::AdjustMemoryAllocation => format!(
            "Heap usage is {:.1}% of {:.0} MiB. Allocating more memory reduces garbage \
             collection pressure. Consider allocating {} GiB.",
            frame.memory.heap_usage_percent(),
            frame.memory.heap_max_mib(),
            hardware.recommended_memory_allocation_gb()
        ),
        S::OptimizeGraphicsSettings => format!(
            "Running at {} FPS. Several graphics settings can be lowered without a \
             significant loss of visual quality: graphics mode, clouds and animations.",
            frame.fps
        ),
        S::RestartGame => format!(
            "Heap usage is {:.1}%. Restarting clears accumulated memory and resets \
             performance.",
            frame.memory.heap_usage_percent()
        ),
        S::CleanupWorldData => format!(
            "{} chunks are loaded. Cleaning up chunk data and excessive entities improves \
             loading times and reduces memory usage.",
            frame.world.loaded_chunks
        ),
        S::UpdateDrivers => format!(
            "Outdated drivers for your {} can cause rendering problems. Updated drivers \
             often include performance fixes.",
            hardware.gpu_name
        ),
        S::DisableProblematicMods => "Some mods may cause performance issues or leak memory. \
             Temporarily disable recently installed mods to find the culprit."
            .to_string(),
        S::OptimizeRuntimeFlags => "The runtime launch flags may not be tuned for this \
             workload. Modern collector settings can improve performance by 10-30%."
            .to_string(),
        _ => format!("{}.", suggestion.description()),
    }
}

fn lines(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Ordered steps to apply a suggestion.
pub fn steps(suggestion: SuggestionType) -> Vec<String> {
    match suggestion {
        S::ReduceRenderDistance => lines(&[
            "Open the settings menu",
            "Go to Video Settings",
            "Find the 'Render Distance' slider",
            "Reduce it to 8-12 chunks (10 recommended)",
            "Click 'Done' to apply",
        ]),
        S::AdjustMemoryAllocation => lines(&[
            "Close the game completely",
            "Open the launcher profile settings",
            "Edit the runtime arguments",
            "Raise the maximum heap size to the recommended value",
            "Save and restart the game",
        ]),
        S::OptimizeGraphicsSettings => lines(&[
            "Open Video Settings",
            "Set Graphics to 'Fast'",
            "Turn Clouds off",
            "Set Particles to 'Decreased'",
            "Apply and check performance",
        ]),
        S::CleanupWorldData => lines(&[
            "Back up the world",
            "Run a world optimization tool",
            "Remove unnecessary structures",
            "Clear excessive entities",
        ]),
        S::RestartGame => lines(&[
            "Save your progress",
            "Close the game completely",
            "Wait a few seconds",
            "Start the game and reload the world",
        ]),
        S::OptimizeRuntimeFlags => lines(&[
            "Open the launcher profile settings",
            "Back up the current runtime arguments",
            "Replace them with a modern low-pause collector configuration",
            "Save and restart the game",
        ]),
        _ => lines(&[
            "Follow the instructions for this optimization",
            "Test the change in game",
            "Monitor the performance improvement",
        ]),
    }
}

/// Risks to be aware of before applying a suggestion.
pub fn warnings(suggestion: SuggestionType) -> Vec<String> {
    match suggestion {
        S::AdjustMemoryAllocation => lines(&[
            "Do not allocate more than 70% of total system memory",
            "Too much memory can hurt performance",
            "Leave enough memory for the operating system",
        ]),
        S::OptimizeRuntimeFlags => lines(&[
            "Back up the current launcher profile",
            "Some flags are not supported by every runtime version",
            "Test before using on important worlds",
        ]),
        S::CleanupWorldData => lines(&[
            "Always back up the world before cleaning up",
            "Some changes cannot be undone",
        ]),
        S::DisableProblematicMods => lines(&[
            "Disabling mods may affect world functionality",
            "Check mod dependencies before disabling",
        ]),
        _ => Vec::new(),
    }
}

/// Preconditions of a suggestion.
pub fn requirements(suggestion: SuggestionType) -> Vec<String> {
    match suggestion {
        S::AdjustMemoryAllocation => lines(&[
            "At least 8 GB of system memory",
            "A 64-bit runtime",
            "Access to the launcher settings",
        ]),
        S::UpdateDrivers => lines(&[
            "Administrative privileges",
            "An internet connection",
        ]),
        S::OptimizeRuntimeFlags => lines(&[
            "A recent runtime version",
            "Access to the launcher settings",
        ]),
        S::CleanupWorldData => lines(&[
            "Enough disk space for a backup",
            "World editing tools (optional)",
        ]),
        _ => Vec::new(),
    }
}

/// Setting names and recommended values related to a suggestion.
pub fn related_settings(
    suggestion: SuggestionType,
    frame: &MetricFrame,
    hardware: &HardwareProfile,
) -> BTreeMap<String, Value> {
    let mut settings = BTreeMap::new();
    let mut put = |key: &str, value: Value| {
        settings.insert(key.to_string(), value);
    };

    match suggestion {
        S::ReduceRenderDistance => {
            let rd = frame.world.render_distance;
            put("current_render_distance", json!(rd));
            put(
                "recommended_distance",
                json!(rd.saturating_sub(4).min(12).max(MIN_USEFUL_RENDER_DISTANCE)),
            );
            put("simulation_distance", json!(rd.min(10)));
        }
        S::AdjustMemoryAllocation => {
            put("current_usage_percent", json!(frame.memory.heap_usage_percent()));
            put("current_max_mb", json!(frame.memory.heap_max_bytes / (1024 * 1024)));
            put(
                "recommended_allocation_gb",
                json!((hardware.total_memory_gb / 2).min(6)),
            );
        }
        S::OptimizeGraphicsSettings => {
            put("graphics_mode", json!("fast"));
            put("clouds", json!("off"));
            put("particles", json!("decreased"));
            put("smooth_lighting", json!(false));
        }
        _ => {}
    }
    settings
}

/// Automatic action for the allow-listed suggestion types.
pub fn auto_apply(suggestion: SuggestionType, frame: &MetricFrame) -> Option<AutoApplyAction> {
    match suggestion {
        S::ReduceRenderDistance => {
            let from = frame.world.render_distance;
            Some(AutoApplyAction::SetRenderDistance {
                from,
                to: from.saturating_sub(2).max(MIN_USEFUL_RENDER_DISTANCE),
            })
        }
        S::ReduceSimulationDistance => {
            let from = frame.world.simulation_distance;
            Some(AutoApplyAction::SetSimulationDistance {
                from,
                to: from.saturating_sub(2).max(5),
            })
        }
        S::OptimizeGraphicsSettings => Some(AutoApplyAction::ApplyPerformancePreset),
        S::ReduceParticles => Some(AutoApplyAction::ReduceParticles),
        S::DisableSmoothLighting => Some(AutoApplyAction::DisableSmoothLighting),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_issue_has_candidates() {
        for issue in IssueKind::ALL {
            assert!(!candidates(issue).is_empty(), "{issue:?}");
        }
        assert_eq!(
            candidates(IssueKind::ThreadContention),
            &[SuggestionType::GeneralPerformanceTips]
        );
    }

    #[test]
    fn test_scales_stay_in_range() {
        for suggestion in SuggestionType::ALL {
            assert!((1..=5).contains(&difficulty(suggestion)));
            for issue in IssueKind::ALL {
                assert!((1..=5).contains(&impact(suggestion, issue)));
            }
            assert!(!steps(suggestion).is_empty());
            assert!(!title(suggestion).is_empty());
        }
    }

    #[test]
    fn test_critical_issue_raises_impact() {
        assert_eq!(impact(S::OptimizeGraphicsSettings, I::LowFps), 4);
        assert_eq!(impact(S::OptimizeGraphicsSettings, I::CriticalFps), 5);
        assert_eq!(impact(S::ReduceRenderDistance, I::CriticalFps), 5);
        assert_eq!(impact(S::ReduceParticles, I::LowFps), 2);
        assert_eq!(impact(S::CleanupWorldData, I::CriticalFps), 3);
    }

    #[test]
    fn test_render_distance_settings() {
        let mut frame = MetricFrame::at(0, 20);
        frame.world.render_distance = 20;
        let settings = related_settings(S::ReduceRenderDistance, &frame, &HardwareProfile::default());
        assert_eq!(settings["current_render_distance"], json!(20));
        assert_eq!(settings["recommended_distance"], json!(12));
        assert_eq!(settings["simulation_distance"], json!(10));

        assert_eq!(
            auto_apply(S::ReduceRenderDistance, &frame),
            Some(AutoApplyAction::SetRenderDistance { from: 20, to: 18 })
        );
        frame.world.render_distance = 9;
        assert_eq!(
            auto_apply(S::ReduceRenderDistance, &frame),
            Some(AutoApplyAction::SetRenderDistance { from: 9, to: 8 })
        );
    }

    #[test]
    fn test_only_allow_listed_types_auto_apply() {
        let frame = MetricFrame::at(0, 20);
        let auto: Vec<_> = SuggestionType::ALL
            .into_iter()
            .filter(|s| auto_apply(*s, &frame).is_some())
            .collect();
        assert_eq!(
            auto,
            vec![
                S::ReduceRenderDistance,
                S::OptimizeGraphicsSettings,
                S::ReduceParticles,
                S::DisableSmoothLighting,
                S::ReduceSimulationDistance,
            ]
        );
    }

    #[test]
    fn test_cooldown_table() {
        assert_eq!(
            default_cooldown(S::UpdateDrivers),
            Some(Duration::from_secs(24 * 60 * 60))
        );
        assert_eq!(default_cooldown(S::ReduceParticles), None);
    }
}
